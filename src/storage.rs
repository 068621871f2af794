//! 媒体库目录管理模块
//!
//! # 设计思路
//!
//! 桌面端没有系统相册，`FsMediaLibrary` 把图片和视频分别存入两个目录。
//! 目录在插件初始化时解析一次。
//!
//! # 实现思路
//!
//! - 优先使用配置中的 `imagesDir` / `videosDir`。
//! - 未设置时使用系统图片 / 视频目录下的 `StashMedia` 子目录。
//! - 系统目录不可用时回退到应用数据目录下的 `images` / `videos`。
//! - 目录不存在时自动 `create_dir_all`。

use std::fs;
use std::path::{Path, PathBuf};

use tauri::{AppHandle, Manager, Runtime};

use crate::media::{FsMediaLibrary, MediaConfig, MediaError};

const LIBRARY_SUBDIR: &str = "StashMedia";

/// 根据配置与系统目录构建桌面端媒体库。
pub fn resolve_library<R: Runtime>(app: &AppHandle<R>, config: &MediaConfig) -> Result<FsMediaLibrary, MediaError> {
    let paths = app.path();
    let app_data = paths.app_data_dir().ok();

    let images_dir = choose_dir(
        config.images_dir.as_deref(),
        paths.picture_dir().ok(),
        app_data.as_deref(),
        "images",
    )?;
    let videos_dir = choose_dir(
        config.videos_dir.as_deref(),
        paths.video_dir().ok(),
        app_data.as_deref(),
        "videos",
    )?;

    ensure_dir(&images_dir)?;
    ensure_dir(&videos_dir)?;
    log::info!(
        "🗂️ 媒体库目录 - images={} videos={}",
        images_dir.display(),
        videos_dir.display()
    );

    Ok(FsMediaLibrary::new(images_dir, videos_dir))
}

fn choose_dir(
    custom: Option<&Path>,
    system: Option<PathBuf>,
    app_data: Option<&Path>,
    fallback_name: &str,
) -> Result<PathBuf, MediaError> {
    if let Some(dir) = custom.filter(|dir| !dir.as_os_str().is_empty()) {
        return Ok(dir.to_path_buf());
    }

    if let Some(dir) = system {
        return Ok(dir.join(LIBRARY_SUBDIR));
    }

    app_data
        .map(|dir| dir.join(fallback_name))
        .ok_or_else(|| MediaError::PersistenceFailed(format!("无法确定 {} 目录", fallback_name)))
}

fn ensure_dir(dir: &Path) -> Result<(), MediaError> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .map_err(|e| MediaError::PersistenceFailed(format!("创建目录 '{}' 失败: {}", dir.display(), e)))?;
    }
    Ok(())
}
