//! # StashMedia — Tauri 插件入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  前端 (invoke 'plugin:stash-media|…')     │
//! │  copyPhotoToClipboard / savePhoto / saveVideo / shareImage│
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Tauri IPC (Result<OperationResult, BridgeError>)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            插件 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── BridgeError (错误码折叠)                │
//! │  ├─ storage ──── 桌面端媒体库目录                        │
//! │  └─ media                                               │
//! │      ├─ commands / service   IPC 适配 · 取消登记         │
//! │      ├─ handler              下载→暂存→交付→清理         │
//! │      └─ fetcher · mime · staging · pipeline              │
//! │         persistence · clipboard_writer · share           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 命令层错误 `BridgeError { code, message }` |
//! | [`media`] | 下载、类型解析、暂存、保存 / 复制 / 分享 |
//! | [`storage`] | 桌面端图片 / 视频目录的解析与自动创建 |
//!
//! ## 使用
//!
//! ```rust,ignore
//! tauri::Builder::default()
//!     .plugin(stash_media::init())
//!     .run(tauri::generate_context!())?;
//! ```
//!
//! 配置读取自 `tauri.conf.json` 的 `plugins.stash-media`（见 [`media::MediaConfig`]）。

pub mod error;
pub mod media;
pub mod storage;

use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, Runtime};

pub use error::BridgeError;
pub use media::{MediaConfig, MediaError, MediaServiceState, OperationResult};

/// 通过 [`tauri::App`]、[`tauri::AppHandle`] 等访问媒体服务。
pub trait StashMediaExt<R: Runtime> {
    fn stash_media(&self) -> &MediaServiceState<R>;
}

impl<R: Runtime, T: Manager<R>> StashMediaExt<R> for T {
    fn stash_media(&self) -> &MediaServiceState<R> {
        self.state::<MediaServiceState<R>>().inner()
    }
}

/// 初始化插件。
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<MediaConfig>> {
    Builder::<R, Option<MediaConfig>>::new("stash-media")
        .invoke_handler(tauri::generate_handler![
            media::commands::copy_photo_to_clipboard,
            media::commands::save_photo,
            media::commands::save_video,
            media::commands::share_image,
            media::commands::cancel_media_request,
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            config.validate()?;
            log::info!(
                "setup: stash-media 配置 - downloadTimeout={}s maxFileSize={} userAgent={:?}",
                config.download_timeout,
                config.max_file_size,
                config.user_agent
            );

            // 分享面板依赖对话框插件，宿主未注册时补上
            if app.try_state::<tauri_plugin_dialog::Dialog<R>>().is_none() {
                app.plugin(tauri_plugin_dialog::init())?;
                log::info!("setup: dialog plugin registered");
            }

            let library = storage::resolve_library(app, &config)?;
            let service = MediaServiceState::for_app(app, &config, library)?;
            app.manage(service);
            log::info!("setup: media service managed");

            Ok(())
        })
        .build()
}
