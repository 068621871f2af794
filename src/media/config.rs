//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `MediaConfig`，在插件初始化时从宿主的 Tauri 配置
//! （`plugins.stash-media`）读取一次，随后以只读方式注入下载器与各组件。
//! 运行期间不再修改，因此跨请求共享不需要加锁。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - 所有字段 `#[serde(default)]`，宿主只需覆盖关心的字段。
//! - `validate` 在构建下载器之前拒绝明显错误的取值。

use std::path::PathBuf;

use super::MediaError;

/// 媒体处理配置。
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaConfig {
    /// 附加在每次下载请求上的客户端标识（`User-Agent`）。
    pub user_agent: Option<String>,
    /// 网络下载总超时（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时（秒）。
    pub connect_timeout: u64,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 允许下载的最大体积（字节）。
    pub max_file_size: u64,
    /// 复制到剪贴板前允许解码的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// AVIF 转 JPEG 时的压缩质量（1~100）。
    pub jpeg_quality: u8,
    /// 暂存目录，未设置时使用系统临时目录。
    pub staging_dir: Option<PathBuf>,
    /// 桌面端图片库目录，未设置时使用系统图片目录。
    pub images_dir: Option<PathBuf>,
    /// 桌面端视频库目录，未设置时使用系统视频目录。
    pub videos_dir: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            download_timeout: 60,
            connect_timeout: 10,
            max_redirects: 5,
            max_file_size: 200 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            jpeg_quality: 90,
            staging_dir: None,
            images_dir: None,
            videos_dir: None,
        }
    }
}

impl MediaConfig {
    /// 校验配置取值。
    pub fn validate(&self) -> Result<(), MediaError> {
        if self.download_timeout == 0 {
            return Err(MediaError::InvalidParameters("downloadTimeout 必须大于 0".to_string()));
        }
        if self.connect_timeout == 0 {
            return Err(MediaError::InvalidParameters("connectTimeout 必须大于 0".to_string()));
        }
        if self.connect_timeout > self.download_timeout {
            return Err(MediaError::InvalidParameters(
                "connectTimeout 不能大于 downloadTimeout".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(MediaError::InvalidParameters("maxFileSize 必须大于 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(MediaError::InvalidParameters("maxDecodedPixels 必须大于 0".to_string()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(MediaError::InvalidParameters(
                "jpegQuality 必须在 1~100 之间".to_string(),
            ));
        }
        if let Some(agent) = &self.user_agent {
            if agent.trim().is_empty() {
                return Err(MediaError::InvalidParameters("userAgent 不能为空字符串".to_string()));
            }
        }

        Ok(())
    }

    /// 暂存根目录。
    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("stash-media"))
    }
}
