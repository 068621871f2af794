//! # 剪贴板写入模块
//!
//! ## 设计思路
//!
//! 下载得到的字节先解码为 RGBA，再写入系统剪贴板。
//! 写入通过 `ClipboardSink` 端口完成，桌面端实现基于 `arboard`，
//! 并放在阻塞线程中执行，避免阻塞 async 运行时。
//!
//! 解码失败直接返回，不写入任何内容，剪贴板保持原样；写入不做重试。

use std::future::Future;

use super::pipeline::{decode_for_clipboard, ClipboardImage};
use super::source::{CancelFlag, FetchedMedia, OperationResult};
use super::MediaError;

/// 剪贴板端口：以图像形式替换当前剪贴板内容。
pub trait ClipboardSink: Send + Sync {
    fn write_image(&self, image: ClipboardImage) -> impl Future<Output = Result<(), MediaError>> + Send;
}

/// 基于 arboard 的系统剪贴板。
#[derive(Debug, Default, Clone, Copy)]
pub struct ArboardClipboard;

#[cfg(not(any(target_os = "android", target_os = "ios")))]
impl ClipboardSink for ArboardClipboard {
    async fn write_image(&self, image: ClipboardImage) -> Result<(), MediaError> {
        log::debug!("📋 准备复制到剪贴板 - {}x{}", image.width, image.height);

        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| MediaError::ClipboardUnavailable(format!("无法访问剪贴板：{}", e)))?;

            clipboard
                .set_image(arboard::ImageData {
                    width: image.width,
                    height: image.height,
                    bytes: std::borrow::Cow::Owned(image.bytes),
                })
                .map_err(|e| MediaError::ClipboardUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| MediaError::ClipboardUnavailable(format!("线程执行失败：{}", e)))?
    }
}

#[cfg(any(target_os = "android", target_os = "ios"))]
impl ClipboardSink for ArboardClipboard {
    async fn write_image(&self, _image: ClipboardImage) -> Result<(), MediaError> {
        Err(MediaError::Unsupported)
    }
}

/// 复制流程：解码 → 写入。
pub struct ClipboardWriter<C> {
    sink: C,
    max_decoded_pixels: u64,
}

impl<C: ClipboardSink> ClipboardWriter<C> {
    pub fn new(sink: C, max_decoded_pixels: u64) -> Self {
        Self {
            sink,
            max_decoded_pixels,
        }
    }

    pub fn sink(&self) -> &C {
        &self.sink
    }

    pub async fn copy(&self, media: FetchedMedia, cancel: &CancelFlag) -> Result<OperationResult, MediaError> {
        let bytes = media.bytes;
        let limit = self.max_decoded_pixels;
        let image = tokio::task::spawn_blocking(move || decode_for_clipboard(&bytes, limit))
            .await
            .map_err(|e| MediaError::DecodeFailed(format!("线程执行失败：{}", e)))??;

        // 解码耗时较长，写入前再确认一次
        cancel.check()?;

        self.sink.write_image(image).await?;
        log::info!("✅ 已复制到剪贴板");
        Ok(OperationResult::succeeded("图片已复制到剪贴板"))
    }
}
