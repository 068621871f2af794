//! # 分享编排模块
//!
//! ## 设计思路
//!
//! 分享面板只接受文件，因此流程为：格式归一化 → 以标题命名暂存 → 弹出分享面板 → 删除暂存文件。
//! 无论用户完成还是取消分享，暂存文件都在交互结束后删除。
//!
//! 具体的分享面板由 `ShareSurface` 端口提供，桌面端实现见 `share_dialog`。

use std::future::Future;
use std::path::Path;

use super::pipeline::normalize_for_share;
use super::source::{CancelFlag, FetchedMedia, OperationResult};
use super::staging::{sanitize_file_name, staged_file_name, TemporaryStaging};
use super::MediaError;

/// 无法从 MIME 得出扩展名时使用的默认值。
const DEFAULT_SHARE_EXTENSION: &str = "jpg";

/// 分享交互的结局。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("没有可用于弹出分享面板的窗口")]
    NoPresentationContext,
    #[error("{0}")]
    Failed(String),
}

impl From<ShareError> for MediaError {
    fn from(error: ShareError) -> Self {
        match error {
            ShareError::NoPresentationContext => MediaError::NoPresentationContext,
            ShareError::Failed(reason) => MediaError::ShareFailed(reason),
        }
    }
}

/// 分享面板端口：以单个文件作为唯一分享项，交互结束后返回。
pub trait ShareSurface: Send + Sync {
    fn present(
        &self,
        file: &Path,
        title: &str,
    ) -> impl Future<Output = Result<ShareOutcome, ShareError>> + Send;
}

pub struct ShareOrchestrator<S> {
    surface: S,
    staging: TemporaryStaging,
    jpeg_quality: u8,
}

impl<S: ShareSurface> ShareOrchestrator<S> {
    pub fn new(surface: S, staging: TemporaryStaging, jpeg_quality: u8) -> Self {
        Self {
            surface,
            staging,
            jpeg_quality,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub async fn share(
        &self,
        media: FetchedMedia,
        title: &str,
        cancel: &CancelFlag,
    ) -> Result<OperationResult, MediaError> {
        let quality = self.jpeg_quality;
        let (bytes, extension) = tokio::task::spawn_blocking(move || normalize_for_share(media, quality))
            .await
            .map_err(|e| MediaError::DecodeFailed(format!("线程执行失败：{}", e)))?;

        let extension = if extension.is_empty() {
            DEFAULT_SHARE_EXTENSION
        } else {
            extension
        };
        // 标题里的点不视为扩展名，直接追加
        let file_name = staged_file_name(&sanitize_file_name(title, "share"), extension, false);

        let staged = self.staging.stage(&bytes, &file_name).await?;
        cancel.check()?;

        log::info!("📤 弹出分享面板：{}", staged.file_name());
        let outcome = self.surface.present(staged.path(), title).await;
        staged.release();

        match outcome? {
            ShareOutcome::Completed => Ok(OperationResult::succeeded("分享完成")),
            ShareOutcome::Cancelled => {
                log::info!("用户取消了分享");
                Ok(OperationResult::succeeded("已关闭分享面板"))
            }
        }
    }
}
