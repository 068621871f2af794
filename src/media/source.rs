//! # 请求与中间模型
//!
//! ## 设计思路
//!
//! 将“外部请求语义”和“流水线中间结果”解耦：
//! - `MediaRequest` 表示一次调用的不可变输入
//! - `FetchedMedia` 表示已下载但尚未暂存/解码的字节
//! - `OperationResult` 表示返回给调用方的终态结果
//!
//! 以上数据均由单次请求独占，请求结束即丢弃，不跨请求共享。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::MediaError;

/// 对外操作类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Copy,
    SavePhoto,
    SaveVideo,
    Share,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::SavePhoto => "save-photo",
            Self::SaveVideo => "save-video",
            Self::Share => "share",
        }
    }
}

/// 单次调用的输入。
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub source_url: String,
    pub kind: OperationKind,
    /// 分享时为标题；保存视频时为文件标识。
    pub label: Option<String>,
}

impl MediaRequest {
    pub fn new(source_url: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            source_url: source_url.into(),
            kind,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// 下载阶段输出：原始字节与声明的 MIME 类型。
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    /// 响应头中的 `Content-Type`（已去掉参数并转小写）。
    pub declared_mime: Option<String>,
}

/// 终态结果。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// 请求取消标志。
///
/// 克隆后共享同一个标志，链路各阶段通过 `check` 检查。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 已取消时返回 `MediaError::Cancelled`。
    pub fn check(&self) -> Result<(), MediaError> {
        if self.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        Ok(())
    }
}
