//! 桥接错误模块
//!
//! # 设计思路
//!
//! 前端按错误码分支处理，因此命令层统一返回 `BridgeError { code, message }`。
//! 媒体链路内部只使用 `MediaError`，在命令边界按操作类型折叠为稳定的错误码。
//!
//! # 实现思路
//!
//! - 参数与 URL 问题：`INVALID_PARAMETERS`
//! - 平台不支持：`UNIMPLEMENTED`
//! - 被取消：`CANCELLED`
//! - 其余失败按操作归类：复制 `COPY_FAILED`、保存图片 `SAVE_FAILED`、
//!   保存视频与分享 `SHARE_FAILED`（保存视频沿用既有前端约定）

use serde::Serialize;

use crate::media::{MediaError, OperationKind};

pub const INVALID_PARAMETERS: &str = "INVALID_PARAMETERS";
pub const UNIMPLEMENTED: &str = "UNIMPLEMENTED";
pub const CANCELLED: &str = "CANCELLED";
pub const COPY_FAILED: &str = "COPY_FAILED";
pub const SAVE_FAILED: &str = "SAVE_FAILED";
pub const SHARE_FAILED: &str = "SHARE_FAILED";
pub const CANCEL_FAILED: &str = "CANCEL_FAILED";

/// 返回给前端的结构化错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: &'static str,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 必填参数缺失。
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(INVALID_PARAMETERS, format!("缺少参数：{}", name))
    }

    /// 将媒体链路错误折叠为指定操作的错误码。
    pub fn for_operation(kind: OperationKind, error: MediaError) -> Self {
        let code = match &error {
            MediaError::InvalidUrl(_) | MediaError::InvalidParameters(_) => INVALID_PARAMETERS,
            MediaError::Unsupported => UNIMPLEMENTED,
            MediaError::Cancelled => CANCELLED,
            _ => match kind {
                OperationKind::Copy => COPY_FAILED,
                OperationKind::SavePhoto => SAVE_FAILED,
                OperationKind::SaveVideo | OperationKind::Share => SHARE_FAILED,
            },
        };

        Self::new(code, error.to_string())
    }

    pub fn cancel_failed(error: MediaError) -> Self {
        let code = match &error {
            MediaError::Unsupported => UNIMPLEMENTED,
            _ => CANCEL_FAILED,
        };
        Self::new(code, error.to_string())
    }
}
