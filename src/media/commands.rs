//! # Tauri 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做 IPC 参数接收与结果返回，不承载业务逻辑。
//! 所有实际处理交由 `MediaServiceState`，保持命令函数薄、稳定、易测试。
//!
//! 参数均以 `Option` 接收，缺失时返回 `INVALID_PARAMETERS`，而不是交给 IPC 层报反序列化错误。

use tauri::{command, AppHandle, Runtime};

use super::source::{MediaRequest, OperationKind, OperationResult};
use crate::error::BridgeError;
use crate::StashMediaExt;

fn require(value: Option<String>, name: &str) -> Result<String, BridgeError> {
    value.ok_or_else(|| BridgeError::missing_parameter(name))
}

async fn run<R: Runtime>(
    app: &AppHandle<R>,
    request: MediaRequest,
    request_id: Option<String>,
) -> Result<OperationResult, BridgeError> {
    let kind = request.kind;
    app.stash_media()
        .run(request, request_id)
        .await
        .map_err(|error| BridgeError::for_operation(kind, error))
}

/// 下载图片并复制到系统剪贴板。
#[command]
pub(crate) async fn copy_photo_to_clipboard<R: Runtime>(
    app: AppHandle<R>,
    url: Option<String>,
    request_id: Option<String>,
) -> Result<OperationResult, BridgeError> {
    let url = require(url, "url")?;
    run(&app, MediaRequest::new(url, OperationKind::Copy), request_id).await
}

/// 下载图片并保存到媒体库（动图保留全部帧）。
#[command]
pub(crate) async fn save_photo<R: Runtime>(
    app: AppHandle<R>,
    url: Option<String>,
    request_id: Option<String>,
) -> Result<OperationResult, BridgeError> {
    let url = require(url, "url")?;
    run(&app, MediaRequest::new(url, OperationKind::SavePhoto), request_id).await
}

/// 下载视频并保存到媒体库，`id` 用作文件名。
#[command]
pub(crate) async fn save_video<R: Runtime>(
    app: AppHandle<R>,
    url: Option<String>,
    id: Option<String>,
    request_id: Option<String>,
) -> Result<OperationResult, BridgeError> {
    let url = require(url, "url")?;
    let mut request = MediaRequest::new(url, OperationKind::SaveVideo);
    if let Some(id) = id {
        request = request.with_label(id);
    }
    run(&app, request, request_id).await
}

#[command]
pub(crate) async fn share_image<R: Runtime>(
    app: AppHandle<R>,
    url: Option<String>,
    title: Option<String>,
    request_id: Option<String>,
) -> Result<OperationResult, BridgeError> {
    let url = require(url, "url")?;
    let title = require(title, "title")?;
    run(&app, MediaRequest::new(url, OperationKind::Share).with_label(title), request_id).await
}

#[command]
pub(crate) fn cancel_media_request<R: Runtime>(
    app: AppHandle<R>,
    request_id: Option<String>,
) -> Result<bool, BridgeError> {
    let request_id = require(request_id, "requestId")?;
    app.stash_media()
        .cancel(&request_id)
        .map_err(BridgeError::cancel_failed)
}
