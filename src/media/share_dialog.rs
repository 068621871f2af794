//! 桌面端分享面板：以“导出到…”保存对话框承载分享交互。
//!
//! 对话框挂在当前聚焦（或第一个）窗口上，没有任何窗口时视为无呈现上下文。

use std::path::{Path, PathBuf};

use tauri::{AppHandle, Manager, Runtime, WebviewWindow};
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;

use super::share::{ShareError, ShareOutcome, ShareSurface};

pub struct DialogShareSurface<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> DialogShareSurface<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }

    fn presentation_window(&self) -> Option<WebviewWindow<R>> {
        let windows: Vec<_> = self.app.webview_windows().into_values().collect();
        let focused = windows
            .iter()
            .position(|window| window.is_focused().unwrap_or(false));

        match focused {
            Some(index) => windows.into_iter().nth(index),
            None => windows.into_iter().next(),
        }
    }

    /// 弹出对话框并等待用户选择目标路径，取消时为 `None`。
    async fn pick_destination(&self, file: &Path, title: &str) -> Result<Option<PathBuf>, ShareError> {
        let window = self
            .presentation_window()
            .ok_or(ShareError::NoPresentationContext)?;

        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("share")
            .to_string();

        let (tx, rx) = oneshot::channel();
        let builder = self
            .app
            .dialog()
            .file()
            .set_title(title)
            .set_file_name(file_name);

        #[cfg(not(any(target_os = "android", target_os = "ios")))]
        let builder = builder.set_parent(&window);
        drop(window);

        builder.save_file(move |path| {
            let _ = tx.send(path);
        });

        let chosen = rx
            .await
            .map_err(|_| ShareError::Failed("分享对话框被意外关闭".to_string()))?;

        chosen
            .map(|path| path.into_path().map_err(|e| ShareError::Failed(e.to_string())))
            .transpose()
    }
}

impl<R: Runtime> ShareSurface for DialogShareSurface<R> {
    async fn present(&self, file: &Path, title: &str) -> Result<ShareOutcome, ShareError> {
        let Some(destination) = self.pick_destination(file, title).await? else {
            return Ok(ShareOutcome::Cancelled);
        };

        tokio::fs::copy(file, &destination)
            .await
            .map_err(|e| ShareError::Failed(format!("导出到 {} 失败：{}", destination.display(), e)))?;

        log::info!("✅ 已导出到：{}", destination.display());
        Ok(ShareOutcome::Completed)
    }
}
