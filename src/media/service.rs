//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! `MediaService` 作为 Tauri 注入状态，持有 `RequestFacade` 与按请求 ID 索引的取消标志。
//! 命令层只与它交互。
//!
//! ## 实现思路
//!
//! - 每个请求可携带 `request_id`，执行期间登记取消标志，结束（或被丢弃）时自动移除。
//! - 移动端由平台原生层实现，本层直接以 `Unsupported` 拒绝。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tauri::{AppHandle, Runtime};

use super::clipboard_writer::{ArboardClipboard, ClipboardSink};
use super::fetcher::{HttpFetcher, MediaFetcher};
use super::handler::RequestFacade;
use super::persistence::{FsMediaLibrary, MediaLibrary};
use super::share::ShareSurface;
use super::share_dialog::DialogShareSurface;
use super::source::{CancelFlag, MediaRequest, OperationResult};
use super::{MediaConfig, MediaError};

/// 桌面端注入状态。
pub type MediaServiceState<R> = MediaService<HttpFetcher, FsMediaLibrary, ArboardClipboard, DialogShareSurface<R>>;

pub struct MediaService<F, L, C, S> {
    facade: RequestFacade<F, L, C, S>,
    cancel_flags: Mutex<HashMap<String, CancelFlag>>,
}

impl<R: Runtime> MediaServiceState<R> {
    /// 使用桌面端端口实现创建服务状态。
    pub fn for_app(app: &AppHandle<R>, config: &MediaConfig, library: FsMediaLibrary) -> Result<Self, MediaError> {
        let fetcher = HttpFetcher::new(config)?;
        let surface = DialogShareSurface::new(app.clone());
        Ok(Self::new(RequestFacade::new(
            config,
            fetcher,
            library,
            ArboardClipboard,
            surface,
        )))
    }
}

impl<F, L, C, S> MediaService<F, L, C, S>
where
    F: MediaFetcher,
    L: MediaLibrary,
    C: ClipboardSink,
    S: ShareSurface,
{
    pub fn new(facade: RequestFacade<F, L, C, S>) -> Self {
        Self {
            facade,
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    /// 执行请求；携带 `request_id` 时可通过 [`Self::cancel`] 中途取消。
    pub async fn run(&self, request: MediaRequest, request_id: Option<String>) -> Result<OperationResult, MediaError> {
        ensure_supported_platform()?;

        let cancel = CancelFlag::new();
        let _registration = match request_id {
            Some(id) => Some(self.register(id, cancel.clone())),
            None => None,
        };

        self.facade.execute(request, &cancel).await
    }

    /// 取消进行中的请求，返回是否找到该请求。
    pub fn cancel(&self, request_id: &str) -> Result<bool, MediaError> {
        ensure_supported_platform()?;
        let guard = self.flags();

        match guard.get(request_id) {
            Some(flag) => {
                flag.cancel();
                log::info!("🛑 已请求取消：{}", request_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.flags().len()
    }

    /// 标志表只做插入 / 删除，持锁线程 panic 后数据仍一致，直接取回守卫。
    fn flags(&self) -> MutexGuard<'_, HashMap<String, CancelFlag>> {
        self.cancel_flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, request_id: String, flag: CancelFlag) -> Registration<'_> {
        let mut guard = self.flags();

        if guard.insert(request_id.clone(), flag).is_some() {
            log::warn!("⚠️ 请求 ID 重复，旧请求将无法再被取消：{}", request_id);
        }
        log::debug!("登记请求 {}（进行中 {}）", request_id, guard.len());

        Registration {
            flags: &self.cancel_flags,
            request_id,
        }
    }
}

/// 请求结束或被丢弃时移除取消标志。
struct Registration<'a> {
    flags: &'a Mutex<HashMap<String, CancelFlag>>,
    request_id: String,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.request_id);
    }
}

#[cfg(any(target_os = "android", target_os = "ios"))]
fn ensure_supported_platform() -> Result<(), MediaError> {
    Err(MediaError::Unsupported)
}

#[cfg(not(any(target_os = "android", target_os = "ios")))]
fn ensure_supported_platform() -> Result<(), MediaError> {
    Ok(())
}
