//! # 请求编排模块
//!
//! ## 设计思路
//!
//! `RequestFacade` 是四个对外操作（复制 / 保存图片 / 保存视频 / 分享）的唯一入口，
//! 不直接与 Tauri 绑定。处理链路固定为：
//! 1. 校验 URL（非法输入不发起下载）
//! 2. 下载字节
//! 3. 解析 MIME → 扩展名
//! 4. 暂存（保存 / 分享）
//! 5. 交给剪贴板、媒体库或分享面板
//! 6. 清理暂存文件并返回终态结果
//!
//! ## 实现思路
//!
//! - 下载、媒体库、剪贴板、分享面板均为端口泛型参数，测试可注入内存实现。
//! - 暂存文件由 `StagedFile` 守卫持有，任何退出路径都会删除。
//! - 记录 `fetch/stage/deliver/total` 阶段耗时，便于性能诊断。

use std::time::Instant;

use super::clipboard_writer::{ClipboardSink, ClipboardWriter};
use super::fetcher::{parse_media_url, redact_url_for_log, MediaFetcher};
use super::mime::extension_for;
use super::persistence::{MediaKind, MediaLibrary, MediaPersistence};
use super::share::{ShareOrchestrator, ShareSurface};
use super::source::{CancelFlag, FetchedMedia, MediaRequest, OperationKind, OperationResult};
use super::staging::{last_path_segment, sanitize_file_name, staged_file_name, TemporaryStaging};
use super::{MediaConfig, MediaError};

const DEFAULT_PHOTO_NAME: &str = "image";
const DEFAULT_VIDEO_ID: &str = "default";
const DEFAULT_VIDEO_EXTENSION: &str = "mp4";
const DEFAULT_SHARE_TITLE: &str = "share";

pub struct RequestFacade<F, L, C, S> {
    fetcher: F,
    staging: TemporaryStaging,
    persistence: MediaPersistence<L>,
    clipboard: ClipboardWriter<C>,
    share: ShareOrchestrator<S>,
}

impl<F, L, C, S> RequestFacade<F, L, C, S>
where
    F: MediaFetcher,
    L: MediaLibrary,
    C: ClipboardSink,
    S: ShareSurface,
{
    pub fn new(config: &MediaConfig, fetcher: F, library: L, clipboard: C, surface: S) -> Self {
        let staging = TemporaryStaging::new(config.staging_root());

        Self {
            fetcher,
            persistence: MediaPersistence::new(library),
            clipboard: ClipboardWriter::new(clipboard, config.max_decoded_pixels),
            share: ShareOrchestrator::new(surface, staging.clone(), config.jpeg_quality),
            staging,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn library(&self) -> &L {
        self.persistence.library()
    }

    pub fn clipboard(&self) -> &C {
        self.clipboard.sink()
    }

    pub fn share_surface(&self) -> &S {
        self.share.surface()
    }

    pub async fn copy_photo_to_clipboard(&self, url: &str, cancel: &CancelFlag) -> Result<OperationResult, MediaError> {
        self.execute(MediaRequest::new(url, OperationKind::Copy), cancel).await
    }

    pub async fn save_photo(&self, url: &str, cancel: &CancelFlag) -> Result<OperationResult, MediaError> {
        self.execute(MediaRequest::new(url, OperationKind::SavePhoto), cancel).await
    }

    /// 保存视频，`id` 作为暂存文件名（缺省为 `default`）。
    pub async fn save_video(
        &self,
        url: &str,
        id: Option<&str>,
        cancel: &CancelFlag,
    ) -> Result<OperationResult, MediaError> {
        let mut request = MediaRequest::new(url, OperationKind::SaveVideo);
        if let Some(id) = id {
            request = request.with_label(id);
        }
        self.execute(request, cancel).await
    }

    pub async fn share_image(&self, url: &str, title: &str, cancel: &CancelFlag) -> Result<OperationResult, MediaError> {
        self.execute(MediaRequest::new(url, OperationKind::Share).with_label(title), cancel)
            .await
    }

    /// 执行一次完整请求。
    pub async fn execute(&self, request: MediaRequest, cancel: &CancelFlag) -> Result<OperationResult, MediaError> {
        let started = Instant::now();
        let kind = request.kind;
        let log_url = redact_url_for_log(&request.source_url);

        let outcome = self.run(request, cancel).await;
        let total_ms = started.elapsed().as_millis();

        match &outcome {
            Ok(result) => log::info!(
                "✅ [{}] {} 完成 - {} - total={}ms",
                kind.as_str(),
                log_url,
                result.message,
                total_ms
            ),
            Err(err) => log::warn!(
                "❌ [{}] {} 失败 - stage={} - {} - total={}ms",
                kind.as_str(),
                log_url,
                err.stage(),
                err,
                total_ms
            ),
        }

        outcome
    }

    async fn run(&self, request: MediaRequest, cancel: &CancelFlag) -> Result<OperationResult, MediaError> {
        let url = parse_media_url(&request.source_url)?;
        cancel.check()?;

        let fetch_started = Instant::now();
        let media = self.fetcher.fetch(url.as_str(), cancel).await?;
        log::info!(
            "⬇️ 下载完成 - {} bytes - mime={:?} - fetch={}ms",
            media.bytes.len(),
            media.declared_mime,
            fetch_started.elapsed().as_millis()
        );
        cancel.check()?;

        let deliver_started = Instant::now();
        let result = match request.kind {
            OperationKind::Copy => self.clipboard.copy(media, cancel).await,
            OperationKind::SavePhoto => {
                let file_name = photo_file_name(&url, &media);
                self.stage_and_persist(media, &file_name, MediaKind::Photo, cancel).await
            }
            OperationKind::SaveVideo => {
                let file_name = video_file_name(request.label.as_deref(), &media);
                self.stage_and_persist(media, &file_name, MediaKind::Video, cancel).await
            }
            OperationKind::Share => {
                let title = request
                    .label
                    .as_deref()
                    .filter(|title| !title.trim().is_empty())
                    .unwrap_or(DEFAULT_SHARE_TITLE);
                self.share.share(media, title, cancel).await
            }
        };
        log::info!("[{}] deliver={}ms", request.kind.as_str(), deliver_started.elapsed().as_millis());

        result
    }

    async fn stage_and_persist(
        &self,
        media: FetchedMedia,
        file_name: &str,
        kind: MediaKind,
        cancel: &CancelFlag,
    ) -> Result<OperationResult, MediaError> {
        let stage_started = Instant::now();
        let staged = self.staging.stage(&media.bytes, file_name).await?;
        drop(media);
        log::info!("stage={}ms", stage_started.elapsed().as_millis());
        cancel.check()?;

        self.persistence.persist(staged, kind).await
    }
}

/// 图片暂存名：URL 最后一段，扩展名按 MIME 修正。
fn photo_file_name(url: &reqwest::Url, media: &FetchedMedia) -> String {
    let base = last_path_segment(url).unwrap_or_default();
    let base = sanitize_file_name(&base, DEFAULT_PHOTO_NAME);
    staged_file_name(&base, extension_for(media.declared_mime.as_deref()), true)
}

/// 视频暂存名：`<id>.<ext>`，未知类型按 mp4 处理。
fn video_file_name(id: Option<&str>, media: &FetchedMedia) -> String {
    let id = sanitize_file_name(id.unwrap_or(DEFAULT_VIDEO_ID), DEFAULT_VIDEO_ID);
    let extension = match extension_for(media.declared_mime.as_deref()) {
        "" => DEFAULT_VIDEO_EXTENSION,
        ext => ext,
    };
    staged_file_name(&id, extension, false)
}
