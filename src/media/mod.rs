//! # 媒体处理模块（media）
//!
//! ## 设计思路
//!
//! 该模块将“下载 → 类型解析 → 暂存 → 交付 → 清理”按职责拆分为多个子模块：
//!
//! - `commands`：仅做 IPC 入参/出参适配（薄封装）
//! - `service`：承载可注入状态与取消标志
//! - `handler`：编排整条处理流水线（`RequestFacade`）
//! - `fetcher`：URL 校验与下载
//! - `mime`：MIME → 扩展名
//! - `staging`：临时文件生命周期
//! - `pipeline`：解码、动图识别、AVIF 归一化
//! - `persistence` / `clipboard_writer` / `share`：三种交付方式
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 调用链
//!
//! ```text
//! 前端 invoke
//!    ↓
//! commands.rs（参数适配 + 错误码折叠）
//!    ↓
//! service.rs（平台检查、取消登记）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ fetcher.rs（URL 校验 + 下载）
//!    ├─ mime.rs / staging.rs（命名 + 暂存）
//!    └─ persistence.rs / clipboard_writer.rs / share.rs
//!    ↓
//! 返回 OperationResult / BridgeError 给前端
//! ```
//!
//! 下载、媒体库、剪贴板、分享面板四个外部依赖均以 trait 端口表示，
//! 桌面端实现分别为 `HttpFetcher`、`FsMediaLibrary`、`ArboardClipboard`、`DialogShareSurface`。

pub(crate) mod commands;
pub mod clipboard_writer;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod handler;
pub mod mime;
pub mod persistence;
pub mod pipeline;
pub mod service;
pub mod share;
pub mod share_dialog;
pub mod source;
pub mod staging;

pub use clipboard_writer::{ArboardClipboard, ClipboardSink, ClipboardWriter};
pub use config::MediaConfig;
pub use error::MediaError;
pub use fetcher::{HttpFetcher, MediaFetcher};
pub use handler::RequestFacade;
pub use mime::{extension_for, extension_for_mime};
pub use persistence::{FsMediaLibrary, LibraryError, MediaKind, MediaLibrary, MediaPersistence, PersistencePath};
pub use pipeline::ClipboardImage;
pub use service::{MediaService, MediaServiceState};
pub use share::{ShareError, ShareOrchestrator, ShareOutcome, ShareSurface};
pub use share_dialog::DialogShareSurface;
pub use source::{CancelFlag, FetchedMedia, MediaRequest, OperationKind, OperationResult};
pub use staging::{StagedFile, TemporaryStaging};
