//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载媒体链路（下载 → 分类 → 暂存 → 交付 → 清理）中的所有失败来源，
//! 避免字符串拼接式错误处理。通过 `thiserror` 保持人类可读错误，调用侧可按分支匹配。
//!
//! 每个错误在发生点即被捕获并转为终态结果，不做重试与局部恢复。

/// 媒体处理统一错误类型。
///
/// 该类型会在命令层被上转为 `BridgeError`，最终透传给前端。
/// `Display` 文案即为直接展示给用户的消息。
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("URL 无效：{0}")]
    InvalidUrl(String),

    #[error("下载失败：{0}")]
    FetchFailed(String),

    #[error("下载结果为空：服务器未返回任何数据")]
    EmptyResponse,

    #[error("图片解码失败：{0}")]
    DecodeFailed(String),

    #[error("临时文件写入失败：{0}")]
    StagingIo(String),

    #[error("没有访问媒体库的权限")]
    PersistenceDenied,

    #[error("保存失败：{0}")]
    PersistenceFailed(String),

    #[error("保存失败")]
    PersistenceUnknownFailure,

    #[error("写入剪贴板失败：{0}")]
    ClipboardUnavailable(String),

    #[error("分享失败：{0}")]
    ShareFailed(String),

    #[error("无法弹出分享面板：当前没有可用的窗口")]
    NoPresentationContext,

    #[error("参数错误：{0}")]
    InvalidParameters(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("请求已取消")]
    Cancelled,

    #[error("当前平台不支持该操作（unsupported on this platform）")]
    Unsupported,
}

impl MediaError {
    /// 错误所属阶段，用于日志聚合。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) | Self::InvalidParameters(_) | Self::Unsupported => "validate",
            Self::FetchFailed(_) | Self::EmptyResponse | Self::ResourceLimit(_) => "fetch",
            Self::DecodeFailed(_) => "decode",
            Self::StagingIo(_) => "stage",
            Self::PersistenceDenied
            | Self::PersistenceFailed(_)
            | Self::PersistenceUnknownFailure
            | Self::ClipboardUnavailable(_)
            | Self::ShareFailed(_)
            | Self::NoPresentationContext => "deliver",
            Self::Cancelled => "cancel",
        }
    }
}
