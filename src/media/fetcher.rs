//! # 下载模块
//!
//! ## 设计思路
//!
//! 统一处理远程媒体的字节下载，并在“尽可能早”的阶段执行输入校验，尽快失败。
//! 下载只发起一次，不做重试：瞬时失败直接以 `FetchFailed` 上抛。
//!
//! ## 实现思路
//!
//! - URL：解析 + 协议校验，非法输入在发起网络请求之前被拒绝。
//! - 客户端：构造时注入配置（含可选 `User-Agent`），之后只读复用。
//! - 下载：流式读取，边读边检查体积上限与取消标志。
//! - 元数据：`Content-Type` 去参数后作为声明类型，缺失时保持为空。

use std::future::Future;
use std::time::Duration;

use super::mime::normalize_mime;
use super::source::{CancelFlag, FetchedMedia};
use super::{MediaConfig, MediaError};

const BUFFER_INITIAL_CAPACITY: usize = 64 * 1024;

/// 下载端口，测试时可替换为内存实现。
pub trait MediaFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        cancel: &CancelFlag,
    ) -> impl Future<Output = Result<FetchedMedia, MediaError>> + Send;
}

/// 解析并校验媒体 URL：必须是带主机的 HTTP/HTTPS 绝对地址。
pub fn parse_media_url(url: &str) -> Result<reqwest::Url, MediaError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(MediaError::InvalidUrl("URL 为空".to_string()));
    }

    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| MediaError::InvalidUrl(format!("URL 格式错误：{}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(MediaError::InvalidUrl(format!(
            "仅支持 HTTP/HTTPS：{}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(MediaError::InvalidUrl("URL 缺少主机地址".to_string()));
    }

    Ok(parsed)
}

/// 日志用 URL：去掉 query 与 fragment，避免泄露签名参数。
pub fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
}

/// 基于 reqwest 的下载器。
///
/// 一个实例对应一个客户端标识，跨请求复用。
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: Option<String>,
    download_timeout: u64,
    max_file_size: u64,
}

impl HttpFetcher {
    /// 根据配置构建复用型 HTTP 客户端。
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        let client = builder
            .build()
            .map_err(|e| MediaError::FetchFailed(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            download_timeout: config.download_timeout,
            max_file_size: config.max_file_size,
        })
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    async fn download(&self, url: reqwest::Url, cancel: &CancelFlag) -> Result<FetchedMedia, MediaError> {
        let redacted = redact_url_for_log(url.as_str());
        log::info!("🌐 开始下载媒体 - URL: {}", redacted);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e, url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::FetchFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status_message(status.as_u16())
            )));
        }

        let declared_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(normalize_mime)
            .filter(|mime| !mime.is_empty());

        let content_length = response.content_length();
        if let Some(size) = content_length {
            if size > self.max_file_size {
                return Err(MediaError::ResourceLimit(format!(
                    "文件过大：{:.2} MB（限制：{:.2} MB）",
                    size as f64 / 1024.0 / 1024.0,
                    self.max_file_size as f64 / 1024.0 / 1024.0
                )));
            }
        }

        let initial_capacity = content_length
            .map(|len| len.min(self.max_file_size).min(usize::MAX as u64) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut total: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_reqwest_error(e, url.as_str()))?
        {
            cancel.check()?;

            total = total.saturating_add(chunk.len() as u64);
            if total > self.max_file_size {
                return Err(MediaError::ResourceLimit("下载内容超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);
        }

        if buffer.is_empty() {
            return Err(MediaError::EmptyResponse);
        }

        log::debug!(
            "✅ 下载完成 - {} bytes, content-type: {}",
            total,
            declared_mime.as_deref().unwrap_or("<none>")
        );

        Ok(FetchedMedia {
            bytes: buffer,
            declared_mime,
        })
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(&self, e: reqwest::Error, url: &str) -> MediaError {
        let err_msg = e.to_string().replace(url, &redact_url_for_log(url));

        if e.is_timeout() {
            MediaError::FetchFailed(format!("下载超时（{}秒）", self.download_timeout))
        } else if e.is_redirect() {
            MediaError::FetchFailed(format!("重定向失败：{}", err_msg))
        } else if e.is_connect() {
            MediaError::FetchFailed(format!("无法连接：{}", err_msg))
        } else {
            MediaError::FetchFailed(format!("请求失败：{}", err_msg))
        }
    }
}

impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cancel: &CancelFlag) -> Result<FetchedMedia, MediaError> {
        let parsed = parse_media_url(url)?;
        cancel.check()?;
        self.download(parsed, cancel).await
    }
}

/// 常见 HTTP 状态码本地化文案。
fn status_message(code: u16) -> &'static str {
    match code {
        401 => "需要身份验证",
        403 => "访问被拒绝",
        404 => "未找到",
        410 => "资源已删除",
        500..=599 => "服务器错误",
        _ => "请求失败",
    }
}
