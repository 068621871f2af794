//! # 暂存模块
//!
//! ## 设计思路
//!
//! 平台媒体库与分享面板只接受文件路径，因此下载的字节需要先落地到临时文件。
//! 每次请求在暂存根目录下独占一个子目录，文件名可以直接使用标题/标识而不会与
//! 并发请求冲突。
//!
//! ## 实现思路
//!
//! - `StagedFile` 采用 RAII：`release()` 或 `Drop` 时删除文件及其子目录。
//! - 删除只尝试一次（`released` 标志），失败仅记录日志，不影响操作结果。
//! - 先创建守卫再写入字节，写入失败时同样会触发清理。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use percent_encoding::percent_decode_str;

use super::MediaError;

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 暂存器：负责把字节写入唯一的临时位置。
#[derive(Debug, Clone)]
pub struct TemporaryStaging {
    root: PathBuf,
}

impl TemporaryStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 将字节写入 `<root>/<唯一子目录>/<file_name>`。
    ///
    /// `file_name` 应已由 [`staged_file_name`] 补齐扩展名。
    pub async fn stage(&self, bytes: &[u8], file_name: &str) -> Result<StagedFile, MediaError> {
        let dir = self.root.join(unique_dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MediaError::StagingIo(format!("无法创建暂存目录 {}：{}", dir.display(), e)))?;

        let path = dir.join(file_name);
        let staged = StagedFile {
            path,
            dir: Some(dir),
            released: false,
        };

        tokio::fs::write(&staged.path, bytes)
            .await
            .map_err(|e| MediaError::StagingIo(format!("写入 {} 失败：{}", staged.path.display(), e)))?;

        log::debug!("📦 已暂存 {} bytes -> {}", bytes.len(), staged.path.display());
        Ok(staged)
    }
}

/// 单次操作范围内的临时文件。
///
/// 离开作用域即删除，任何退出路径（成功、平台失败、本地错误、取消）都只删除一次。
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    dir: Option<PathBuf>,
    released: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// 显式释放：立即删除临时文件。
    pub fn release(mut self) {
        self.remove_once();
    }

    fn remove_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("🧹 已删除临时文件：{}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("⚠️ 删除临时文件失败（忽略）：{}：{}", self.path.display(), e),
        }

        if let Some(dir) = self.dir.take() {
            if let Err(e) = std::fs::remove_dir(&dir) {
                log::debug!("暂存目录未删除：{}：{}", dir.display(), e);
            }
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.remove_once();
    }
}

fn unique_dir_name() -> String {
    let seq = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "op_{}_{}_{}",
        Local::now().format("%Y%m%d%H%M%S%f"),
        std::process::id(),
        seq
    )
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// 清理文件名：替换路径分隔符与控制字符，空名回退到 `fallback`。
pub fn sanitize_file_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.' || c == '_') {
        return fallback.to_string();
    }
    cleaned.to_string()
}

/// 生成暂存文件名。
///
/// - `extension` 为空：保持原名
/// - 原名已以 `.<extension>`（或等价写法）结尾：保持原名
/// - `replace_existing` 为真：替换原有扩展名，否则直接追加
pub fn staged_file_name(base: &str, extension: &str, replace_existing: bool) -> String {
    if extension.is_empty() {
        return base.to_string();
    }

    let current = extension_of(Path::new(base));
    if !current.is_empty() && extensions_equivalent(&current, extension) {
        return base.to_string();
    }

    let stem = if replace_existing && !current.is_empty() {
        Path::new(base)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(base)
    } else {
        base
    };

    format!("{}.{}", stem, extension)
}

fn extensions_equivalent(a: &str, b: &str) -> bool {
    let canonical = |ext: &str| match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpe" => "jpeg".to_string(),
        "tif" => "tiff".to_string(),
        "mpeg" => "mpg".to_string(),
        other => other.to_string(),
    };
    canonical(a) == canonical(b)
}

/// 从 URL 取最后一个非空路径段作为文件名（已做百分号解码）。
pub fn last_path_segment(url: &reqwest::Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stash-media-staging-test-{}-{}", tag, std::process::id()))
    }

    #[tokio::test]
    async fn stage_writes_bytes_and_release_removes_file() {
        let staging = TemporaryStaging::new(test_root("release"));

        let staged = staging.stage(b"hello", "cat.png").await.expect("stage failed");
        let path = staged.path().to_path_buf();

        assert_eq!(staged.file_name(), "cat.png");
        assert_eq!(std::fs::read(&path).expect("read staged file"), b"hello");

        staged.release();
        assert!(!path.exists());
        assert!(!path.parent().expect("parent").exists());
    }

    #[tokio::test]
    async fn dropping_staged_file_removes_it() {
        let staging = TemporaryStaging::new(test_root("drop"));
        let path = {
            let staged = staging.stage(b"x", "clip.mp4").await.expect("stage failed");
            staged.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn same_file_name_gets_distinct_locations() {
        let staging = TemporaryStaging::new(test_root("unique"));

        let first = staging.stage(b"1", "share.jpg").await.expect("stage failed");
        let second = staging.stage(b"2", "share.jpg").await.expect("stage failed");

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).expect("read first"), b"1");
        assert_eq!(std::fs::read(second.path()).expect("read second"), b"2");
    }

    #[tokio::test]
    async fn unwritable_root_is_staging_io_error() {
        let blocker = test_root("blocker");
        std::fs::create_dir_all(blocker.parent().expect("parent")).expect("create parent");
        std::fs::write(&blocker, b"not a directory").expect("write blocker file");

        let staging = TemporaryStaging::new(&blocker);
        let result = staging.stage(b"x", "a.png").await;

        let _ = std::fs::remove_file(&blocker);
        assert!(matches!(result, Err(MediaError::StagingIo(_))));
    }

    #[test]
    fn staged_file_name_appends_or_replaces_extension() {
        assert_eq!(staged_file_name("cat.png", "png", true), "cat.png");
        assert_eq!(staged_file_name("cat.PNG", "png", true), "cat.PNG");
        assert_eq!(staged_file_name("cat.jpg", "jpeg", true), "cat.jpg");
        assert_eq!(staged_file_name("cat.php", "png", true), "cat.png");
        assert_eq!(staged_file_name("cat", "png", true), "cat.png");
        assert_eq!(staged_file_name("my.share", "jpg", false), "my.share.jpg");
        assert_eq!(staged_file_name("cat", "", true), "cat");
    }

    #[test]
    fn sanitize_file_name_strips_separators() {
        assert_eq!(sanitize_file_name("../etc/passwd", "media"), ".._etc_passwd");
        assert_eq!(sanitize_file_name("  ", "media"), "media");
        assert_eq!(sanitize_file_name("..", "media"), "media");
        assert_eq!(sanitize_file_name("a\u{0}b", "media"), "a_b");
    }

    #[test]
    fn last_path_segment_skips_trailing_slash() {
        let url = reqwest::Url::parse("https://example.com/a/cat.png/").expect("parse");
        assert_eq!(last_path_segment(&url).as_deref(), Some("cat.png"));

        let root = reqwest::Url::parse("https://example.com/").expect("parse");
        assert_eq!(last_path_segment(&root), None);
    }

    #[test]
    fn last_path_segment_is_percent_decoded() {
        let url = reqwest::Url::parse("https://example.com/photos/my%20cat.png").expect("parse");
        assert_eq!(last_path_segment(&url).as_deref(), Some("my cat.png"));

        let unicode = reqwest::Url::parse("https://example.com/%E7%8C%AB.gif").expect("parse");
        assert_eq!(last_path_segment(&unicode).as_deref(), Some("猫.gif"));

        let slash = reqwest::Url::parse("https://example.com/a%2Fb.png").expect("parse");
        let decoded = last_path_segment(&slash).expect("segment");
        assert_eq!(sanitize_file_name(&decoded, "image"), "a_b.png");
    }

    proptest! {
        #[test]
        fn staged_name_always_ends_with_requested_extension(
            base in "[a-zA-Z0-9 _.-]{1,24}",
            ext in prop::sample::select(vec!["png", "gif", "mp4", "webm", "avif"]),
        ) {
            let name = staged_file_name(&base, ext, true);
            let lower = name.to_ascii_lowercase();
            let suffix = format!(".{ext}");
            prop_assert!(lower.ends_with(&suffix));
        }

        #[test]
        fn sanitized_name_has_no_separators(name in ".*") {
            let cleaned = sanitize_file_name(&name, "media");
            prop_assert!(!cleaned.contains('/'));
            prop_assert!(!cleaned.contains('\\'));
            prop_assert!(!cleaned.is_empty());
        }
    }
}
