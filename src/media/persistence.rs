//! # 媒体库持久化模块
//!
//! ## 设计思路
//!
//! 把暂存文件交给平台媒体库，并按媒体类型选择创建路径：
//! - 静态图片：解码后走“内存图像”路径
//! - 动图：必须走“文件”路径，内存路径会把动图压成单帧
//! - 视频：总是走“文件”路径
//!
//! 平台差异通过 `MediaLibrary` 端口隔离，桌面端实现为 `FsMediaLibrary`。
//!
//! ## 实现思路
//!
//! `persist` 接管 `StagedFile` 的所有权，无论平台返回成功还是失败，
//! 结束时都会释放（删除）暂存文件。

use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use image::{DynamicImage, ImageFormat};

use super::pipeline::{decode_image, is_animated};
use super::source::OperationResult;
use super::staging::StagedFile;
use super::MediaError;

/// 持久化的媒体类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

/// 媒体库创建路径。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistencePath {
    InMemoryImage,
    ImageFile,
    VideoFile,
}

/// 平台媒体库返回的失败。
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("没有访问媒体库的权限")]
    Denied,
    #[error("{0}")]
    Failed(String),
    #[error("未知错误")]
    Unknown,
}

impl From<LibraryError> for MediaError {
    fn from(error: LibraryError) -> Self {
        match error {
            LibraryError::Denied => MediaError::PersistenceDenied,
            LibraryError::Failed(reason) => MediaError::PersistenceFailed(reason),
            LibraryError::Unknown => MediaError::PersistenceUnknownFailure,
        }
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            LibraryError::Denied
        } else {
            LibraryError::Failed(error.to_string())
        }
    }
}

/// 平台媒体库端口。
pub trait MediaLibrary: Send + Sync {
    /// 内存图像路径（静态图片）。
    fn save_image(
        &self,
        image: DynamicImage,
        name_hint: &str,
    ) -> impl Future<Output = Result<(), LibraryError>> + Send;

    /// 文件路径（保留动图的全部帧）。
    fn save_image_file(&self, file: &Path) -> impl Future<Output = Result<(), LibraryError>> + Send;

    fn save_video_file(&self, file: &Path) -> impl Future<Output = Result<(), LibraryError>> + Send;
}

/// 持久化编排：选择创建路径 → 调用媒体库 → 释放暂存文件。
pub struct MediaPersistence<L> {
    library: L,
}

impl<L: MediaLibrary> MediaPersistence<L> {
    pub fn new(library: L) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// 持久化暂存文件，结束后无条件删除它。
    pub async fn persist(&self, staged: StagedFile, kind: MediaKind) -> Result<OperationResult, MediaError> {
        let outcome = self.persist_staged(&staged, kind).await;
        staged.release();

        outcome.map(|path| {
            log::info!("💾 已写入媒体库 - path={:?}", path);
            match kind {
                MediaKind::Photo => OperationResult::succeeded("图片已保存到相册"),
                MediaKind::Video => OperationResult::succeeded("视频已保存到相册"),
            }
        })
    }

    async fn persist_staged(&self, staged: &StagedFile, kind: MediaKind) -> Result<PersistencePath, MediaError> {
        if kind == MediaKind::Video {
            self.library.save_video_file(staged.path()).await?;
            return Ok(PersistencePath::VideoFile);
        }

        let bytes = tokio::fs::read(staged.path())
            .await
            .map_err(|e| MediaError::StagingIo(format!("读取暂存文件失败：{}", e)))?;

        if is_animated(&bytes) {
            log::debug!("🎞️ 检测到动图，使用文件路径保存：{}", staged.file_name());
            self.library.save_image_file(staged.path()).await?;
            return Ok(PersistencePath::ImageFile);
        }

        match decode_image(&bytes) {
            Ok(image) => {
                let hint = Path::new(staged.file_name())
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("image");
                self.library.save_image(image, hint).await?;
                Ok(PersistencePath::InMemoryImage)
            }
            Err(err) => {
                // 本地无法解码的格式（HEIC/JXL 等）交给平台按文件识别
                log::debug!("静态图解码失败，改用文件路径：{}", err);
                self.library.save_image_file(staged.path()).await?;
                Ok(PersistencePath::ImageFile)
            }
        }
    }
}

/// 桌面端媒体库：图片与视频分别复制到各自目录。
#[derive(Debug, Clone)]
pub struct FsMediaLibrary {
    images_dir: PathBuf,
    videos_dir: PathBuf,
}

impl FsMediaLibrary {
    pub fn new(images_dir: impl Into<PathBuf>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            videos_dir: videos_dir.into(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    async fn copy_into(dir: &Path, file: &Path) -> Result<(), LibraryError> {
        tokio::fs::create_dir_all(dir).await?;

        let name = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| LibraryError::Failed(format!("无效的文件名：{}", file.display())))?
            .to_string();
        let dir = dir.to_path_buf();
        let source = file.to_path_buf();

        run_blocking(move || {
            let mut input = File::open(&source)?;
            write_claimed(&dir, &name, |output| {
                io::copy(&mut input, output)?;
                Ok(())
            })
        })
        .await
    }
}

impl MediaLibrary for FsMediaLibrary {
    async fn save_image(&self, image: DynamicImage, name_hint: &str) -> Result<(), LibraryError> {
        tokio::fs::create_dir_all(&self.images_dir).await?;
        let dir = self.images_dir.clone();
        let name = format!("{}.png", name_hint);

        run_blocking(move || {
            write_claimed(&dir, &name, |output| {
                image.write_to(output, ImageFormat::Png).map_err(|e| match e {
                    image::ImageError::IoError(io) => LibraryError::from(io),
                    other => LibraryError::Failed(other.to_string()),
                })
            })
        })
        .await
    }

    async fn save_image_file(&self, file: &Path) -> Result<(), LibraryError> {
        Self::copy_into(&self.images_dir, file).await
    }

    async fn save_video_file(&self, file: &Path) -> Result<(), LibraryError> {
        Self::copy_into(&self.videos_dir, file).await
    }
}

const MAX_CLAIM_ATTEMPTS: u32 = 64;

async fn run_blocking<F>(task: F) -> Result<(), LibraryError>
where
    F: FnOnce() -> Result<(), LibraryError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| LibraryError::Failed(format!("线程执行失败：{}", e)))?
}

/// 独占创建目标文件后写入；写入失败时删除已创建的半成品。
fn write_claimed<W>(dir: &Path, file_name: &str, write: W) -> Result<(), LibraryError>
where
    W: FnOnce(&mut BufWriter<File>) -> Result<(), LibraryError>,
{
    let (target, file) = claim_target(dir, file_name)?;
    let mut output = BufWriter::new(file);

    let written = write(&mut output).and_then(|()| output.flush().map_err(LibraryError::from));
    if let Err(err) = written {
        drop(output);
        if let Err(e) = std::fs::remove_file(&target) {
            log::warn!("⚠️ 清理未完成的媒体文件失败：{}：{}", target.display(), e);
        }
        return Err(err);
    }

    log::debug!("📥 已写入媒体库：{}", target.display());
    Ok(())
}

/// 以 `create_new` 原子占用文件名；已存在时追加时间戳（及序号）重试，绝不覆盖。
fn claim_target(dir: &Path, file_name: &str) -> Result<(PathBuf, File), LibraryError> {
    let path = Path::new(file_name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("media");
    let extension = path.extension().and_then(|e| e.to_str());

    for attempt in 0..MAX_CLAIM_ATTEMPTS {
        let candidate = match attempt {
            0 => dir.join(file_name),
            n => {
                let timestamp = Local::now().format("%Y%m%d%H%M%S%f");
                let suffixed = if n == 1 {
                    format!("{}_{}", stem, timestamp)
                } else {
                    format!("{}_{}_{}", stem, timestamp, n)
                };
                match extension {
                    Some(ext) => dir.join(format!("{}.{}", suffixed, ext)),
                    None => dir.join(suffixed),
                }
            }
        };

        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(LibraryError::Failed(format!("无法为 {} 分配不重复的文件名", file_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::pipeline::fixtures::{create_gif_bytes, create_png_bytes};
    use crate::media::staging::TemporaryStaging;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLibrary {
        calls: Mutex<Vec<PersistencePath>>,
        deny: bool,
    }

    impl RecordingLibrary {
        fn record(&self, path: PersistencePath) -> Result<(), LibraryError> {
            self.calls.lock().expect("lock poisoned").push(path);
            if self.deny {
                return Err(LibraryError::Denied);
            }
            Ok(())
        }

        fn calls(&self) -> Vec<PersistencePath> {
            self.calls.lock().expect("lock poisoned").clone()
        }
    }

    impl MediaLibrary for RecordingLibrary {
        async fn save_image(&self, _image: DynamicImage, _name_hint: &str) -> Result<(), LibraryError> {
            self.record(PersistencePath::InMemoryImage)
        }

        async fn save_image_file(&self, file: &Path) -> Result<(), LibraryError> {
            assert!(file.exists(), "staged file must exist while the library reads it");
            self.record(PersistencePath::ImageFile)
        }

        async fn save_video_file(&self, file: &Path) -> Result<(), LibraryError> {
            assert!(file.exists(), "staged file must exist while the library reads it");
            self.record(PersistencePath::VideoFile)
        }
    }

    fn test_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stash-media-persistence-test-{}-{}", tag, std::process::id()))
    }

    #[tokio::test]
    async fn static_image_uses_in_memory_path_and_cleans_up() {
        let staging = TemporaryStaging::new(test_dir("static"));
        let staged = staging.stage(&create_png_bytes(8, 8), "cat.png").await.expect("stage failed");
        let staged_path = staged.path().to_path_buf();
        let persistence = MediaPersistence::new(RecordingLibrary::default());

        let result = persistence.persist(staged, MediaKind::Photo).await.expect("persist failed");

        assert!(result.success);
        assert_eq!(persistence.library().calls(), vec![PersistencePath::InMemoryImage]);
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn animated_gif_uses_file_path() {
        let staging = TemporaryStaging::new(test_dir("animated"));
        let staged = staging.stage(&create_gif_bytes(3), "dance.gif").await.expect("stage failed");
        let persistence = MediaPersistence::new(RecordingLibrary::default());

        persistence.persist(staged, MediaKind::Photo).await.expect("persist failed");

        assert_eq!(persistence.library().calls(), vec![PersistencePath::ImageFile]);
    }

    #[tokio::test]
    async fn undecodable_photo_falls_back_to_file_path() {
        let staging = TemporaryStaging::new(test_dir("opaque"));
        let staged = staging.stage(b"heic-ish bytes", "photo.heic").await.expect("stage failed");
        let persistence = MediaPersistence::new(RecordingLibrary::default());

        persistence.persist(staged, MediaKind::Photo).await.expect("persist failed");

        assert_eq!(persistence.library().calls(), vec![PersistencePath::ImageFile]);
    }

    #[tokio::test]
    async fn video_always_uses_file_path() {
        let staging = TemporaryStaging::new(test_dir("video"));
        let staged = staging.stage(b"mp4", "default.mp4").await.expect("stage failed");
        let persistence = MediaPersistence::new(RecordingLibrary::default());

        let result = persistence.persist(staged, MediaKind::Video).await.expect("persist failed");

        assert!(result.success);
        assert_eq!(persistence.library().calls(), vec![PersistencePath::VideoFile]);
    }

    #[tokio::test]
    async fn denied_library_still_removes_staged_file() {
        let staging = TemporaryStaging::new(test_dir("denied"));
        let staged = staging.stage(b"mp4", "clip.mp4").await.expect("stage failed");
        let staged_path = staged.path().to_path_buf();
        let persistence = MediaPersistence::new(RecordingLibrary {
            deny: true,
            ..RecordingLibrary::default()
        });

        let result = persistence.persist(staged, MediaKind::Video).await;

        assert!(matches!(result, Err(MediaError::PersistenceDenied)));
        assert!(!staged_path.exists());
    }

    #[test]
    fn library_errors_map_to_taxonomy() {
        assert!(matches!(MediaError::from(LibraryError::Denied), MediaError::PersistenceDenied));
        assert!(matches!(
            MediaError::from(LibraryError::Failed("disk".into())),
            MediaError::PersistenceFailed(reason) if reason == "disk"
        ));
        assert!(matches!(MediaError::from(LibraryError::Unknown), MediaError::PersistenceUnknownFailure));
    }

    #[tokio::test]
    async fn fs_library_copies_files_without_overwriting() {
        let root = test_dir("fs");
        let library = FsMediaLibrary::new(root.join("images"), root.join("videos"));
        let source = root.join("dance.gif");
        std::fs::create_dir_all(&root).expect("create root");
        std::fs::write(&source, create_gif_bytes(2)).expect("write source");

        library.save_image_file(&source).await.expect("first copy failed");
        library.save_image_file(&source).await.expect("second copy failed");

        let copies = std::fs::read_dir(library.images_dir()).expect("read images dir").count();
        assert_eq!(copies, 2);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fs_library_overlapping_saves_with_same_name_keep_both() {
        let root = test_dir("fs-concurrent");
        let _ = std::fs::remove_dir_all(&root);
        let library = FsMediaLibrary::new(root.join("images"), root.join("videos"));

        for _ in 0..4 {
            let first = image::load_from_memory(&create_png_bytes(4, 4)).expect("decode fixture");
            let second = image::load_from_memory(&create_png_bytes(5, 5)).expect("decode fixture");
            let (a, b) = tokio::join!(library.save_image(first, "cat"), library.save_image(second, "cat"));
            a.expect("first save failed");
            b.expect("second save failed");
        }

        let mut sizes: Vec<(u32, u32)> = std::fs::read_dir(library.images_dir())
            .expect("read images dir")
            .map(|entry| image::image_dimensions(entry.expect("dir entry").path()).expect("read saved image"))
            .collect();
        sizes.sort();
        assert_eq!(sizes, vec![(4, 4), (4, 4), (4, 4), (4, 4), (5, 5), (5, 5), (5, 5), (5, 5)]);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn claim_target_never_reuses_an_existing_name() {
        let root = test_dir("claim");
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).expect("create root");

        let (first, _) = claim_target(&root, "clip.mp4").expect("first claim");
        let (second, _) = claim_target(&root, "clip.mp4").expect("second claim");
        let (third, _) = claim_target(&root, "clip.mp4").expect("third claim");

        assert_eq!(first, root.join("clip.mp4"));
        assert_ne!(second, first);
        assert_ne!(third, second);
        assert_eq!(third.extension().and_then(|e| e.to_str()), Some("mp4"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn fs_library_encodes_in_memory_image_as_png() {
        let root = test_dir("fs-image");
        let library = FsMediaLibrary::new(root.join("images"), root.join("videos"));
        let image = image::load_from_memory(&create_png_bytes(6, 6)).expect("decode fixture");

        library.save_image(image, "cat").await.expect("save image failed");

        let saved = library.images_dir().join("cat.png");
        assert_eq!(image::image_dimensions(&saved).expect("read saved image"), (6, 6));

        let _ = std::fs::remove_dir_all(&root);
    }
}
