//! # 解码与格式识别模块
//!
//! ## 设计思路
//!
//! 集中管理“字节 → 图像”相关的判断与变换：
//! - 剪贴板：解码为 RGBA，解码前先按头信息做像素上限检查
//! - 保存：判断是否为动图，动图必须走文件路径，否则只会保存第一帧
//! - 分享：AVIF 重新编码为 JPEG，兼容不接受 AVIF 的分享目标
//!
//! 除上述格式兼容处理外，不对内容做任何变换（不缩放、不裁剪）。

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, GenericImageView, ImageReader};

use super::mime::extension_for;
use super::source::FetchedMedia;
use super::MediaError;

/// 可直接写入剪贴板的 RGBA 数据。
#[derive(Debug, Clone)]
pub struct ClipboardImage {
    pub width: usize,
    pub height: usize,
    /// RGBA 字节数组（`width * height * 4`）。
    pub bytes: Vec<u8>,
}

/// 将原始字节解码为可写入剪贴板的 RGBA 数据。
pub fn decode_for_clipboard(bytes: &[u8], max_decoded_pixels: u64) -> Result<ClipboardImage, MediaError> {
    let (header_width, header_height) = inspect_dimensions(bytes)?;
    validate_pixel_limits(header_width, header_height, max_decoded_pixels)?;

    let decoded = decode_image(bytes)?;
    let (width, height) = decoded.dimensions();
    validate_pixel_limits(width, height, max_decoded_pixels)?;

    let rgba = decoded.to_rgba8().into_raw();
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| MediaError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

    if rgba.len() != expected_len {
        return Err(MediaError::DecodeFailed("解码后像素数据长度异常".to_string()));
    }

    log::info!("✅ 图片解码成功 - 尺寸: {}x{}", width, height);

    Ok(ClipboardImage {
        width: width as usize,
        height: height as usize,
        bytes: rgba,
    })
}

/// 完整解码为 `DynamicImage`（静态图保存走内存路径时使用）。
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, MediaError> {
    image::load_from_memory(bytes).map_err(|e| MediaError::DecodeFailed(e.to_string()))
}

/// 仅通过图片头信息读取宽高。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), MediaError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::DecodeFailed(format!("无法识别图片格式：{}", e)))?
        .into_dimensions()
        .map_err(|e| MediaError::DecodeFailed(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(width: u32, height: u32, max_decoded_pixels: u64) -> Result<(), MediaError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| MediaError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > max_decoded_pixels {
        return Err(MediaError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, max_decoded_pixels
        )));
    }

    Ok(())
}

/// 判断字节是否为多帧动图（GIF / APNG / 动态 WebP）。
///
/// 以文件签名识别实际格式，不信任声明的 MIME。
pub fn is_animated(bytes: &[u8]) -> bool {
    let Some(kind) = infer::get(bytes) else {
        return false;
    };

    match kind.mime_type() {
        "image/gif" => GifDecoder::new(Cursor::new(bytes))
            .map(|decoder| decoder.into_frames().take(2).filter(Result::is_ok).count() > 1)
            .unwrap_or(false),
        "image/png" | "image/apng" => PngDecoder::new(Cursor::new(bytes))
            .and_then(|decoder| decoder.is_apng())
            .unwrap_or(false),
        "image/webp" => WebPDecoder::new(Cursor::new(bytes))
            .map(|decoder| decoder.has_animation())
            .unwrap_or(false),
        _ => false,
    }
}

/// 分享前的格式归一化，返回待暂存的字节与扩展名。
///
/// 声明为 `image/avif` 时转为 JPEG（AVIF 解码依赖 `image` 的 `avif-native` 特性）；
/// 仅在数据本身损坏、无法解码时保留原字节并记录警告。
pub fn normalize_for_share(media: FetchedMedia, jpeg_quality: u8) -> (Vec<u8>, &'static str) {
    let extension = extension_for(media.declared_mime.as_deref());
    if extension != "avif" {
        return (media.bytes, extension);
    }

    match transcode_to_jpeg(&media.bytes, jpeg_quality) {
        Ok(jpeg) => {
            log::info!("🔁 AVIF 已转为 JPEG（{} -> {} bytes）", media.bytes.len(), jpeg.len());
            (jpeg, "jpg")
        }
        Err(err) => {
            log::warn!("⚠️ AVIF 转 JPEG 失败，按原格式分享：{}", err);
            (media.bytes, extension)
        }
    }
}

fn transcode_to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, MediaError> {
    let decoded = decode_image(bytes)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| MediaError::DecodeFailed(format!("JPEG 编码失败：{}", e)))?;

    Ok(out)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::codecs::avif::AvifEncoder;
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{DynamicImage, ExtendedColorType, Frame, ImageBuffer, ImageEncoder, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    pub(crate) fn create_avif_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 128, 255]));

        let mut out = Vec::new();
        AvifEncoder::new_with_speed_quality(&mut out, 10, 80)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
            .expect("failed to encode avif fixture");
        out
    }

    pub(crate) fn create_gif_bytes(frame_count: u8) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            encoder.set_repeat(Repeat::Infinite).expect("set repeat failed");
            let frames = (0..frame_count)
                .map(|i| Frame::new(RgbaImage::from_pixel(8, 8, Rgba([i.saturating_mul(60), 0, 0, 255]))));
            encoder.encode_frames(frames).expect("encode gif failed");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{create_avif_bytes, create_gif_bytes, create_png_bytes};
    use super::*;

    #[test]
    fn decode_for_clipboard_returns_rgba() {
        let png = create_png_bytes(32, 16);

        let prepared = decode_for_clipboard(&png, 40_000_000).expect("decode should succeed");

        assert_eq!((prepared.width, prepared.height), (32, 16));
        assert_eq!(prepared.bytes.len(), 32 * 16 * 4);
    }

    #[test]
    fn decode_for_clipboard_rejects_non_image_bytes() {
        let result = decode_for_clipboard(b"<html>not an image</html>", 40_000_000);
        assert!(matches!(result, Err(MediaError::DecodeFailed(_))));
    }

    #[test]
    fn decode_for_clipboard_rejects_too_many_pixels() {
        let png = create_png_bytes(200, 200);
        let result = decode_for_clipboard(&png, 1_000);
        assert!(matches!(result, Err(MediaError::ResourceLimit(_))));
    }

    #[test]
    fn animated_gif_is_detected() {
        assert!(is_animated(&create_gif_bytes(3)));
    }

    #[test]
    fn single_frame_gif_and_png_are_static() {
        assert!(!is_animated(&create_gif_bytes(1)));
        assert!(!is_animated(&create_png_bytes(4, 4)));
        assert!(!is_animated(b"definitely not media"));
    }

    #[test]
    fn avif_fixture_is_real_avif() {
        let avif = create_avif_bytes(16, 16);
        assert_eq!(infer::get(&avif).map(|kind| kind.mime_type()), Some("image/avif"));
    }

    #[test]
    fn avif_media_is_transcoded_to_jpeg() {
        let avif = create_avif_bytes(16, 16);
        let media = FetchedMedia {
            bytes: avif.clone(),
            declared_mime: Some("image/avif".to_string()),
        };

        let (bytes, extension) = normalize_for_share(media, 90);

        assert_eq!(extension, "jpg");
        assert_ne!(bytes, avif);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image::load_from_memory(&bytes).expect("decode jpeg").dimensions(), (16, 16));
    }

    #[test]
    fn undecodable_avif_keeps_original_bytes() {
        let media = FetchedMedia {
            bytes: b"opaque".to_vec(),
            declared_mime: Some("image/avif".to_string()),
        };

        let (bytes, extension) = normalize_for_share(media, 90);

        assert_eq!(extension, "avif");
        assert_eq!(bytes, b"opaque");
    }

    #[test]
    fn non_avif_media_passes_through() {
        let png = create_png_bytes(4, 4);
        let media = FetchedMedia {
            bytes: png.clone(),
            declared_mime: Some("image/png".to_string()),
        };

        let (bytes, extension) = normalize_for_share(media, 90);

        assert_eq!(extension, "png");
        assert_eq!(bytes, png);
    }
}
