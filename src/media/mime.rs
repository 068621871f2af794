//! MIME 类型 → 文件扩展名映射。
//!
//! 全函数：任何输入都不会报错，无法识别或为空时返回空字符串，
//! 由调用方决定省略扩展名还是使用按媒体类型的默认值。

/// 将 `Content-Type` 规范化：去掉参数、去空白、转小写。
pub fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// MIME 类型对应的规范扩展名（小写、不带点）。
pub fn extension_for_mime(mime: &str) -> &'static str {
    match normalize_mime(mime).as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpeg",
        "image/png" | "image/apng" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/jxl" => "jxl",
        "image/avif" => "avif",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/bmp" | "image/x-ms-bmp" => "bmp",
        "image/tiff" => "tiff",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "video/webm" => "webm",
        "video/x-m4v" => "m4v",
        "video/3gpp" => "3gp",
        "video/mpeg" => "mpg",
        _ => "",
    }
}

/// 可选 MIME 的便捷版本，`None` 等同于未知类型。
pub fn extension_for(mime: Option<&str>) -> &'static str {
    mime.map(extension_for_mime).unwrap_or("")
}
