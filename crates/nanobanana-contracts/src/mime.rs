//! MIME type and file extension mapping.
//!
//! Both directions are total: unknown inputs fall back to PNG.

use std::path::Path;

pub const DEFAULT_MIME: &str = "image/png";

/// Extension (with leading dot) for an image MIME type.
pub fn extension_from_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/webp" => ".webp",
        _ => ".png",
    }
}

/// MIME type inferred from the final path segment's extension, case-insensitively.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => DEFAULT_MIME,
    }
}
