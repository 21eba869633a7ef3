use std::path::Path;

/// Media type used when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect the declared media type of a picture from its file extension
///
/// Returns `None` for a missing or unknown extension so the caller can fall
/// back to sniffing the content.
pub fn media_type_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "jpg" | "jpeg" | "jpe" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(media_type)
}

/// Sniff the media type from the leading bytes of a file
pub fn sniff_media_type(head: &[u8]) -> Option<&'static str> {
    infer::get(head).map(|kind| kind.mime_type())
}

/// Resolve the media type of a picture, preferring its extension
pub fn detect_media_type(path: &Path, head: &[u8]) -> &'static str {
    media_type_from_extension(path)
        .or_else(|| sniff_media_type(head))
        .unwrap_or(OCTET_STREAM)
}
