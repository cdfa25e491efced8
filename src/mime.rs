/// Sniff the media type of decoded artifact bytes from their magic number.
pub fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x41, 0x56, 0x45, ..] => Some("audio/wav"),
        [0x49, 0x44, 0x33, ..] => Some("audio/mpeg"),
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some("audio/mpeg"),
        [0x4F, 0x67, 0x67, 0x53, ..] => Some("audio/ogg"),
        [0x66, 0x4C, 0x61, 0x43, ..] => Some("audio/flac"),
        [_, _, _, _, 0x66, 0x74, 0x79, 0x70, ..] => Some("audio/mp4"),
        _ => None,
    }
}

/// Pick the media type for an artifact: sniffed bytes first, then what the
/// backend reported, then `fallback`.
pub fn resolve_mime<'a>(bytes: &[u8], reported: Option<&'a str>, fallback: &'a str) -> &'a str {
    if let Some(mime) = detect_mime(bytes) {
        return mime;
    }
    match reported {
        Some(mime) if !mime.trim().is_empty() => mime,
        _ => {
            tracing::warn!(
                "Unrecognized media format (first 4 bytes: {:02X?}), falling back to {}",
                &bytes[..bytes.len().min(4)],
                fallback
            );
            fallback
        }
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or_default().trim() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/ogg" => "ogg",
        "audio/flac" => "flac",
        "audio/mp4" | "audio/aac" => "m4a",
        _ => "bin",
    }
}
