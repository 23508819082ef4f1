//! Utility functions for serving downloaded files over HTTP

use std::path::Path;

/// Build a `Content-Disposition: attachment` header value for a filename
///
/// The plain `filename` parameter carries an ASCII-only fallback (non-ASCII
/// characters, quotes, backslashes and control characters replaced with `_`);
/// the RFC 5987 `filename*` parameter carries the exact UTF-8 name.
///
/// # Examples
///
/// ```
/// use media_dl::utils::content_disposition;
///
/// assert_eq!(
///     content_disposition("clip.mp4"),
///     "attachment; filename=\"clip.mp4\"; filename*=UTF-8''clip.mp4"
/// );
/// assert_eq!(
///     content_disposition("été.mp4"),
///     "attachment; filename=\"__t__.mp4\"; filename*=UTF-8''%C3%A9t%C3%A9.mp4"
/// );
/// ```
#[must_use]
pub fn content_disposition(filename: &str) -> String {
    let fallback = ascii_fallback(filename);
    let encoded = urlencoding::encode(filename);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// Replace every byte that cannot appear in a quoted header parameter
fn ascii_fallback(filename: &str) -> String {
    let cleaned: String = filename
        .bytes()
        .map(|b| match b {
            b'"' | b'\\' => '_',
            0x20..=0x7e => b as char,
            _ => '_',
        })
        .collect();

    if cleaned.trim_matches('_').trim().is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

/// Guess a media type from a file's extension
///
/// Unknown or missing extensions map to `application/octet-stream`.
///
/// # Examples
///
/// ```
/// use media_dl::utils::guess_media_type;
/// use std::path::Path;
///
/// assert_eq!(guess_media_type(Path::new("clip.MP4")), "video/mp4");
/// assert_eq!(guess_media_type(Path::new("noext")), "application/octet-stream");
/// ```
#[must_use]
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("flv") => "video/x-flv",
        Some("3gp") => "video/3gpp",
        Some("ts") => "video/mp2t",
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("opus" | "ogg" | "oga") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("aac") => "audio/aac",
        _ => "application/octet-stream",
    }
}
