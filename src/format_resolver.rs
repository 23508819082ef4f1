//! Format expression resolution
//!
//! Turns a caller's format choice into the expression handed to the extraction
//! engine. A video-only choice is paired with the best audio-only stream using
//! the `video+audio` combinator so the engine muxes both into one container.

use crate::error::{Error, Result};
use crate::types::{FormatInfo, FormatRequest};
use std::cmp::Ordering;

/// Expression used when the caller did not pick a format
pub const DEFAULT_FORMAT_EXPR: &str = "bv*+ba/best";

/// Resolve a format request against the formats of the most recent probe.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `format_id` is not among `formats`.
/// An empty `formats` list together with conclusive hints (the caller says the
/// format has audio, or has no video) is accepted without validation.
///
/// # Examples
///
/// ```
/// use media_dl::format_resolver::resolve_format_expr;
/// use media_dl::types::{FormatInfo, FormatRequest};
///
/// let formats = vec![
///     FormatInfo { format_id: "137".into(), has_video: true, ..Default::default() },
///     FormatInfo { format_id: "140".into(), has_audio: true, abr: Some(128.0), ..Default::default() },
/// ];
/// let request = FormatRequest { format_id: Some("137".into()), ..Default::default() };
/// assert_eq!(resolve_format_expr(&request, &formats).unwrap(), "137+140");
/// ```
pub fn resolve_format_expr(request: &FormatRequest, formats: &[FormatInfo]) -> Result<String> {
    resolve_with_default(request, formats, DEFAULT_FORMAT_EXPR)
}

/// Same as [`resolve_format_expr`] with a configurable default expression.
pub fn resolve_with_default(
    request: &FormatRequest,
    formats: &[FormatInfo],
    default_expr: &str,
) -> Result<String> {
    let Some(format_id) = request
        .format_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    else {
        return Ok(default_expr.to_string());
    };

    if formats.is_empty() && request.hints_are_conclusive() {
        return Ok(format_id.to_string());
    }

    let selected = formats
        .iter()
        .find(|f| f.format_id == format_id)
        .ok_or_else(|| {
            Error::Validation(format!(
                "format '{}' is not among the probed formats",
                format_id
            ))
        })?;

    if !selected.is_video_only() {
        return Ok(format_id.to_string());
    }

    match best_audio(formats, format_id) {
        Some(audio) => Ok(format!("{}+{}", format_id, audio.format_id)),
        None => {
            tracing::debug!(
                format_id,
                "no audio-only format available, fetching video without audio"
            );
            Ok(format_id.to_string())
        }
    }
}

/// Audio-only format with the highest bitrate; ties keep probe order.
fn best_audio<'a>(formats: &'a [FormatInfo], exclude_id: &str) -> Option<&'a FormatInfo> {
    formats
        .iter()
        .filter(|f| f.is_audio_only() && f.format_id != exclude_id)
        .fold(None, |best: Option<&FormatInfo>, candidate| match best {
            Some(current) if compare_abr(candidate.abr, current.abr) != Ordering::Greater => {
                Some(current)
            }
            _ => Some(candidate),
        })
}

/// Unknown bitrates rank below every known one.
fn compare_abr(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
