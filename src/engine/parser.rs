//! Parsers for yt-dlp output

use crate::error::{ExtractionError, ExtractionErrorKind};
use crate::types::{FormatInfo, ProbeResult, RawProgress};
use serde_json::Value;
use std::cmp::Ordering;

/// Marker that starts every progress line produced by [`PROGRESS_TEMPLATE`]
pub(crate) const PROGRESS_MARKER: &str = "[media-dl:progress]";

/// Value of `--progress-template`; missing fields are printed as `NA`
pub(crate) const PROGRESS_TEMPLATE: &str = "download:[media-dl:progress] \
    %(progress.downloaded_bytes)s %(progress.total_bytes)s \
    %(progress.total_bytes_estimate)s %(progress.speed)s";

/// Parse the JSON document printed by `yt-dlp -J`
///
/// Formats are ordered audio-bearing first, then by descending height, then by
/// descending bitrate. Entries without a `format_id` are skipped.
///
/// # Errors
///
/// Returns an [`ExtractionError`] when the output is not a JSON object.
pub fn parse_probe_json(url: &str, json: &[u8]) -> Result<ProbeResult, ExtractionError> {
    let info: Value = serde_json::from_slice(json).map_err(|e| {
        ExtractionError::new(
            ExtractionErrorKind::Other,
            format!("could not parse engine output: {}", e),
        )
    })?;

    // A bare list of entries: describe the first one
    let info = match info {
        Value::Array(entries) => entries.into_iter().next().ok_or_else(|| {
            ExtractionError::new(
                ExtractionErrorKind::ContentUnavailable,
                "no downloadable entries found",
            )
        })?,
        other => other,
    };

    if !info.is_object() {
        return Err(ExtractionError::new(
            ExtractionErrorKind::Other,
            "unsupported response from extractor",
        ));
    }

    let is_playlist = info.get("_type").and_then(Value::as_str) == Some("playlist");
    let has_entries = info
        .get("entries")
        .and_then(Value::as_array)
        .is_some_and(|e| !e.is_empty());

    Ok(ProbeResult {
        url: url.to_string(),
        title: string_field(&info, "title"),
        duration: info.get("duration").and_then(Value::as_f64),
        uploader: string_field(&info, "uploader"),
        extractor: string_field(&info, "extractor"),
        is_downloadable: !is_playlist || has_entries,
        thumbnail: string_field(&info, "thumbnail"),
        formats: extract_formats(&info),
        default_format_id: id_field(&info, "format_id"),
    })
}

fn extract_formats(info: &Value) -> Vec<FormatInfo> {
    let Some(raw) = info.get("formats").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut formats: Vec<FormatInfo> = raw.iter().filter_map(format_from_json).collect();
    formats.sort_by(|a, b| {
        b.has_audio
            .cmp(&a.has_audio)
            .then_with(|| b.height().cmp(&a.height()))
            .then_with(|| {
                let (va, vb) = (a.vbr.unwrap_or(0.0), b.vbr.unwrap_or(0.0));
                vb.partial_cmp(&va).unwrap_or(Ordering::Equal)
            })
    });
    formats
}

fn format_from_json(fmt: &Value) -> Option<FormatInfo> {
    let format_id = id_field(fmt, "format_id").filter(|id| !id.is_empty())?;

    let width = fmt.get("width").and_then(Value::as_u64).filter(|w| *w > 0);
    let height = fmt.get("height").and_then(Value::as_u64).filter(|h| *h > 0);
    let resolution = match (width, height) {
        (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
        _ => string_field(fmt, "resolution"),
    };

    let acodec = string_field(fmt, "acodec");
    let vcodec = string_field(fmt, "vcodec");

    Some(FormatInfo {
        format_id,
        ext: string_field(fmt, "ext"),
        resolution,
        fps: fmt.get("fps").and_then(Value::as_f64),
        filesize: size_field(fmt, "filesize"),
        filesize_approx: size_field(fmt, "filesize_approx"),
        format_note: string_field(fmt, "format_note"),
        abr: fmt.get("abr").and_then(Value::as_f64),
        vbr: fmt.get("tbr").and_then(Value::as_f64),
        has_audio: codec_present(acodec.as_deref()),
        has_video: codec_present(vcodec.as_deref()),
        acodec,
        vcodec,
    })
}

fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if c != "none")
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// String field that some extractors report as a number
fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn size_field(value: &Value, key: &str) -> Option<u64> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .filter(|s| *s > 0.0)
        .map(|s| s as u64)
}

/// Parse one line printed through [`PROGRESS_TEMPLATE`]
///
/// Returns `None` for lines that are not progress lines or carry no byte
/// count. An exact total wins over an estimate.
pub fn parse_progress_line(line: &str) -> Option<RawProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut fields = rest.split_whitespace().map(parse_number);

    let downloaded = fields.next().flatten()?;
    let total = fields.next().flatten();
    let estimate = fields.next().flatten();
    let speed = fields.next().flatten();

    Some(RawProgress {
        downloaded_bytes: downloaded as u64,
        total_bytes: total.or(estimate).map(|t| t as u64),
        speed,
    })
}

fn parse_number(field: &str) -> Option<f64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
}

/// The message of the last `ERROR:` line in yt-dlp's stderr
pub(crate) fn last_error_line(stderr: &[String]) -> Option<String> {
    stderr.iter().rev().find_map(|line| {
        line.trim()
            .strip_prefix("ERROR:")
            .map(|msg| msg.trim().to_string())
            .filter(|msg| !msg.is_empty())
    })
}

/// Map an engine error message to a failure category
pub fn categorize_error(message: &str) -> ExtractionErrorKind {
    let msg = message.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));

    if any(&["unsupported url", "is not a valid url", "no suitable extractor"]) {
        ExtractionErrorKind::UnsupportedUrl
    } else if any(&["ffmpeg", "ffprobe", "postprocessing", "merging", "conversion failed"]) {
        ExtractionErrorKind::Postprocessing
    } else if any(&[
        "unable to download",
        "http error",
        "timed out",
        "connection",
        "name resolution",
        "network is unreachable",
        "ssl",
    ]) {
        ExtractionErrorKind::Network
    } else if any(&[
        "private video",
        "unavailable",
        "has been removed",
        "available in your country",
        "geo restrict",
        "geo-restrict",
        "sign in",
        "login required",
        "members-only",
        "requested format is not available",
    ]) {
        ExtractionErrorKind::ContentUnavailable
    } else {
        ExtractionErrorKind::Other
    }
}
