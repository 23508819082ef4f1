//! Progress translation
//!
//! Converts raw transfer counters reported by the extraction engine into the
//! normalized fields stored on a task record (fraction, speed, ETA). The
//! translator keeps the previous sample so it can derive a speed when the
//! engine does not report one. It never fails; anything it cannot compute is
//! reported as unknown.

use crate::types::{ProgressSample, RawProgress};
use std::time::Duration;

/// Stateful translator for one task's progress callbacks
#[derive(Debug, Default, Clone)]
pub struct ProgressTranslator {
    last: Option<(u64, Duration)>,
}

impl ProgressTranslator {
    /// Create a translator with no previous sample
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one callback's counters
    ///
    /// # Arguments
    ///
    /// * `raw` - Counters reported by the engine
    /// * `elapsed` - Time since the worker started the fetch
    pub fn translate(&mut self, raw: RawProgress, elapsed: Duration) -> ProgressSample {
        let downloaded = raw.downloaded_bytes;

        // Estimates can undershoot; never report more bytes than the total
        let total = raw
            .total_bytes
            .filter(|t| *t > 0)
            .map(|t| t.max(downloaded));

        let progress = total.map(|t| (downloaded as f64 / t as f64).clamp(0.0, 1.0));

        let derived = self.derive_speed(downloaded, elapsed);
        let speed = raw
            .speed
            .filter(|s| s.is_finite() && *s >= 0.0)
            .or(derived);

        let eta = match (total, speed) {
            (Some(t), Some(s)) if s > 0.0 => Some(t.saturating_sub(downloaded) as f64 / s),
            _ => None,
        };

        self.last = Some((downloaded, elapsed));

        ProgressSample {
            progress,
            downloaded_bytes: downloaded,
            total_bytes: total,
            speed,
            eta,
        }
    }

    /// Bytes per second since the previous sample
    fn derive_speed(&self, downloaded: u64, elapsed: Duration) -> Option<f64> {
        let (prev_bytes, prev_elapsed) = self.last?;
        let delta_bytes = downloaded.checked_sub(prev_bytes)?;
        let delta_secs = elapsed.checked_sub(prev_elapsed)?.as_secs_f64();
        if delta_secs <= 0.0 {
            return None;
        }
        Some(delta_bytes as f64 / delta_secs)
    }
}
