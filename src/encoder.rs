//! Diagnostic summary encoding
//!
//! This module packages what was loaded and computed for a recording into a
//! [`SessionSummary`], printable as plain text or JSON.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::FeedbackError;
use crate::features::{ChannelStats, SessionStats};
use crate::types::{Sample, SampleSeries};
use crate::{FEEDBACK_VERSION, PRODUCER_NAME};

/// Samples shown in the preview unless configured otherwise
pub const DEFAULT_PREVIEW_LEN: usize = 3;

/// Producer metadata
#[derive(Debug, Clone, Serialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Everything the diagnostic output reports about one recording
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub producer: Producer,
    pub source_path: String,
    pub record_count: usize,
    pub computed_at_utc: String,
    pub preview: Vec<Sample>,
    pub stats: SessionStats,
}

/// Diagnostic encoder
pub struct DiagnosticEncoder {
    instance_id: String,
    preview_len: usize,
}

impl Default for DiagnosticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            instance_id,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    pub fn preview_len(mut self, n: usize) -> Self {
        self.preview_len = n;
        self
    }

    pub fn encode(
        &self,
        path: &Path,
        record_count: usize,
        series: &SampleSeries,
        stats: &SessionStats,
    ) -> SessionSummary {
        SessionSummary {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: FEEDBACK_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            source_path: path.display().to_string(),
            record_count,
            computed_at_utc: Utc::now().to_rfc3339(),
            preview: series.iter().take(self.preview_len).cloned().collect(),
            stats: stats.clone(),
        }
    }

    pub fn encode_to_json(&self, summary: &SessionSummary) -> Result<String, FeedbackError> {
        Ok(serde_json::to_string_pretty(summary)?)
    }

    /// Plain-text rendering of a summary
    pub fn encode_to_text(&self, summary: &SessionSummary) -> String {
        let mut out = String::new();
        let stats = &summary.stats;

        // Writing to a String cannot fail
        let _ = writeln!(out, "=== Recording ===");
        let _ = writeln!(out, "Path:    {}", summary.source_path);
        let _ = writeln!(out, "Records: {}", summary.record_count);
        if let Some(elapsed) = stats.elapsed() {
            let secs = elapsed.num_seconds();
            let _ = writeln!(
                out,
                "Elapsed: {:02}:{:02}:{:02}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60
            );
        }

        let _ = writeln!(out, "=== Sample preview ===");
        let _ = writeln!(
            out,
            "{:<25} {:>10} {:>8} {:>8} {:>8}",
            "timestamp", "heart_rate", "speed", "cadence", "power"
        );
        for s in &summary.preview {
            let _ = writeln!(
                out,
                "{:<25} {:>10} {:>8} {:>8} {:>8}",
                fmt_time(s.timestamp),
                fmt_opt(s.heart_rate.map(f64::from), 0),
                fmt_opt(s.speed, 3),
                fmt_opt(s.cadence.map(f64::from), 0),
                fmt_opt(s.power, 0),
            );
        }

        let _ = writeln!(out, "=== Stats ===");
        let _ = writeln!(out, "Mean heart_rate: {}", fmt_mean(&stats.heart_rate));
        let _ = writeln!(out, "Mean speed:      {} m/s", fmt_mean(&stats.speed));
        let _ = writeln!(out, "Mean speed_kmh:  {} km/h", fmt_mean(&stats.speed_kmh));
        if !stats.cadence.is_empty() {
            let _ = writeln!(out, "Mean cadence:    {}", fmt_mean(&stats.cadence));
        }
        if !stats.power.is_empty() {
            let _ = writeln!(out, "Mean power:      {} W", fmt_mean(&stats.power));
        }
        if let Some(max_hr) = stats.heart_rate.max {
            let _ = writeln!(out, "Max heart_rate:  {:.0}", max_hr);
        }
        if let Some(max_speed) = stats.speed_kmh.max {
            let _ = writeln!(out, "Max speed_kmh:   {:.1} km/h", max_speed);
        }

        out
    }
}

fn fmt_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "NaT".to_string())
}

/// Absent values print as `NaN`, never as zero
fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(v) => format!("{:.*}", precision, v),
        None => "NaN".to_string(),
    }
}

fn fmt_mean(stats: &ChannelStats) -> String {
    fmt_opt(stats.mean, 3)
}
