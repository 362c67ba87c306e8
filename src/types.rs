//! Core types for the fit-feedback pipeline
//!
//! This module defines the data that flows between stages: extracted samples,
//! the ordered sample series, user targets, and the metrics a report covers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meters per second to kilometers per hour
pub const MS_TO_KMH: f64 = 3.6;

/// One record message from a recording, reduced to the channels we use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Point in time of the reading (UTC)
    pub timestamp: Option<DateTime<Utc>>,
    /// Heart rate (bpm)
    pub heart_rate: Option<u32>,
    /// Speed (m/s)
    pub speed: Option<f64>,
    /// Cadence (rpm)
    pub cadence: Option<u32>,
    /// Power (watts)
    pub power: Option<f64>,
}

impl Sample {
    /// Speed in km/h, present exactly where `speed` is present
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed.map(|s| s * MS_TO_KMH)
    }
}

/// Samples in the order they appear in the source file.
///
/// No sorting or deduplication is ever applied; out-of-order and repeated
/// timestamps are kept as they were recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// True if at least one sample carries a cadence reading
    pub fn has_cadence(&self) -> bool {
        self.samples.iter().any(|s| s.cadence.is_some())
    }
}

impl From<Vec<Sample>> for SampleSeries {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl FromIterator<Sample> for SampleSeries {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SampleSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// The metrics a feedback report compares against targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HeartRate,
    Speed,
    Cadence,
}

impl Metric {
    /// Report order
    pub const ALL: [Metric; 3] = [Metric::HeartRate, Metric::Speed, Metric::Cadence];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heart rate",
            Metric::Speed => "speed",
            Metric::Cadence => "cadence",
        }
    }

    /// Label used on report lines
    pub fn label(&self) -> &'static str {
        match self {
            Metric::HeartRate => "Average heart rate",
            Metric::Speed => "Average speed",
            Metric::Cadence => "Average cadence",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::HeartRate => "bpm",
            Metric::Speed => "km/h",
            Metric::Cadence => "rpm",
        }
    }

    pub fn prompt(&self) -> String {
        format!("Target {} ({}): ", self.label().to_lowercase(), self.unit())
    }

    /// Value of this metric for one sample, in report units
    pub fn value_of(&self, sample: &Sample) -> Option<f64> {
        match self {
            Metric::HeartRate => sample.heart_rate.map(f64::from),
            Metric::Speed => sample.speed_kmh(),
            Metric::Cadence => sample.cadence.map(f64::from),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied targets. Speed is in km/h.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSet {
    pub target_hr: Option<f64>,
    pub target_speed: Option<f64>,
    pub target_cadence: Option<f64>,
}

impl TargetSet {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::HeartRate => self.target_hr,
            Metric::Speed => self.target_speed,
            Metric::Cadence => self.target_cadence,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::HeartRate => self.target_hr = Some(value),
            Metric::Speed => self.target_speed = Some(value),
            Metric::Cadence => self.target_cadence = Some(value),
        }
    }
}

/// Whether a metric met its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    Achieved,
    NotAchieved,
}

impl Achievement {
    /// A zero difference counts as achieved
    pub fn from_diff(diff: f64) -> Self {
        if diff >= 0.0 {
            Achievement::Achieved
        } else {
            Achievement::NotAchieved
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Achievement::Achieved => "achieved",
            Achievement::NotAchieved => "not achieved",
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
