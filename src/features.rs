//! Descriptive statistics
//!
//! This module derives per-channel statistics from a sample series:
//! - Means over present values only
//! - Min/max and present-value counts
//! - Recording time span

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::FeedbackError;
use crate::types::{Metric, Sample, SampleSeries};

/// Statistics for a single channel. `mean`, `min` and `max` are `None` when
/// no sample carries the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ChannelStats {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            count,
            mean: Some(sum / count as f64),
            min: Some(min),
            max: Some(max),
        }
    }

    /// Statistics over the values `field` yields, skipping samples where it
    /// is `None`
    pub fn of<F>(samples: &[Sample], field: F) -> Self
    where
        F: Fn(&Sample) -> Option<f64>,
    {
        Self::from_values(samples.iter().filter_map(field))
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Statistics for a whole recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub sample_count: usize,
    pub heart_rate: ChannelStats,
    /// Speed in m/s
    pub speed: ChannelStats,
    /// Speed in km/h
    pub speed_kmh: ChannelStats,
    pub cadence: ChannelStats,
    pub power: ChannelStats,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Channel backing a report metric
    pub fn channel(&self, metric: Metric) -> &ChannelStats {
        match metric {
            Metric::HeartRate => &self.heart_rate,
            Metric::Speed => &self.speed_kmh,
            Metric::Cadence => &self.cadence,
        }
    }

    /// Observed mean for a metric, or `EmptyData` when it is undefined
    pub fn require_mean(&self, metric: Metric) -> Result<f64, FeedbackError> {
        self.channel(metric)
            .mean
            .ok_or(FeedbackError::EmptyData { metric })
    }

    /// Time between the first and last timestamped samples in file order
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Stats deriver for computing session statistics
pub struct StatsDeriver;

impl StatsDeriver {
    /// Derive statistics from a sample series
    pub fn derive(series: &SampleSeries) -> SessionStats {
        let samples = series.as_slice();
        let timestamps = || series.iter().filter_map(|s| s.timestamp);
        let metric = |m: Metric| move |s: &Sample| m.value_of(s);

        SessionStats {
            sample_count: series.len(),
            heart_rate: ChannelStats::of(samples, metric(Metric::HeartRate)),
            speed: ChannelStats::of(samples, |s| s.speed),
            speed_kmh: ChannelStats::of(samples, metric(Metric::Speed)),
            cadence: ChannelStats::of(samples, metric(Metric::Cadence)),
            power: ChannelStats::of(samples, |s| s.power),
            start_time: timestamps().next(),
            end_time: timestamps().last(),
        }
    }
}
