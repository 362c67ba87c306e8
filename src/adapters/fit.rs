//! FIT recording adapter
//!
//! Decodes FIT files with `fitparser` and maps `record` messages to samples.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use tracing::{debug, info};

use super::{LoadedRecording, RecordingAdapter};
use crate::error::FeedbackError;
use crate::types::{Sample, SampleSeries};

/// FIT file adapter
pub struct FitAdapter;

impl RecordingAdapter for FitAdapter {
    type Message = FitDataRecord;

    fn load(&self, path: &Path) -> Result<LoadedRecording<FitDataRecord>, FeedbackError> {
        load_fit(path)
    }

    fn extract(&self, messages: &[FitDataRecord]) -> SampleSeries {
        extract_samples(messages)
    }
}

/// Resolve, open and decode a FIT file.
///
/// Fails with [`FeedbackError::FileNotFound`] when `path` is not an existing
/// regular file and with [`FeedbackError::Decode`] when the content is not a
/// valid FIT stream.
pub fn load_fit(path: &Path) -> Result<LoadedRecording<FitDataRecord>, FeedbackError> {
    let resolved = resolve_path(path)?;
    info!(path = %resolved.display(), "loading recording");

    let messages = {
        let file = File::open(&resolved).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FeedbackError::FileNotFound(resolved.clone()),
            _ => FeedbackError::Io(e),
        })?;
        let mut reader = BufReader::new(file);
        fitparser::from_reader(&mut reader).map_err(|e| FeedbackError::Decode {
            path: resolved.clone(),
            reason: e.to_string(),
        })?
    };

    let record_count = count_records(&messages);
    debug!(messages = messages.len(), "decoded FIT messages");
    info!(records = record_count, "decoded recording");

    Ok(LoadedRecording {
        path: resolved,
        messages,
        record_count,
    })
}

fn resolve_path(path: &Path) -> Result<PathBuf, FeedbackError> {
    let resolved = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if !resolved.is_file() {
        return Err(FeedbackError::FileNotFound(resolved));
    }
    Ok(resolved)
}

/// Number of `record` messages among decoded messages
pub fn count_records(messages: &[FitDataRecord]) -> usize {
    messages
        .iter()
        .filter(|m| m.kind() == MesgNum::Record)
        .count()
}

/// Extract one sample per `record` message, in file order
pub fn extract_samples(messages: &[FitDataRecord]) -> SampleSeries {
    messages
        .iter()
        .filter(|m| m.kind() == MesgNum::Record)
        .map(|m| sample_from_fields(m.fields().iter().map(|f| (f.name(), f.value()))))
        .collect()
}

/// Build a sample from the named fields of one record message.
///
/// Fields that are missing or carry a non-numeric value stay `None`.
/// `enhanced_speed` is used only when `speed` is not present.
pub fn sample_from_fields<'a, I>(fields: I) -> Sample
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut sample = Sample::default();
    let mut enhanced_speed = None;

    for (name, value) in fields {
        match name {
            "timestamp" => {
                if let Value::Timestamp(ts) = value {
                    sample.timestamp = Some(ts.with_timezone(&Utc));
                }
            }
            "heart_rate" => sample.heart_rate = value_to_count(value),
            "speed" => sample.speed = value_to_f64(value),
            "enhanced_speed" => enhanced_speed = value_to_f64(value),
            "cadence" => sample.cadence = value_to_count(value),
            "power" => sample.power = value_to_f64(value),
            _ => {}
        }
    }

    if sample.speed.is_none() {
        sample.speed = enhanced_speed;
    }

    sample
}

fn value_to_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Float32(v) => *v as f64,
        Value::Float64(v) => *v,
        Value::Byte(v) => *v as f64,
        Value::SInt8(v) => *v as f64,
        Value::UInt8(v) => *v as f64,
        Value::UInt8z(v) => *v as f64,
        Value::SInt16(v) => *v as f64,
        Value::UInt16(v) => *v as f64,
        Value::UInt16z(v) => *v as f64,
        Value::SInt32(v) => *v as f64,
        Value::UInt32(v) => *v as f64,
        Value::UInt32z(v) => *v as f64,
        Value::SInt64(v) => *v as f64,
        Value::UInt64(v) => *v as f64,
        Value::UInt64z(v) => *v as f64,
        Value::Array(values) => return values.iter().find_map(value_to_f64),
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn value_to_count(value: &Value) -> Option<u32> {
    value_to_f64(value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use fitparser::FitDataField;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn ts(secs: i64) -> Value {
        let utc = Utc.timestamp_opt(secs, 0).unwrap();
        Value::Timestamp(utc.with_timezone(&Local))
    }

    fn message(kind: MesgNum, fields: Vec<(&str, u8, Value)>) -> FitDataRecord {
        let mut record = FitDataRecord::new(kind);
        for (name, number, value) in fields {
            record.push(FitDataField::new(name.to_string(), number, None, value, String::new()));
        }
        record
    }

    #[test]
    fn test_sample_from_full_record() {
        let timestamp = ts(1_705_330_800);
        let hr = Value::UInt8(142);
        let speed = Value::Float64(7.25);
        let cadence = Value::UInt8(88);
        let power = Value::UInt16(215);

        let sample = sample_from_fields([
            ("timestamp", &timestamp),
            ("heart_rate", &hr),
            ("speed", &speed),
            ("cadence", &cadence),
            ("power", &power),
        ]);

        assert_eq!(
            sample,
            Sample {
                timestamp: Utc.timestamp_opt(1_705_330_800, 0).single(),
                heart_rate: Some(142),
                speed: Some(7.25),
                cadence: Some(88),
                power: Some(215.0),
            }
        );
    }

    #[test]
    fn test_missing_fields_are_absent_not_zero() {
        let timestamp = ts(1_705_330_800);
        let hr = Value::UInt8(120);

        let sample = sample_from_fields([("timestamp", &timestamp), ("heart_rate", &hr)]);

        assert_eq!(sample.heart_rate, Some(120));
        assert_eq!(sample.speed, None);
        assert_eq!(sample.cadence, None);
        assert_eq!(sample.power, None);
    }

    #[test]
    fn test_enhanced_speed_fallback() {
        let enhanced = Value::Float64(6.0);
        let sample = sample_from_fields([("enhanced_speed", &enhanced)]);
        assert_eq!(sample.speed, Some(6.0));

        let speed = Value::Float64(5.5);
        let sample = sample_from_fields([("enhanced_speed", &enhanced), ("speed", &speed)]);
        assert_eq!(sample.speed, Some(5.5));
    }

    #[test]
    fn test_non_numeric_values_are_absent() {
        let text = Value::String("n/a".to_string());
        let nan = Value::Float64(f64::NAN);
        let negative = Value::SInt16(-5);

        let sample = sample_from_fields([
            ("heart_rate", &text),
            ("speed", &nan),
            ("cadence", &negative),
        ]);

        assert_eq!(sample.heart_rate, None);
        assert_eq!(sample.speed, None);
        assert_eq!(sample.cadence, None);
    }

    #[test]
    fn test_unrelated_fields_ignored() {
        let alt = Value::Float64(312.4);
        let dist = Value::Float64(1500.0);
        let sample = sample_from_fields([("altitude", &alt), ("distance", &dist)]);
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.fit");

        let result = load_fit(&path);
        assert!(matches!(result, Err(FeedbackError::FileNotFound(p)) if p.ends_with("nope.fit")));
    }

    #[test]
    fn test_load_directory_is_not_a_recording() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_fit(dir.path());
        assert!(matches!(result, Err(FeedbackError::FileNotFound(_))));
    }

    #[test]
    fn test_load_garbage_is_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a FIT file at all").unwrap();
        file.flush().unwrap();

        let result = load_fit(file.path());
        assert!(matches!(result, Err(FeedbackError::Decode { .. })));
    }

    #[test]
    fn test_extract_empty_message_list() {
        let series = extract_samples(&[]);
        assert!(series.is_empty());
    }

    #[test]
    fn test_extract_keeps_only_records_in_file_order() {
        let messages = vec![
            message(MesgNum::FileId, vec![("time_created", 4, ts(1_705_330_700))]),
            message(
                MesgNum::Record,
                vec![
                    ("timestamp", 253, ts(1_705_330_810)),
                    ("heart_rate", 3, Value::UInt8(130)),
                    ("speed", 6, Value::Float64(6.5)),
                ],
            ),
            message(
                MesgNum::Session,
                vec![("avg_heart_rate", 16, Value::UInt8(140))],
            ),
            message(
                MesgNum::Record,
                vec![
                    ("timestamp", 253, ts(1_705_330_800)),
                    ("speed", 6, Value::Float64(7.0)),
                ],
            ),
            message(
                MesgNum::Record,
                vec![
                    ("timestamp", 253, ts(1_705_330_820)),
                    ("heart_rate", 3, Value::UInt8(150)),
                ],
            ),
        ];

        assert_eq!(count_records(&messages), 3);

        let series = extract_samples(&messages);
        let samples = series.as_slice();
        assert_eq!(samples.len(), 3);

        // Out-of-order timestamps are kept as recorded
        let timestamps: Vec<_> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![
                Utc.timestamp_opt(1_705_330_810, 0).single(),
                Utc.timestamp_opt(1_705_330_800, 0).single(),
                Utc.timestamp_opt(1_705_330_820, 0).single(),
            ]
        );

        assert_eq!(samples[0].heart_rate, Some(130));
        assert_eq!(samples[1].heart_rate, None);
        assert_eq!(samples[1].speed, Some(7.0));
        assert_eq!(samples[2].heart_rate, Some(150));
        assert_eq!(samples[2].speed, None);
    }
}
