//! Recording adapters
//!
//! This module provides adapters that open a recording file, decode it into
//! messages, and map record messages to the fixed-field [`Sample`] structure.
//!
//! [`Sample`]: crate::types::Sample

mod fit;

pub use fit::{count_records, extract_samples, load_fit, sample_from_fields, FitAdapter};

use std::path::{Path, PathBuf};

use crate::error::FeedbackError;
use crate::types::SampleSeries;

/// A decoded recording, before extraction
#[derive(Debug, Clone)]
pub struct LoadedRecording<M> {
    /// Absolute path the recording was read from
    pub path: PathBuf,
    /// Every decoded message, in file order
    pub messages: Vec<M>,
    /// Number of record messages among `messages`
    pub record_count: usize,
}

/// Trait for recording format adapters
pub trait RecordingAdapter {
    /// Decoded message type produced by `load`
    type Message;

    /// Open and decode the recording at `path`.
    ///
    /// The file handle must not outlive this call.
    fn load(&self, path: &Path) -> Result<LoadedRecording<Self::Message>, FeedbackError>;

    /// Map record messages to samples, keeping source order
    fn extract(&self, messages: &[Self::Message]) -> SampleSeries;
}
