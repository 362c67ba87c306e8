//! Error types for fit-feedback

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Metric;

/// Errors that can occur while loading, summarizing or reporting on a recording
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Recording not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to decode recording {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Invalid number for {metric}: {input:?}")]
    InputParse { metric: Metric, input: String },

    #[error("No {metric} values in recording, mean is undefined")]
    EmptyData { metric: Metric },

    #[error("Chart rendering failed: {0}")]
    Render(String),

    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedbackError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            FeedbackError::FileNotFound(_) => "FILE_NOT_FOUND",
            FeedbackError::Decode { .. } => "DECODE_ERROR",
            FeedbackError::InputParse { .. } => "INPUT_PARSE_ERROR",
            FeedbackError::EmptyData { .. } => "EMPTY_DATA",
            FeedbackError::Render(_) => "RENDER_ERROR",
            FeedbackError::Io(_) => "IO_ERROR",
            FeedbackError::Json(_) => "JSON_ERROR",
        }
    }
}

/// Stage that can stop a run. Extraction and aggregation cannot fail, so
/// they have no tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Render,
    Report,
    /// Writing the diagnostic summary
    Output,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Load => "load",
            PipelineStage::Render => "render",
            PipelineStage::Report => "report",
            PipelineStage::Output => "output",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`FeedbackError`] tagged with the stage that raised it
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: FeedbackError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: FeedbackError) -> Self {
        Self { stage, source }
    }
}

/// Attach a stage to a fallible step
pub(crate) trait StageExt<T> {
    fn stage(self, stage: PipelineStage) -> Result<T, PipelineError>;
}

impl<T> StageExt<T> for Result<T, FeedbackError> {
    fn stage(self, stage: PipelineStage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, e))
    }
}
