//! fit-feedback - Training feedback from FIT activity recordings
//!
//! A recording goes through a linear pipeline: load and decode → extract
//! samples → descriptive statistics → time-series charts → a comparison of
//! observed averages against user targets.
//!
//! ## Modules
//!
//! - **adapters**: decode recordings and map record messages to samples
//! - **features**: per-channel means, extremes and time span
//! - **render**: heart rate and speed charts
//! - **feedback**: target prompts and the achieved / not achieved report
//! - **pipeline**: runs the stages in order

pub mod adapters;
pub mod encoder;
pub mod error;
pub mod features;
pub mod feedback;
pub mod pipeline;
pub mod render;
pub mod types;

pub use error::{FeedbackError, PipelineError, PipelineStage};
pub use pipeline::{Analysis, FeedbackSession, RunConfig};
pub use types::{Metric, Sample, SampleSeries, TargetSet};

/// Version embedded in diagnostic summaries
pub const FEEDBACK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for diagnostic summaries
pub const PRODUCER_NAME: &str = "fit-feedback";
