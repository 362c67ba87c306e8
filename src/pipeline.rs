//! Pipeline orchestration
//!
//! This module provides the public API for fit-feedback.
//! It runs a recording through load → extract → aggregate → render → report,
//! tagging any failure with the stage that raised it.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::adapters::{FitAdapter, RecordingAdapter};
use crate::encoder::{DiagnosticEncoder, SessionSummary, DEFAULT_PREVIEW_LEN};
use crate::error::{PipelineError, PipelineStage, StageExt};
use crate::feedback::{run_report, FeedbackLine, ReportSink, TargetSource};
use crate::features::{SessionStats, StatsDeriver};
use crate::render::{
    build_charts, render_all, ChartKind, ChartRenderer, NullRenderer, PlottersRenderer,
    RenderOptions,
};
use crate::types::{SampleSeries, TargetSet};

/// Result of the load, extract and aggregate stages
#[derive(Debug, Clone)]
pub struct Analysis {
    pub path: PathBuf,
    pub record_count: usize,
    pub series: SampleSeries,
    pub stats: SessionStats,
}

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Samples shown in the diagnostic preview
    pub preview_len: usize,
    /// Targets known up front; the rest are asked for
    pub targets: TargetSet,
    /// Chart output, or `None` to skip rendering
    pub charts: Option<RenderOptions>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            preview_len: DEFAULT_PREVIEW_LEN,
            targets: TargetSet::default(),
            charts: Some(RenderOptions::default()),
        }
    }
}

/// Runs recordings through the pipeline
pub struct FeedbackSession<A = FitAdapter> {
    adapter: A,
    encoder: DiagnosticEncoder,
    config: RunConfig,
}

impl Default for FeedbackSession<FitAdapter> {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackSession<FitAdapter> {
    /// Create a session reading FIT files
    pub fn new() -> Self {
        Self::with_adapter(FitAdapter)
    }
}

impl<A: RecordingAdapter> FeedbackSession<A> {
    pub fn with_adapter(adapter: A) -> Self {
        Self {
            adapter,
            encoder: DiagnosticEncoder::new(),
            config: RunConfig::default(),
        }
    }

    /// Apply run settings; the preview length is passed on to the encoder
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.encoder = self.encoder.preview_len(config.preview_len);
        self.config = config;
        self
    }

    /// Replace the diagnostic encoder (e.g. to change the preview length)
    pub fn with_encoder(mut self, encoder: DiagnosticEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn encoder(&self) -> &DiagnosticEncoder {
        &self.encoder
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Stages 1-3: load, extract, aggregate
    pub fn analyze(&self, path: &Path) -> Result<Analysis, PipelineError> {
        // Stage 1: Decode the recording; the file is closed when this returns
        let loaded = self.adapter.load(path).stage(PipelineStage::Load)?;

        // Stage 2: Map record messages to samples
        let series = self.adapter.extract(&loaded.messages);
        if series.is_empty() {
            warn!(path = %loaded.path.display(), "recording has no record messages");
        }

        // Stage 3: Descriptive statistics
        let stats = StatsDeriver::derive(&series);
        info!(
            samples = stats.sample_count,
            mean_hr = ?stats.heart_rate.mean,
            mean_speed_kmh = ?stats.speed_kmh.mean,
            "recording summarized"
        );

        Ok(Analysis {
            path: loaded.path,
            record_count: loaded.record_count,
            series,
            stats,
        })
    }

    /// Diagnostic summary of an analysis
    pub fn summarize(&self, analysis: &Analysis) -> SessionSummary {
        self.encoder.encode(
            &analysis.path,
            analysis.record_count,
            &analysis.series,
            &analysis.stats,
        )
    }

    /// Diagnostic summary as pretty JSON
    pub fn summary_json(&self, analysis: &Analysis) -> Result<String, PipelineError> {
        self.encoder
            .encode_to_json(&self.summarize(analysis))
            .stage(PipelineStage::Output)
    }

    /// Stage 4 with the configured chart output. Returns the files written.
    pub fn render_charts(&self, analysis: &Analysis) -> Result<Vec<PathBuf>, PipelineError> {
        let Some(options) = &self.config.charts else {
            debug!("chart rendering disabled");
            self.render(analysis, &mut NullRenderer)?;
            return Ok(Vec::new());
        };

        let mut renderer = PlottersRenderer::new(options.clone());
        self.render(analysis, &mut renderer)?;
        Ok(renderer.written().to_vec())
    }

    /// Stage 4: draw every chart that has data
    pub fn render(
        &self,
        analysis: &Analysis,
        renderer: &mut dyn ChartRenderer,
    ) -> Result<Vec<ChartKind>, PipelineError> {
        let charts = build_charts(&analysis.series);
        render_all(renderer, &charts).stage(PipelineStage::Render)?;
        Ok(charts.iter().map(|c| c.kind).collect())
    }

    /// Stage 5: compare targets against observed means. Targets missing from
    /// the configuration are asked for through `source`.
    pub fn report(
        &self,
        analysis: &Analysis,
        source: &mut dyn TargetSource,
        sink: &mut dyn ReportSink,
    ) -> Result<Vec<FeedbackLine>, PipelineError> {
        run_report(
            &analysis.stats,
            analysis.series.has_cadence(),
            self.config.targets,
            source,
            sink,
        )
        .stage(PipelineStage::Report)
    }
}
