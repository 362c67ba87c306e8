//! Target comparison report
//!
//! Targets are read from a [`TargetSource`] (normally the console), compared
//! against observed means, and written to a [`ReportSink`] only once every
//! metric has been evaluated. A bad entry at any prompt produces no report
//! lines at all.

use std::fmt;
use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FeedbackError;
use crate::features::SessionStats;
use crate::types::{Achievement, Metric, TargetSet};

/// Source of raw target entries
pub trait TargetSource {
    /// Ask for the target of `metric`. `Ok(None)` means the input ended.
    fn ask(&mut self, metric: Metric) -> Result<Option<String>, FeedbackError>;
}

/// Destination for report lines
pub trait ReportSink {
    fn emit(&mut self, line: &FeedbackLine) -> Result<(), FeedbackError>;
}

/// Line-based prompt over any reader/writer pair
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
    echo: bool,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            echo: false,
        }
    }

    /// Repeat each entry after its prompt (useful when input is piped)
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

impl<R: BufRead, W: Write> TargetSource for ConsolePrompt<R, W> {
    fn ask(&mut self, metric: Metric) -> Result<Option<String>, FeedbackError> {
        write!(self.output, "{}", metric.prompt())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }

        let entry = line.trim_end_matches(['\r', '\n']).to_string();
        if self.echo {
            writeln!(self.output, "{}", entry)?;
        }
        Ok(Some(entry))
    }
}

/// Writes report lines as text, one per line
pub struct WriteSink<W> {
    out: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for WriteSink<W> {
    fn emit(&mut self, line: &FeedbackLine) -> Result<(), FeedbackError> {
        writeln!(self.out, "{}", line)?;
        Ok(())
    }
}

/// Parse one target entry
pub fn parse_target(metric: Metric, input: &str) -> Result<f64, FeedbackError> {
    let invalid = || FeedbackError::InputParse {
        metric,
        input: input.to_string(),
    };
    let value: f64 = input.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

/// Collect targets in report order.
///
/// Metrics already set in `preset` are not asked for. Cadence is only asked
/// for when the recording has cadence data; otherwise it stays unset.
pub fn collect_targets(
    source: &mut dyn TargetSource,
    has_cadence: bool,
    preset: TargetSet,
) -> Result<TargetSet, FeedbackError> {
    let mut targets = TargetSet::default();

    for metric in Metric::ALL {
        if metric == Metric::Cadence && !has_cadence {
            if preset.target_cadence.is_some() {
                warn!("recording has no cadence data, ignoring cadence target");
            }
            continue;
        }

        if let Some(value) = preset.get(metric) {
            targets.set(metric, value);
            continue;
        }

        let entry = source
            .ask(metric)?
            .ok_or_else(|| FeedbackError::InputParse {
                metric,
                input: String::new(),
            })?;
        targets.set(metric, parse_target(metric, &entry)?);
    }

    debug!(?targets, "targets collected");
    Ok(targets)
}

/// Comparison of one observed mean against its target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackLine {
    pub metric: Metric,
    pub actual: f64,
    pub target: f64,
    pub diff: f64,
    pub status: Achievement,
}

impl FeedbackLine {
    pub fn new(metric: Metric, actual: f64, target: f64) -> Self {
        let diff = actual - target;
        Self {
            metric,
            actual,
            target,
            diff,
            status: Achievement::from_diff(diff),
        }
    }
}

impl fmt::Display for FeedbackLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.metric.unit();
        write!(
            f,
            "{}: actual {:.1}{unit} / target {:.1}{unit} -> {} ({:+.1}{unit})",
            self.metric.label(),
            self.actual,
            self.target,
            self.status,
            self.diff,
        )
    }
}

/// One line per metric that has a target, in report order
pub fn evaluate(stats: &SessionStats, targets: &TargetSet) -> Result<Vec<FeedbackLine>, FeedbackError> {
    let mut lines = Vec::new();
    for metric in Metric::ALL {
        if let Some(target) = targets.get(metric) {
            let actual = stats.require_mean(metric)?;
            lines.push(FeedbackLine::new(metric, actual, target));
        }
    }
    Ok(lines)
}

/// Prompt, evaluate, then emit. Nothing reaches `sink` unless every step
/// before it succeeded.
pub fn run_report(
    stats: &SessionStats,
    has_cadence: bool,
    preset: TargetSet,
    source: &mut dyn TargetSource,
    sink: &mut dyn ReportSink,
) -> Result<Vec<FeedbackLine>, FeedbackError> {
    let targets = collect_targets(source, has_cadence, preset)?;
    let lines = evaluate(stats, &targets)?;
    for line in &lines {
        sink.emit(line)?;
    }
    Ok(lines)
}
