//! Time-series charts
//!
//! Charts are described by [`ChartSpec`] values built from a sample series and
//! handed to a [`ChartRenderer`]. [`PlottersRenderer`] writes them as PNG or
//! SVG files; [`NullRenderer`] discards them.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::FeedbackError;
use crate::types::{Metric, Sample, SampleSeries};

/// One connected run of (time, value) points
pub type Segment = Vec<(DateTime<Utc>, f64)>;

/// The charts this tool draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    HeartRate,
    Speed,
}

impl ChartKind {
    pub const ALL: [ChartKind; 2] = [ChartKind::HeartRate, ChartKind::Speed];

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::HeartRate => "Heart Rate Over Time",
            ChartKind::Speed => "Speed Over Time",
        }
    }

    pub fn y_label(&self) -> &'static str {
        match self {
            ChartKind::HeartRate => "Heart Rate (bpm)",
            ChartKind::Speed => "Speed (km/h)",
        }
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            ChartKind::HeartRate => "heart_rate",
            ChartKind::Speed => "speed",
        }
    }

    fn metric(&self) -> Metric {
        match self {
            ChartKind::HeartRate => Metric::HeartRate,
            ChartKind::Speed => Metric::Speed,
        }
    }

    fn color(&self) -> RGBColor {
        match self {
            ChartKind::HeartRate => RGBColor(200, 30, 45),
            ChartKind::Speed => RGBColor(30, 90, 200),
        }
    }
}

/// Points for one chart, split wherever a sample lacks a value or timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub segments: Vec<Segment>,
}

impl ChartSpec {
    /// Build the chart for `kind`, or `None` if no sample can be plotted
    pub fn from_series(kind: ChartKind, series: &SampleSeries) -> Option<Self> {
        let segments = split_segments(series.as_slice(), |s| kind.metric().value_of(s));
        if segments.is_empty() {
            return None;
        }
        Some(Self { kind, segments })
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    fn points(&self) -> impl Iterator<Item = &(DateTime<Utc>, f64)> {
        self.segments.iter().flatten()
    }

    /// Time axis bounds, widened to one second for a single instant
    pub fn time_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let mut times = self.points().map(|(t, _)| *t);
        let Some(first) = times.next() else {
            let now = Utc::now();
            return (now, now + Duration::seconds(1));
        };
        let (start, end) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        if start == end {
            (start, end + Duration::seconds(1))
        } else {
            (start, end)
        }
    }

    /// Value axis bounds with 5% headroom, widened for a flat series
    pub fn value_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .points()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
                (lo.min(*v), hi.max(*v))
            });
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        let pad = (hi - lo) * 0.05;
        if pad == 0.0 {
            (lo - 1.0, hi + 1.0)
        } else {
            (lo - pad, hi + pad)
        }
    }
}

fn split_segments<F>(samples: &[Sample], value: F) -> Vec<Segment>
where
    F: Fn(&Sample) -> Option<f64>,
{
    let mut segments = Vec::new();
    let mut current: Segment = Vec::new();

    for sample in samples {
        match (sample.timestamp, value(sample)) {
            (Some(t), Some(v)) => current.push((t, v)),
            _ => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Build every chart that has data. Charts with nothing to plot are skipped.
pub fn build_charts(series: &SampleSeries) -> Vec<ChartSpec> {
    ChartKind::ALL
        .iter()
        .filter_map(|kind| {
            let chart = ChartSpec::from_series(*kind, series);
            if chart.is_none() {
                warn!(chart = kind.title(), "no data for chart, skipping");
            }
            chart
        })
        .collect()
}

/// Trait for chart output targets
pub trait ChartRenderer {
    fn render(&mut self, chart: &ChartSpec) -> Result<(), FeedbackError>;
}

/// Renderer that draws nothing
pub struct NullRenderer;

impl ChartRenderer for NullRenderer {
    fn render(&mut self, _chart: &ChartSpec) -> Result<(), FeedbackError> {
        Ok(())
    }
}

/// Chart image format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub out_dir: PathBuf,
    pub format: ImageFormat,
    pub size: (u32, u32),
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            format: ImageFormat::Png,
            size: (1280, 720),
        }
    }
}

/// Writes charts to image files with `plotters`
pub struct PlottersRenderer {
    options: RenderOptions,
    written: Vec<PathBuf>,
}

impl PlottersRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            written: Vec::new(),
        }
    }

    /// File a chart of this kind is written to
    pub fn output_path(&self, kind: ChartKind) -> PathBuf {
        self.options
            .out_dir
            .join(format!("{}.{}", kind.file_stem(), self.options.format.extension()))
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&mut self, chart: &ChartSpec) -> Result<(), FeedbackError> {
        fs::create_dir_all(&self.options.out_dir)?;
        let path = self.output_path(chart.kind);

        match self.options.format {
            ImageFormat::Png => {
                let root = BitMapBackend::new(&path, self.options.size).into_drawing_area();
                draw_chart(root, chart)?;
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(&path, self.options.size).into_drawing_area();
                draw_chart(root, chart)?;
            }
        }

        info!(chart = chart.kind.title(), path = %path.display(), "chart written");
        self.written.push(path);
        Ok(())
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> FeedbackError {
    FeedbackError::Render(e.to_string())
}

/// Number of time ticks requested on the x axis
const X_LABELS: usize = 12;

/// Pixels between the axis line and the start of a time label
const TIME_LABEL_GAP: i32 = 8;

/// Time labels read top to bottom and start just below their tick, so the
/// tick mark never crosses the text.
fn time_label_style<'a>() -> TextStyle<'a> {
    TextStyle::from(("sans-serif", 14))
        .transform(FontTransform::Rotate90)
        .pos(Pos::new(HPos::Left, VPos::Center))
}

fn time_label_anchor((x, y): (i32, i32)) -> (i32, i32) {
    (x, y + TIME_LABEL_GAP)
}

fn draw_chart<DB>(root: DrawingArea<DB, Shift>, chart: &ChartSpec) -> Result<(), FeedbackError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let (x0, x1) = chart.time_range();
    let (y0, y1) = chart.value_range();
    let color = chart.kind.color();

    let mut ctx = ChartBuilder::on(&root)
        .caption(chart.kind.title(), ("sans-serif", 28))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        // Room for the rotated time labels
        .set_label_area_size(LabelAreaPosition::Bottom, 110)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?;

    // The mesh centers rotated labels on their tick, so time labels are drawn
    // separately below
    ctx.configure_mesh()
        .x_desc("Timestamp")
        .y_desc(chart.kind.y_label())
        .x_labels(X_LABELS)
        .x_label_formatter(&|_: &DateTime<Utc>| String::new())
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    let label_style = time_label_style();
    for tick in ctx.as_coord_spec().x_spec().key_points(X_LABELS) {
        let anchor = time_label_anchor(ctx.backend_coord(&(tick, y0)));
        root.draw_text(&tick.format("%H:%M:%S").to_string(), &label_style, anchor)
            .map_err(plot_err)?;
    }

    for segment in &chart.segments {
        ctx.draw_series(LineSeries::new(segment.iter().copied(), &color))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Render every chart in order, stopping at the first failure
pub fn render_all(
    renderer: &mut dyn ChartRenderer,
    charts: &[ChartSpec],
) -> Result<(), FeedbackError> {
    for chart in charts {
        renderer.render(chart)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(1_705_330_800 + secs, 0).single()
    }

    fn sample(secs: i64, hr: Option<u32>, speed: Option<f64>) -> Sample {
        Sample {
            timestamp: at(secs),
            heart_rate: hr,
            speed,
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        rendered: Vec<ChartKind>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&mut self, chart: &ChartSpec) -> Result<(), FeedbackError> {
            self.rendered.push(chart.kind);
            Ok(())
        }
    }

    #[test]
    fn test_both_charts_built() {
        let series: SampleSeries = vec![
            sample(0, Some(120), Some(5.0)),
            sample(1, Some(125), Some(5.5)),
        ]
        .into();

        let charts = build_charts(&series);
        let kinds: Vec<ChartKind> = charts.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChartKind::HeartRate, ChartKind::Speed]);
    }

    #[test]
    fn test_chart_skipped_when_field_absent() {
        let series: SampleSeries = vec![
            sample(0, Some(120), None),
            sample(1, Some(125), None),
        ]
        .into();

        let charts = build_charts(&series);
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].kind, ChartKind::HeartRate);

        let mut renderer = RecordingRenderer::default();
        render_all(&mut renderer, &charts).unwrap();
        assert_eq!(renderer.rendered, vec![ChartKind::HeartRate]);
    }

    #[test]
    fn test_no_charts_for_empty_series() {
        assert!(build_charts(&SampleSeries::new()).is_empty());
    }

    #[test]
    fn test_speed_chart_uses_kmh() {
        let series: SampleSeries = vec![sample(0, None, Some(10.0))].into();
        let chart = ChartSpec::from_series(ChartKind::Speed, &series).unwrap();
        assert_eq!(chart.segments, vec![vec![(at(0).unwrap(), 36.0)]]);
    }

    #[test]
    fn test_gaps_split_segments() {
        let mut untimed = sample(3, Some(140), None);
        untimed.timestamp = None;

        let series: SampleSeries = vec![
            sample(0, Some(120), None),
            sample(1, Some(122), None),
            sample(2, None, None),
            untimed,
            sample(4, Some(131), None),
        ]
        .into();

        let chart = ChartSpec::from_series(ChartKind::HeartRate, &series).unwrap();
        assert_eq!(chart.segments.len(), 2);
        assert_eq!(chart.segments[0].len(), 2);
        assert_eq!(chart.segments[1], vec![(at(4).unwrap(), 131.0)]);
        assert_eq!(chart.point_count(), 3);
    }

    #[test]
    fn test_single_point_ranges_are_widened() {
        let series: SampleSeries = vec![sample(0, Some(100), None)].into();
        let chart = ChartSpec::from_series(ChartKind::HeartRate, &series).unwrap();

        let (x0, x1) = chart.time_range();
        assert_eq!(x1 - x0, Duration::seconds(1));
        assert_eq!(chart.value_range(), (99.0, 101.0));
    }

    #[test]
    fn test_time_range_handles_out_of_order_samples() {
        let series: SampleSeries = vec![
            sample(30, Some(110), None),
            sample(0, Some(100), None),
            sample(10, Some(105), None),
        ]
        .into();
        let chart = ChartSpec::from_series(ChartKind::HeartRate, &series).unwrap();
        assert_eq!(chart.time_range(), (at(0).unwrap(), at(30).unwrap()));
    }

    #[test]
    fn test_output_path() {
        let renderer = PlottersRenderer::new(RenderOptions {
            out_dir: PathBuf::from("charts"),
            format: ImageFormat::Svg,
            ..Default::default()
        });
        assert_eq!(
            renderer.output_path(ChartKind::Speed),
            PathBuf::from("charts/speed.svg")
        );
    }

    #[test]
    fn test_out_dir_that_is_a_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut renderer = PlottersRenderer::new(RenderOptions {
            out_dir: file.path().join("sub"),
            ..Default::default()
        });
        let series: SampleSeries = vec![sample(0, Some(100), None)].into();
        let chart = ChartSpec::from_series(ChartKind::HeartRate, &series).unwrap();

        assert!(matches!(renderer.render(&chart), Err(FeedbackError::Io(_))));
        assert!(renderer.written().is_empty());
    }

    #[test]
    fn test_time_labels_hang_below_their_tick() {
        let style = time_label_style();
        assert!(matches!(style.pos.h_pos, HPos::Left));
        assert!(matches!(style.pos.v_pos, VPos::Center));
        assert!(matches!(style.font.get_transform(), FontTransform::Rotate90));

        let (x, y) = time_label_anchor((400, 590));
        assert_eq!(x, 400);
        assert!(y > 590);
    }
}
