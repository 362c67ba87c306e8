//! fitfb - Command-line interface for fit-feedback
//!
//! Loads a FIT recording, prints a diagnostic summary, writes heart rate and
//! speed charts, then asks for target averages and reports whether each one
//! was reached.

use clap::{Parser, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use fit_feedback::feedback::{ConsolePrompt, WriteSink};
use fit_feedback::render::{ImageFormat, RenderOptions};
use fit_feedback::{
    FeedbackError, FeedbackSession, PipelineError, RunConfig, TargetSet, FEEDBACK_VERSION,
};

/// fitfb - Training feedback from a FIT activity recording
#[derive(Parser)]
#[command(name = "fitfb")]
#[command(author = "Synheart AI Inc")]
#[command(version = FEEDBACK_VERSION)]
#[command(about = "Summarize a FIT recording, chart it, and check it against your targets", long_about = None)]
struct Cli {
    /// FIT recording to analyze
    #[arg(default_value = "data/sample.fit")]
    path: PathBuf,

    /// Directory charts are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Chart image format
    #[arg(long, default_value = "png")]
    format: ChartFormat,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Number of samples shown in the preview
    #[arg(long, default_value = "3")]
    preview: usize,

    /// Target average heart rate (bpm); skips the prompt
    #[arg(long)]
    target_hr: Option<f64>,

    /// Target average speed (km/h); skips the prompt
    #[arg(long)]
    target_speed: Option<f64>,

    /// Target average cadence (rpm); skips the prompt
    #[arg(long)]
    target_cadence: Option<f64>,

    /// Print the diagnostic summary as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, ValueEnum)]
enum ChartFormat {
    /// PNG bitmap
    Png,
    /// SVG vector image
    Svg,
}

impl From<ChartFormat> for ImageFormat {
    fn from(format: ChartFormat) -> Self {
        match format {
            ChartFormat::Png => ImageFormat::Png,
            ChartFormat::Svg => ImageFormat::Svg,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = RunConfig {
        preview_len: cli.preview,
        targets: TargetSet {
            target_hr: cli.target_hr,
            target_speed: cli.target_speed,
            target_cadence: cli.target_cadence,
        },
        charts: (!cli.no_charts).then(|| RenderOptions {
            out_dir: cli.out_dir,
            format: cli.format.into(),
            ..Default::default()
        }),
    };
    let session = FeedbackSession::new().with_config(config);

    // Load, extract, aggregate
    let analysis = session.analyze(&cli.path)?;

    if cli.json {
        println!("{}", session.summary_json(&analysis)?);
    } else {
        let summary = session.summarize(&analysis);
        print!("{}", session.encoder().encode_to_text(&summary));
    }

    // Charts
    for path in session.render_charts(&analysis)? {
        println!("Chart written: {}", path.display());
    }

    // Feedback
    println!("=== Feedback ===");
    let interactive = atty::is(atty::Stream::Stdin);
    let stdin = io::stdin();
    let mut prompt = ConsolePrompt::new(stdin.lock(), io::stdout()).with_echo(!interactive);
    let mut sink = WriteSink::new(io::stdout());
    session.report(&analysis, &mut prompt, &mut sink)?;

    Ok(())
}

// Error types

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    stage: String,
    message: String,
    hint: Option<String>,
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        let hint = match &e.source {
            FeedbackError::FileNotFound(_) => "Check the recording path",
            FeedbackError::Decode { .. } => "Ensure the file is a valid .fit recording",
            FeedbackError::InputParse { .. } => "Enter a plain decimal number, e.g. 142.5",
            FeedbackError::EmptyData { .. } => "The recording has no values for this metric",
            FeedbackError::Render(_) => "Try --format svg or --no-charts",
            FeedbackError::Io(_) => "Check file permissions and the output directory",
            FeedbackError::Json(_) => "Retry without --json",
        };

        CliError {
            code: e.source.code().to_string(),
            stage: e.stage.to_string(),
            message: e.source.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}
