//! Main application entry point
//!
//! Reads envelopes as JSON lines from stdin and prints every envelope bound
//! for a view's main thread as a JSON line on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use damast_app::Pipeline;
use damast_core::{DisplayMode, Envelope, MessageType, TimelineMode};
use damast_data::JsonFileSource;

#[derive(Parser, Debug)]
#[command(name = "damast")]
#[command(about = "Cross-view filtering and brushing over a religious-evidence dataset")]
#[command(version)]
struct Args {
    /// Dataset JSON as delivered by the data endpoint
    #[arg(long)]
    data: PathBuf,

    /// Visualization state whose filters are replayed after loading
    #[arg(long)]
    state: Option<PathBuf>,

    /// Start the timeline in qualitative mode
    #[arg(long)]
    qualitative: bool,

    /// Bucket aggregates by `religion` or `confidence`
    #[arg(long, default_value = "religion", value_parser = parse_display_mode)]
    display_mode: DisplayMode,
}

fn parse_display_mode(value: &str) -> Result<DisplayMode, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("expected `religion` or `confidence`, got `{value}`"))
}

async fn emit(stdout: &mut Stdout, envelope: &Envelope) -> Result<()> {
    let mut line = envelope.to_json()?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(data = %args.data.display(), "Starting damast");

    let mut source = JsonFileSource::new(&args.data);
    if let Some(state) = &args.state {
        source = source.with_state(state);
    }

    let mut pipeline = Pipeline::start();
    pipeline.load(&source).await.context("failed to load the dataset")?;
    pipeline.send(Envelope::new(MessageType::SetDisplayMode, &args.display_mode)?)?;
    if args.qualitative {
        pipeline.send(Envelope::new(MessageType::SetTimelineMode, &TimelineMode::Qualitative)?)?;
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading stdin")? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    pipeline.submit(&line);
                }
                None => break,
            },
            Some(envelope) = pipeline.recv() => emit(&mut stdout, &envelope).await?,
        }
    }

    let mut output = pipeline.shutdown().await?;
    while let Some(envelope) = output.recv().await {
        emit(&mut stdout, &envelope).await?;
    }
    info!("damast stopped");
    Ok(())
}
