use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use image_util_core::{Context, Executor, ImageTransport};
use image_util_cv::ComponentKind;
use std::path::PathBuf;
use std::time::Duration;

mod launch;

#[derive(Parser)]
#[command(name = "image-util")]
#[command(about = "Host image components (polygon drawing, perspective warp, static image publishing)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the components of a launch file and run them.
    Run {
        /// Path to the JSON launch file.
        launch: PathBuf,

        /// Stop after this many seconds instead of running until shutdown.
        #[arg(long)]
        duration: Option<f64>,
    },
    /// List the component kinds a launch file can use.
    Components,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { launch, duration } => run(&launch, duration),
        Commands::Components => {
            for kind in ComponentKind::ALL {
                println!("{:<12} {}", kind, kind.description());
            }
            Ok(())
        }
    }
}

/// Negative durations count as zero; NaN, infinite or overflowing ones are rejected
fn spin_duration(secs: f64) -> Result<Duration> {
    let clamped = if secs < 0.0 { 0.0 } else { secs };
    Duration::try_from_secs_f64(clamped)
        .with_context(|| format!("Invalid --duration: {}", secs))
}

fn run(launch_path: &std::path::Path, duration: Option<f64>) -> Result<()> {
    let duration = duration.map(spin_duration).transpose()?;
    let config = launch::LaunchConfig::load(launch_path)?;

    let context = Context::new();
    let transport = ImageTransport::new();
    let components = launch::load_components(&config, &context, &transport)?;

    tracing::info!(
        components = components.len(),
        topics = ?transport.topics(),
        "Spinning"
    );

    let executor = Executor::new(context);
    match duration {
        Some(duration) => {
            executor.spin_for(duration);
        }
        None => executor.spin(),
    }

    Ok(())
}
