//! CLI entry point for the bestseller report pipeline.
//!
//! Reads `bestsellers.csv`, cleans it, and writes the CSV reports, the data
//! quality summary and the rating chart into the working directory.

use anyhow::Result;
use bestseller_report::analyzers::analyzer::{RunPaths, run};
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bestseller_report")]
#[command(about = "Clean a bestselling-books CSV and write summary reports", long_about = None)]
struct Cli {
    /// Source CSV file
    #[arg(short, long, default_value = "bestsellers.csv", hide = true)]
    input: PathBuf,

    /// Directory the reports are written to
    #[arg(short, long, default_value = ".", hide = true)]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    // JSON log file only when a path is configured
    let mut _file_guard = None;
    let json_layer = match std::env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let log_dir = Path::new(&log_file_path)
                .parent()
                .unwrap_or(Path::new("logs"));
            let log_file_name = Path::new(&log_file_path)
                .file_name()
                .unwrap_or(OsStr::new("bestseller_report.log"));

            let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            _file_guard = Some(guard);

            Some(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(non_blocking_file)
                    .with_filter(
                        EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?),
                    ),
            )
        }
        Err(_) => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    run(&RunPaths {
        input: cli.input,
        out_dir: cli.output_dir,
    })?;

    Ok(())
}
