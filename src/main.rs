//! Grid trader - main entry point
//!
//! This binary provides two subcommands:
//! - grid: Print the price grid a configuration produces
//! - run: Drive a paper-trading session over a candle CSV

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-trader")]
#[command(about = "Grid trading decision engine with drawdown/bounce filters", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and print the price grid
    Grid {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/grid_588200.json")]
        config: String,

        /// Base price (overrides config file)
        #[arg(short, long)]
        base: Option<f64>,
    },

    /// Run a paper-trading session over historical candles
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/grid_588200.json")]
        config: String,

        /// Candle CSV (datetime,open,high,low,close,volume)
        #[arg(short, long)]
        data: String,

        /// Delay between ticks in milliseconds (0 = as fast as possible)
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Write every tick decision as JSON lines to this file
        #[arg(long)]
        decisions: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Grid { .. } => "grid",
        Commands::Run { .. } => "run",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Grid { config, base } => commands::grid::run(config, base),

        Commands::Run {
            config,
            data,
            interval_ms,
            decisions,
        } => commands::run::run(config, data, interval_ms, decisions),
    }
}
