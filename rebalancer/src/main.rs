//! CLI entry point for the capweight rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use capweight_rebalancer::commands;
use capweight_rebalancer::config::Config;
use capweight_rebalancer::error::Error;
use capweight_rebalancer::execution::StopSignal;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Market-cap weighted index rebalancer for Alpaca accounts")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults apply if omitted and ./config.toml is absent)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rebalance once per trading day until killed (default)
    Run,

    /// Rebalance now, ignoring the trading calendar
    Once {
        /// Log orders instead of submitting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show target weights and the order diff without trading
    Plan,

    /// Show current positions
    Positions,

    /// Check broker connection and market clock
    Status,
}

fn main() {
    // Credentials may live in a local .env file.
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let stop = StopSignal::new();
    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => commands::run_scheduler(&config, &stop),
        Command::Once { dry_run } => commands::run_once(&config, dry_run, &stop),
        Command::Plan => commands::show_plan(&config),
        Command::Positions => commands::show_positions(&config),
        Command::Status => commands::check_status(&config),
    };

    if let Err(e) = result {
        match e.root() {
            Error::Cancelled => {
                eprintln!("{e}");
                process::exit(0);
            }
            Error::OrdersDidNotClear { .. } => {
                eprintln!("\nAborted: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
