pub mod commands;

use std::process::ExitCode;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use quotedesk_core::config::{AppConfig, LoadOptions, LogFormat};
use quotedesk_core::domain::quote::QuoteStatus;
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(
    name = "quotedesk",
    about = "Quotedesk operator CLI",
    long_about = "Manage the quote database, inspect quotes and dashboards, and try pricing rules.",
    after_help = "Examples:\n  quotedesk migrate\n  quotedesk seed\n  quotedesk quotes --status open\n  quotedesk installments --total 10000 --entry-percent 20 --select 1 --select 3"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo clients and quotes; existing demo quotes are kept")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "List quotes, newest first, optionally filtered by status")]
    Quotes {
        #[arg(long, help = "open, accepted, declined or expired")]
        status: Option<QuoteStatus>,
    },
    #[command(about = "Show status counts, values and the six-month breakdown")]
    Dashboard,
    #[command(about = "Expire open quotes whose validity has passed")]
    Expire,
    #[command(about = "Compute an installment plan using the configured defaults")]
    Installments {
        #[arg(long)]
        total: Decimal,
        #[arg(long, default_value = "20")]
        entry_percent: Decimal,
        #[arg(long = "select", help = "Installment count to offer; repeat for several")]
        select: Vec<u32>,
    },
    #[command(about = "Compute a cash discount")]
    Discount {
        #[arg(long)]
        total: Decimal,
        #[arg(long)]
        percent: Decimal,
    },
}

/// Installs the global subscriber. Output goes to stderr so stdout only carries command payloads.
pub fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!("failed to install log subscriber: {error}"))
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // A broken config is reported by the command itself.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        if let Err(error) = init_logging(&config) {
            eprintln!("{error}");
        }
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Quotes { status } => commands::quotes::run(status),
        Command::Dashboard => commands::dashboard::run(),
        Command::Expire => commands::expire::run(),
        Command::Installments { total, entry_percent, select } => {
            commands::installments::run(total, entry_percent, &select)
        }
        Command::Discount { total, percent } => commands::discount::run(total, percent),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
