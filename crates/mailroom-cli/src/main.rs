//! Mailroom CLI - single entrypoint for the contact intake service

mod commands;

use clap::{Parser, Subcommand};
use commands::ServeCommand;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MAILROOM_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "MAILROOM_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server and delivery worker
    Serve(ServeCommand),
}

/// An explicit RUST_LOG wins; otherwise every mailroom crate logs at the
/// requested level and the noisy dependencies stay at warn.
fn default_filter(level: &str) -> EnvFilter {
    let mut directives: Vec<String> = [
        "mailroom_cli",
        "mailroom_core",
        "mailroom_contact",
        "mailroom_email",
        "mailroom_queue",
        "mailroom_database",
        "mailroom_entities",
        "mailroom_migrations",
    ]
    .iter()
    .map(|name| format!("{}={}", name, level))
    .collect();
    directives.extend(
        ["sqlx=warn", "sea_orm=warn", "tower=warn", "hyper=warn", "lettre=warn"]
            .map(String::from),
    );
    EnvFilter::new(directives.join(","))
}

fn init_tracing(level: &str, format: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "full" {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute().await,
    }
}
