//! Linkcal main entry point
//!
//! Runs either the HTTP extraction service or the Telegram bot, or checks a
//! configuration file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use linkcal::bot::BotRunner;
use linkcal::config::{load_config_with_hash, load_from_env, Config};
use linkcal::server::{self, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Linkcal: turn event links into calendar entries
///
/// The `serve` process fetches pages and extracts events; the `bot` process
/// watches a Telegram chat for links and publishes drafts once an admin
/// approves them.
#[derive(Parser, Debug)]
#[command(name = "linkcal")]
#[command(version = "1.0.0")]
#[command(about = "Turn event links into calendar entries", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults plus environment if omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP extraction service
    Serve,

    /// Run the Telegram bot
    Bot,

    /// Validate configuration and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_ref())?;

    match cli.command {
        Command::Serve => handle_serve(config).await,
        Command::Bot => handle_bot(config).await,
        Command::CheckConfig => {
            handle_check_config(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkcal=info,warn"),
            1 => EnvFilter::new("linkcal=debug,info"),
            2 => EnvFilter::new("linkcal=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults and environment");
        return load_from_env().context("Failed to load configuration");
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server.bind))?;

    let state = AppState::from_config(&config).context("Failed to start extraction service")?;
    if state.publisher.is_none() {
        tracing::warn!("Calendar publishing disabled; /create-event will fail until a token is provided");
    }
    tracing::info!(model = %config.model.name, timezone = %config.calendar.timezone, "Starting extraction service");

    server::serve(addr, state).await.context("HTTP server failed")?;
    Ok(())
}

async fn handle_bot(config: Config) -> anyhow::Result<()> {
    let runner = BotRunner::from_config(&config).context("Failed to start bot")?;
    runner.run().await;
    Ok(())
}

/// Prints the effective configuration without secrets
fn handle_check_config(config: &Config) {
    println!("=== Linkcal Configuration ===\n");

    println!("Server:");
    println!("  Bind: {}", config.server.bind);

    println!("\nFetch:");
    println!("  Timeout: {}s (connect {}s)", config.fetch.timeout_secs, config.fetch.connect_timeout_secs);
    println!("  Extra host rules ({}):", config.fetch.host_rules.len());
    for rule in &config.fetch.host_rules {
        println!("  - {} ({} headers)", rule.host, rule.headers.len());
    }

    println!("\nModel:");
    println!("  Name: {}", config.model.name);
    println!("  API base: {}", config.model.api_base);
    println!("  API key: {}", presence(config.model.api_key.is_some()));
    println!("  Max output tokens: {}", config.model.max_output_tokens);
    println!("  Temperature: {}", config.model.temperature);

    println!("\nCalendar:");
    println!("  Calendar ID: {}", config.calendar.calendar_id);
    println!("  Timezone: {}", config.calendar.timezone);
    println!("  Token file: {}", config.calendar.token_path);

    println!("\nBot:");
    println!("  API URL: {}", config.bot.api_url);
    println!("  Bot token: {}", presence(config.bot.bot_token.is_some()));
    println!("  Admins ({}):", config.bot.admin_usernames.len());
    for admin in &config.bot.admin_usernames {
        println!("  - {}", admin);
    }
    println!("  Approval emoji: {}", config.bot.approval_emoji);
    println!("  Notify link failures: {}", config.bot.notify_link_failures);
    match config.bot.pending_ttl_secs {
        Some(ttl) => println!("  Pending TTL: {}s", ttl),
        None => println!("  Pending TTL: never expire"),
    }

    println!("\n✓ Configuration is valid");
}

fn presence(set: bool) -> &'static str {
    if set {
        "set"
    } else {
        "missing"
    }
}
