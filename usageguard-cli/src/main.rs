//! `usageguard` - fetch and display usage data across configured
//! providers.

mod commands;
mod context;
mod output;

use clap::{Parser, Subcommand};

/// Exit codes returned by the process, matching the documented contract:
/// 0 = success, 1 = general error, 2 = auth error, 3 = network error,
/// 4 = config error, 5 = partial failure (some providers succeeded,
/// some failed).
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const AUTH_ERROR: i32 = 2;
    pub const NETWORK_ERROR: i32 = 3;
    pub const CONFIG_ERROR: i32 = 4;
    pub const PARTIAL_FAILURE: i32 = 5;
}

#[derive(Debug, Parser)]
#[command(name = "usageguard", version, about = "Aggregate AI usage across providers")]
struct Cli {
    /// Emit machine-readable JSON instead of a formatted table.
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI color in table output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to a usageguard.toml config file. Defaults to the OS config
    /// directory.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch and display usage across all enabled providers.
    Usage,
    /// Show gate/health status for each provider without fetching.
    Status,
    /// Inspect or edit configuration.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Manage cached credentials for a provider.
    Key {
        #[command(subcommand)]
        action: commands::key::KeyAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = match context::Context::load(cli.config.as_deref(), cli.json, cli.no_color).await {
        Ok(ctx) => ctx,
        Err(err) => {
            output::print_fatal(&err, cli.json);
            std::process::exit(exit_code::CONFIG_ERROR);
        }
    };

    let code = match cli.command {
        Commands::Usage => commands::usage::run(&ctx).await,
        Commands::Status => commands::status::run(&ctx).await,
        Commands::Config { action } => commands::config::run(&ctx, action).await,
        Commands::Key { action } => commands::key::run(&ctx, action).await,
    };

    std::process::exit(code);
}
