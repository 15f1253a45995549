//! `usageguard config`: inspect the resolved configuration, or seed a
//! fresh config file with documented defaults.

use clap::Subcommand;
use usageguard::config::Config;

use crate::context::Context;
use crate::exit_code;

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the fully-resolved configuration.
    Show,
    /// Write a config file with documented defaults. Fails rather than
    /// overwriting an existing file.
    Init {
        /// Where to write the file; defaults to the OS config directory.
        #[arg(long)]
        path: Option<std::path::PathBuf>,
    },
}

pub async fn run(ctx: &Context, action: ConfigAction) -> i32 {
    match action {
        ConfigAction::Show => {
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&ctx.config).unwrap_or_default());
            } else {
                println!("fetch.timeout = {}", ctx.config.fetch.timeout_seconds);
                println!("fetch.max_concurrent = {}", ctx.config.fetch.max_concurrent);
                println!("fetch.stale_threshold_minutes = {}", ctx.config.fetch.stale_threshold_minutes);
                for (id, provider) in &ctx.config.providers {
                    println!("providers.{id}.enabled = {}", provider.enabled);
                }
            }
            exit_code::SUCCESS
        }
        ConfigAction::Init { path } => {
            let target = match path.or_else(default_config_path) {
                Some(target) => target,
                None => {
                    eprintln!("could not determine a config directory; pass --path explicitly");
                    return exit_code::CONFIG_ERROR;
                }
            };
            if target.exists() {
                eprintln!("{} already exists; not overwriting", target.display());
                return exit_code::CONFIG_ERROR;
            }
            match Config::default().save(&target) {
                Ok(()) => {
                    println!("wrote default config to {}", target.display());
                    exit_code::SUCCESS
                }
                Err(err) => {
                    eprintln!("failed to write {}: {err}", target.display());
                    exit_code::CONFIG_ERROR
                }
            }
        }
    }
}

#[cfg(feature = "file-store")]
fn default_config_path() -> Option<std::path::PathBuf> {
    usageguard::store::file::config_root().map(|dir| dir.join("usageguard.toml"))
}

#[cfg(not(feature = "file-store"))]
fn default_config_path() -> Option<std::path::PathBuf> {
    None
}
