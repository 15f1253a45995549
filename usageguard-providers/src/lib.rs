//! Illustrative provider adapters: two vendors (`acme-ai`, `nimbus-ai`),
//! each offering an `oauth` strategy (HTTP call against a token read from
//! a credentials file) and a `cli` strategy (shell out to a vendored
//! executable and parse its line-oriented `key=value` stdout).
//!
//! These are demonstration adapters, not wire-correct integrations with
//! any real vendor's API - see the crate-level docs in `usageguard` for
//! the boundary between core and this crate.

pub mod cli_strategy;
#[cfg(feature = "oauth")]
pub mod oauth_strategy;

use std::sync::Arc;

use usageguard::Strategy;

#[cfg(feature = "oauth")]
use oauth_strategy::OauthStrategy;

use cli_strategy::CliStrategy;

/// Build the strategy list for a provider: `oauth` first when the
/// feature is enabled (it's cheaper and doesn't require a local
/// executable), falling back to `cli`.
pub fn strategies_for(provider_id: &str, credentials_path: &str, cli_executable: &str) -> Vec<Arc<dyn Strategy>> {
    let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();

    #[cfg(feature = "oauth")]
    strategies.push(Arc::new(OauthStrategy::new(
        provider_id.to_string(),
        credentials_path.to_string(),
        endpoint_for(provider_id),
    )));

    strategies.push(Arc::new(CliStrategy::new(provider_id.to_string(), cli_executable.to_string())));
    strategies
}

#[cfg(feature = "oauth")]
fn endpoint_for(provider_id: &str) -> String {
    match provider_id {
        "acme-ai" => "https://api.acme.example/v1/usage".to_string(),
        "nimbus-ai" => "https://api.nimbus.example/v1/usage".to_string(),
        other => format!("https://api.{other}.example/v1/usage"),
    }
}

/// Known provider ids this crate ships adapters for.
pub const ACME_AI: &str = "acme-ai";
pub const NIMBUS_AI: &str = "nimbus-ai";
