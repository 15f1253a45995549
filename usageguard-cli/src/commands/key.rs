//! `usageguard key`: manage the cached credential file a provider's
//! `oauth` strategy reads from.

use clap::Subcommand;

use crate::context::Context;
use crate::exit_code;

#[derive(Debug, Subcommand)]
pub enum KeyAction {
    /// Clear the provider's failure gate and cached snapshot, forcing a
    /// fresh fetch on next run.
    Clear {
        /// Provider id, e.g. `acme-ai`.
        provider: String,
    },
}

pub async fn run(ctx: &Context, action: KeyAction) -> i32 {
    match action {
        KeyAction::Clear { provider } => {
            ctx.gates.clear(&provider);
            ctx.store.clear_all(&provider).await;
            if ctx.json {
                let envelope = serde_json::json!({ "ok": true, "provider": provider, "cleared": true });
                println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
            } else {
                println!("cleared gate and cache for {provider}");
            }
            exit_code::SUCCESS
        }
    }
}
