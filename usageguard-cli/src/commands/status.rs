//! `usageguard status`: report each provider's gate state without
//! performing a fetch.

use crate::context::Context;
use crate::exit_code;

pub async fn run(ctx: &Context) -> i32 {
    let providers = ctx.provider_specs();
    let mut any_gated = false;

    let mut rows = Vec::new();
    for provider in &providers {
        let gate = ctx.gates.get(&provider.id);
        let gated = gate.is_gated();
        any_gated |= gated;
        rows.push(serde_json::json!({
            "provider": provider.id,
            "enabled": provider.enabled,
            "gated": gated,
            "gate_remaining_ms": gate.gate_remaining_millis(),
        }));
    }

    if ctx.json {
        let envelope = serde_json::json!({ "ok": true, "providers": rows });
        println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    } else {
        for (provider, row) in providers.iter().zip(&rows) {
            let gated = row["gated"].as_bool().unwrap_or(false);
            let state = if !provider.enabled {
                "disabled"
            } else if gated {
                "gated"
            } else {
                "healthy"
            };
            println!("{:<16} {}", provider.id, state);
        }
    }

    if any_gated {
        exit_code::PARTIAL_FAILURE
    } else {
        exit_code::SUCCESS
    }
}
