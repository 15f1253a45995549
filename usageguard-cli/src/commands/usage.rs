//! `usageguard usage`: fetch every enabled provider and display results.

use std::sync::Arc;

use usageguard::error::ErrorCategory;
use usageguard::model::FetchOutcome;

use crate::context::Context;
use crate::exit_code;
use crate::output;

pub async fn run(ctx: &Context) -> i32 {
    let providers = ctx.provider_specs();

    // In table mode, print each provider's status the moment it finishes
    // rather than waiting for the whole batch, since a slow provider
    // shouldn't hold up feedback on the ones that already answered.
    let on_complete: Option<usageguard::orchestrator::OnComplete> = if ctx.json {
        None
    } else {
        Some(Arc::new(|outcome: &FetchOutcome| {
            output::print_progress_line(outcome);
        }))
    };

    let outcomes = usageguard::orchestrator::fetch_enabled(
        &providers,
        &ctx.gates,
        ctx.store.clone(),
        ctx.max_concurrent(),
        true,
        ctx.strategy_timeout(),
        on_complete,
    )
    .await;

    if ctx.json {
        output::print_outcomes_json(&outcomes);
    } else {
        output::print_outcomes_table(&outcomes, ctx.no_color);
    }

    exit_code_for(&outcomes)
}

/// Pick the process exit code for a completed run: success if every
/// provider reported one, partial failure if some but not all did, and
/// otherwise the most specific failure category across the providers
/// that failed (auth over network over general).
fn exit_code_for(outcomes: &[FetchOutcome]) -> i32 {
    if outcomes.is_empty() || outcomes.iter().all(|o| o.success) {
        return exit_code::SUCCESS;
    }
    if outcomes.iter().any(|o| o.success) {
        return exit_code::PARTIAL_FAILURE;
    }

    let categories: Vec<ErrorCategory> =
        outcomes.iter().filter_map(|o| o.error.as_ref().map(|e| e.category)).collect();

    if categories
        .iter()
        .any(|c| matches!(c, ErrorCategory::Authentication | ErrorCategory::Authorization))
    {
        exit_code::AUTH_ERROR
    } else if categories
        .iter()
        .any(|c| matches!(c, ErrorCategory::Network | ErrorCategory::Provider | ErrorCategory::RateLimited))
    {
        exit_code::NETWORK_ERROR
    } else {
        exit_code::GENERAL_ERROR
    }
}
