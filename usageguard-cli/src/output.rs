//! Output rendering: a JSON envelope for `--json` mode, and a plain
//! table for interactive use.

use usageguard::error::UsageError;
use usageguard::model::FetchOutcome;

/// Emit a startup failure that never reached the pipeline (config load,
/// credential discovery). Uses the same envelope shape as every other
/// error path (`message`/`category`/`severity`/`provider?`/
/// `remediation?`/`details?`/`timestamp`) so `--json` output is uniform
/// regardless of where in the process the failure happened.
pub fn print_fatal(error: &UsageError, json: bool) {
    if json {
        let envelope = serde_json::json!({
            "ok": false,
            "error": error,
        });
        eprintln!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    } else {
        eprintln!("usageguard: {error}");
    }
}

/// A single terse status line, printed as each provider's fetch
/// finishes rather than waiting for the whole batch - the `on_complete`
/// consumer a progress tracker hooks into.
pub fn print_progress_line(outcome: &FetchOutcome) {
    let status = if outcome.success { "done" } else if outcome.gated { "gated" } else { "failed" };
    eprintln!("  {} ... {status}", outcome.provider);
}

pub fn print_outcomes_json(outcomes: &[FetchOutcome]) {
    let envelope = serde_json::json!({
        "ok": outcomes.iter().any(|o| o.success),
        "providers": outcomes,
    });
    println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
}

pub fn print_outcomes_table(outcomes: &[FetchOutcome], no_color: bool) {
    for outcome in outcomes {
        let label = if outcome.success && outcome.gated {
            "gated (cached)"
        } else if outcome.success && outcome.cached {
            "stale cache"
        } else if outcome.success {
            "ok"
        } else if outcome.gated {
            "gated"
        } else {
            "failed"
        };

        let marker = if no_color {
            label.to_string()
        } else {
            match label {
                "ok" => format!("\x1b[32m{label}\x1b[0m"),
                "failed" => format!("\x1b[31m{label}\x1b[0m"),
                _ => format!("\x1b[33m{label}\x1b[0m"),
            }
        };

        println!("{:<16} {}", outcome.provider, marker);

        if let Some(snapshot) = &outcome.snapshot {
            for period in &snapshot.periods {
                println!("  {:<20} {:>4}%", period.name, period.utilization);
            }
        }
        if let Some(error) = &outcome.error {
            println!("  error: {error}");
        }
    }
}
