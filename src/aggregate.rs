//! Result aggregation (C9): folds per-provider outcomes into one
//! structure the CLI and external consumers render from.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UsageError;
use crate::model::{FetchOutcome, UsageSnapshot};

/// Snapshot of every provider's state as of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub snapshots: HashMap<String, UsageSnapshot>,
    pub errors: HashMap<String, UsageError>,
    pub fetched_at: DateTime<Utc>,
}

impl AggregatedResult {
    pub fn successful_providers(&self) -> Vec<&str> {
        self.snapshots.keys().map(String::as_str).collect()
    }

    pub fn failed_providers(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    pub fn has_any_data(&self) -> bool {
        !self.snapshots.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.snapshots.is_empty() && !self.errors.is_empty()
    }
}

/// Fold a batch of per-provider outcomes into one [`AggregatedResult`].
/// A provider contributes to `snapshots` whenever its outcome carried a
/// snapshot (success or cache fallback), and to `errors` otherwise.
pub fn aggregate_results(outcomes: Vec<FetchOutcome>) -> AggregatedResult {
    let mut snapshots = HashMap::new();
    let mut errors = HashMap::new();

    for outcome in outcomes {
        if let Some(snapshot) = outcome.snapshot {
            snapshots.insert(outcome.provider, snapshot);
        } else if let Some(error) = outcome.error {
            errors.insert(outcome.provider, error);
        } else {
            errors.insert(
                outcome.provider.clone(),
                UsageError::new(
                    "no data and no error recorded",
                    crate::error::ErrorCategory::Unknown,
                    crate::error::ErrorSeverity::Recoverable,
                )
                .with_provider(outcome.provider),
            );
        }
    }

    AggregatedResult { snapshots, errors, fetched_at: Utc::now() }
}
