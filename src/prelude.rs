//! Convenience re-exports for the common case of wiring a fetch engine
//! together: `use usageguard::prelude::*;`.

pub use crate::aggregate::{aggregate_results, AggregatedResult};
pub use crate::backoff::Backoff;
pub use crate::clock::{Clock, MonotonicClock};
pub use crate::config::Config;
pub use crate::error::{ErrorCategory, ErrorSeverity, GuardError, UsageError};
pub use crate::gate::{FailureGate, GateRegistry};
pub use crate::jitter::Jitter;
pub use crate::model::{FetchAttempt, FetchOutcome, UsagePeriod, UsageSnapshot};
pub use crate::orchestrator::{categorize_results, fetch_all, fetch_enabled, ProviderSpec};
pub use crate::pipeline::execute as execute_fetch_pipeline;
pub use crate::retry::RetryPolicy;
pub use crate::sleeper::{Sleeper, TokioSleeper};
pub use crate::store::SnapshotStore;
pub use crate::strategy::{FetchResult, Strategy};
