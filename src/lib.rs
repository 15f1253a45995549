#![forbid(unsafe_code)]

//! # usageguard
//!
//! Concurrent fetch engine and failure-gate resilience core for
//! aggregating usage data across multiple providers.
//!
//! ## Pieces
//!
//! - A [`backoff::Backoff`]/[`jitter::Jitter`]/[`sleeper::Sleeper`]
//!   toolkit driving the [`retry::RetryPolicy`] retry engine.
//! - A per-provider [`gate::FailureGate`] that short-circuits a provider
//!   after a run of consecutive failures within a rolling window.
//! - [`pipeline::execute`], which walks a provider's ordered strategy
//!   list under the gate and falls back to cache on exhaustion.
//! - [`orchestrator::fetch_all`], which fans a batch of providers out
//!   behind a bounded semaphore.
//! - [`aggregate::aggregate_results`], which folds per-provider outcomes
//!   into one result set.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use usageguard::clock::MonotonicClock;
//! use usageguard::gate::GateRegistry;
//! use usageguard::orchestrator::{fetch_all, ProviderSpec};
//! use usageguard::store::memory::MemoryStore;
//!
//! # async fn run(providers: Vec<ProviderSpec>) {
//! let clock = Arc::new(MonotonicClock::default());
//! let gates = GateRegistry::new(clock);
//! let store = Arc::new(MemoryStore::new());
//!
//! let outcomes = fetch_all(&providers, &gates, store, 5, true, Duration::from_secs(30), None).await;
//! let result = usageguard::aggregate_results(outcomes);
//! # let _ = result;
//! # }
//! ```

pub mod aggregate;
pub mod backoff;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod jitter;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod retry;
pub mod sleeper;
pub mod store;
pub mod strategy;

pub use aggregate::{aggregate_results, AggregatedResult};
pub use backoff::Backoff;
pub use clock::{Clock, MonotonicClock};
pub use error::{ErrorCategory, ErrorSeverity, GuardError, UsageError};
pub use gate::{FailureGate, GateRegistry};
pub use jitter::Jitter;
pub use model::{FetchOutcome, UsageSnapshot};
pub use orchestrator::{fetch_all, fetch_enabled, OnComplete, ProviderSpec};
pub use retry::RetryPolicy;
pub use sleeper::{Sleeper, TokioSleeper};
pub use strategy::{FetchResult, Strategy};

pub mod prelude;
