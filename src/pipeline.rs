//! Fetch pipeline (C7): the per-provider algorithm that checks the
//! failure gate, tries strategies in order under a timeout, and falls
//! back to the cached snapshot when every strategy fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::UsageError;
use crate::gate::FailureGate;
use crate::model::{FetchAttempt, FetchOutcome};
use crate::store::SnapshotStore;
use crate::strategy::{FetchResult, Strategy};

/// Default per-strategy deadline (§4.7 step 2).
pub const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the fetch pipeline for one provider.
///
/// Mirrors the five-step algorithm: check the gate first (serving a
/// cached snapshot without recording a success if one exists), then walk
/// the strategy list under a timeout, short-circuiting on a fatal error,
/// and finally falling back to cache if every strategy failed.
pub async fn execute(
    provider_id: &str,
    strategies: &[Arc<dyn Strategy>],
    gate: &FailureGate,
    store: &dyn SnapshotStore,
    use_cache: bool,
    strategy_timeout: Duration,
) -> FetchOutcome {
    if gate.is_gated() {
        let remaining = gate.gate_remaining_millis();
        if use_cache {
            if let Some(snapshot) = store.load_snapshot(provider_id).await {
                debug!(provider = provider_id, "gated; serving cached snapshot");
                return FetchOutcome {
                    provider: provider_id.to_string(),
                    success: true,
                    snapshot: Some(snapshot),
                    attempts: vec![],
                    error: None,
                    cached: true,
                    gated: true,
                    fatal: false,
                    gate_remaining_ms: remaining,
                };
            }
        }
        warn!(provider = provider_id, "gated with no cached snapshot available");
        return FetchOutcome {
            provider: provider_id.to_string(),
            success: false,
            snapshot: None,
            attempts: vec![],
            error: None,
            cached: false,
            gated: true,
            fatal: false,
            gate_remaining_ms: remaining,
        };
    }

    let mut attempts = Vec::with_capacity(strategies.len());
    let mut last_error: Option<UsageError> = if strategies.is_empty() {
        Some(
            UsageError::new(
                "no strategies available",
                crate::error::ErrorCategory::Configuration,
                crate::error::ErrorSeverity::Recoverable,
            )
            .with_provider(provider_id),
        )
    } else {
        None
    };

    for strategy in strategies {
        if !strategy.is_available().await {
            attempts.push(FetchAttempt {
                strategy: strategy.name().to_string(),
                succeeded: false,
                error: None,
                duration_ms: 0,
            });
            continue;
        }

        let started = Instant::now();
        let outcome = tokio::time::timeout(strategy_timeout, strategy.fetch()).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                let error = UsageError::new(
                    format!("strategy '{}' timed out after {strategy_timeout:?}", strategy.name()),
                    crate::error::ErrorCategory::Network,
                    crate::error::ErrorSeverity::Transient,
                )
                .with_provider(provider_id);
                FetchResult::Fail { error }
            }
        };

        match result {
            FetchResult::Success(snapshot) => {
                attempts.push(FetchAttempt {
                    strategy: strategy.name().to_string(),
                    succeeded: true,
                    error: None,
                    duration_ms,
                });
                gate.record_success();
                let _ = store.save_snapshot(provider_id, &snapshot).await;
                let _ = store.save_gate(provider_id, &gate.state()).await;
                return FetchOutcome {
                    provider: provider_id.to_string(),
                    success: true,
                    snapshot: Some(snapshot),
                    attempts,
                    error: None,
                    cached: false,
                    gated: false,
                    fatal: false,
                    gate_remaining_ms: None,
                };
            }
            FetchResult::Fatal { error } => {
                attempts.push(FetchAttempt {
                    strategy: strategy.name().to_string(),
                    succeeded: false,
                    error: Some(error.clone()),
                    duration_ms,
                });
                gate.record_failure(&error);
                let _ = store.save_gate(provider_id, &gate.state()).await;
                return FetchOutcome {
                    provider: provider_id.to_string(),
                    success: false,
                    snapshot: None,
                    attempts,
                    error: Some(error),
                    cached: false,
                    gated: false,
                    fatal: true,
                    gate_remaining_ms: None,
                };
            }
            FetchResult::Fail { error } => {
                attempts.push(FetchAttempt {
                    strategy: strategy.name().to_string(),
                    succeeded: false,
                    error: Some(error.clone()),
                    duration_ms,
                });
                last_error = Some(error);
            }
        }
    }

    gate.record_failure(last_error.as_ref().expect("every fall-through path sets last_error"));
    let _ = store.save_gate(provider_id, &gate.state()).await;

    if use_cache {
        if let Some(snapshot) = store.load_snapshot(provider_id).await {
            return FetchOutcome {
                provider: provider_id.to_string(),
                success: true,
                snapshot: Some(snapshot),
                attempts,
                error: last_error,
                cached: true,
                gated: false,
                fatal: false,
                gate_remaining_ms: None,
            };
        }
    }

    FetchOutcome {
        provider: provider_id.to_string(),
        success: false,
        snapshot: None,
        attempts,
        error: last_error,
        cached: false,
        gated: false,
        fatal: false,
        gate_remaining_ms: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::error::{ErrorCategory, ErrorSeverity};
    use crate::model::{PeriodType, UsagePeriod, UsageSnapshot};
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FakeClock(AtomicU64);
    impl Clock for FakeClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
        fn unix_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct ScriptedStrategy {
        label: &'static str,
        available: bool,
        results: Mutex<Vec<FetchResult>>,
    }

    #[async_trait]
    impl Strategy for ScriptedStrategy {
        fn name(&self) -> &str {
            self.label
        }
        async fn is_available(&self) -> bool {
            self.available
        }
        async fn fetch(&self) -> FetchResult {
            self.results.lock().unwrap().remove(0)
        }
    }

    fn snapshot() -> UsageSnapshot {
        UsageSnapshot {
            provider: "acme-ai".into(),
            fetched_at: chrono::Utc::now(),
            periods: vec![UsagePeriod {
                name: "session".into(),
                period_type: PeriodType::Session,
                utilization: 20,
                resets_at: None,
            }],
            overage: None,
            identity: None,
            status: None,
            source: "oauth".into(),
        }
    }

    fn recoverable_error() -> UsageError {
        UsageError::new("temporary", ErrorCategory::Network, ErrorSeverity::Transient)
    }

    fn fatal_error() -> UsageError {
        UsageError::new("bad creds", ErrorCategory::Authentication, ErrorSeverity::Fatal)
    }

    #[tokio::test]
    async fn falls_back_to_second_strategy_on_first_failure() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock(AtomicU64::new(0)));
        let gate = FailureGate::new(clock.clone());
        let store = MemoryStore::new();

        let first = Arc::new(ScriptedStrategy {
            label: "oauth",
            available: true,
            results: Mutex::new(vec![FetchResult::Fail { error: recoverable_error() }]),
        });
        let second = Arc::new(ScriptedStrategy {
            label: "cli",
            available: true,
            results: Mutex::new(vec![FetchResult::Success(snapshot())]),
        });
        let strategies: Vec<Arc<dyn Strategy>> = vec![first, second];

        let outcome = execute(
            "acme-ai",
            &strategies,
            &gate,
            &store,
            true,
            Duration::from_secs(1),
        )
        .await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.cached);
    }

    #[tokio::test]
    async fn fatal_error_short_circuits_remaining_strategies() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock(AtomicU64::new(0)));
        let gate = FailureGate::new(clock.clone());
        let store = MemoryStore::new();

        let first = Arc::new(ScriptedStrategy {
            label: "oauth",
            available: true,
            results: Mutex::new(vec![FetchResult::Fatal { error: fatal_error() }]),
        });
        let second = Arc::new(ScriptedStrategy {
            label: "cli",
            available: true,
            results: Mutex::new(vec![FetchResult::Success(snapshot())]),
        });
        let strategies: Vec<Arc<dyn Strategy>> = vec![first, second];

        let outcome =
            execute("acme-ai", &strategies, &gate, &store, true, Duration::from_secs(1)).await;

        assert!(!outcome.success);
        assert!(outcome.fatal);
        assert_eq!(outcome.attempts.len(), 1, "second strategy must never run");
    }

    #[tokio::test]
    async fn cache_hit_while_gated_does_not_record_success() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock(AtomicU64::new(0)));
        let gate = FailureGate::new(clock.clone());
        let store = MemoryStore::new();
        store.save_snapshot("acme-ai", &snapshot()).await.unwrap();

        gate.record_failure(&recoverable_error());
        gate.record_failure(&recoverable_error());
        gate.record_failure(&recoverable_error());
        assert!(gate.is_gated());

        let strategies: Vec<Arc<dyn Strategy>> = vec![];
        let outcome =
            execute("acme-ai", &strategies, &gate, &store, true, Duration::from_secs(1)).await;

        assert!(outcome.success);
        assert!(outcome.cached);
        assert!(outcome.gated);
        assert!(gate.is_gated(), "gate must remain closed after a cache hit while gated");
    }

    #[tokio::test]
    async fn exhausting_all_strategies_falls_back_to_cache() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock(AtomicU64::new(0)));
        let gate = FailureGate::new(clock.clone());
        let store = MemoryStore::new();
        store.save_snapshot("acme-ai", &snapshot()).await.unwrap();

        let first = Arc::new(ScriptedStrategy {
            label: "oauth",
            available: true,
            results: Mutex::new(vec![FetchResult::Fail { error: recoverable_error() }]),
        });
        let strategies: Vec<Arc<dyn Strategy>> = vec![first];

        let outcome =
            execute("acme-ai", &strategies, &gate, &store, true, Duration::from_secs(1)).await;

        assert!(outcome.success);
        assert!(outcome.cached);
        assert!(!outcome.gated);
    }

    #[tokio::test]
    async fn exhausting_all_strategies_with_no_cache_reports_failure() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock(AtomicU64::new(0)));
        let gate = FailureGate::new(clock.clone());
        let store = MemoryStore::new();

        let first = Arc::new(ScriptedStrategy {
            label: "oauth",
            available: true,
            results: Mutex::new(vec![FetchResult::Fail { error: recoverable_error() }]),
        });
        let strategies: Vec<Arc<dyn Strategy>> = vec![first];

        let outcome =
            execute("acme-ai", &strategies, &gate, &store, true, Duration::from_secs(1)).await;

        assert!(!outcome.success);
        assert!(!outcome.cached);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn unavailable_strategy_is_recorded_but_skipped() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock(AtomicU64::new(0)));
        let gate = FailureGate::new(clock.clone());
        let store = MemoryStore::new();

        let unavailable = Arc::new(ScriptedStrategy { label: "cli", available: false, results: Mutex::new(vec![]) });
        let available = Arc::new(ScriptedStrategy {
            label: "oauth",
            available: true,
            results: Mutex::new(vec![FetchResult::Success(snapshot())]),
        });
        let strategies: Vec<Arc<dyn Strategy>> = vec![unavailable, available];

        let outcome =
            execute("acme-ai", &strategies, &gate, &store, true, Duration::from_secs(1)).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.attempts[0].succeeded);
    }

    #[tokio::test]
    async fn empty_strategy_list_reports_no_strategies_available() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock(AtomicU64::new(0)));
        let gate = FailureGate::new(clock.clone());
        let store = MemoryStore::new();
        let strategies: Vec<Arc<dyn Strategy>> = vec![];

        let outcome =
            execute("acme-ai", &strategies, &gate, &store, true, Duration::from_secs(1)).await;

        assert!(!outcome.success);
        assert!(outcome.attempts.is_empty());
        let message = outcome.error.expect("expected an error").message;
        assert_eq!(message, "no strategies available");
    }
}
