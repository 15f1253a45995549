//! Bounded concurrent orchestrator (C8): fans out one fetch per provider,
//! throttled by a counting semaphore that providers queue behind rather
//! than get rejected by.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, Instrument};
use uuid::Uuid;

use crate::gate::GateRegistry;
use crate::model::FetchOutcome;
use crate::pipeline;
use crate::store::SnapshotStore;
use crate::strategy::Strategy;

/// Everything the orchestrator needs to know about one provider to fetch
/// it: its id and its ordered strategy list.
pub struct ProviderSpec {
    pub id: String,
    pub strategies: Vec<Arc<dyn Strategy>>,
    pub enabled: bool,
}

/// A per-outcome callback invoked synchronously from the completing
/// task's context, e.g. to drive a UI progress tracker as providers
/// finish rather than only once the whole batch is done.
pub type OnComplete = Arc<dyn Fn(&FetchOutcome) + Send + Sync>;

/// Fetch every given provider, bounded to at most `max_concurrent`
/// running at once. Providers beyond the bound queue for a permit rather
/// than failing - this is a throttle, not a circuit breaker.
///
/// `on_complete`, when given, is invoked once per provider as soon as
/// its outcome is known - from inside that provider's own spawned task,
/// not after the whole batch completes.
pub async fn fetch_all(
    providers: &[ProviderSpec],
    gates: &GateRegistry,
    store: Arc<dyn SnapshotStore>,
    max_concurrent: usize,
    use_cache: bool,
    strategy_timeout: Duration,
    on_complete: Option<OnComplete>,
) -> Vec<FetchOutcome> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = Vec::with_capacity(providers.len());

    for provider in providers {
        let semaphore = semaphore.clone();
        let gate = gates.get(&provider.id);
        let store = store.clone();
        let strategies = provider.strategies.clone();
        let provider_id = provider.id.clone();
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!("fetch_provider", provider = provider_id.as_str(), %correlation_id);
        let on_complete = on_complete.clone();

        tasks.push(tokio::spawn(
            async move {
                let _permit =
                    semaphore.acquire().await.expect("orchestrator semaphore closed unexpectedly");
                let outcome = pipeline::execute(
                    &provider_id,
                    &strategies,
                    &gate,
                    store.as_ref(),
                    use_cache,
                    strategy_timeout,
                )
                .await;
                if let Some(cb) = &on_complete {
                    cb(&outcome);
                }
                outcome
            }
            .instrument(span),
        ));
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    for (provider, task) in providers.iter().zip(tasks) {
        match task.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(join_err) => {
                error!(provider = provider.id.as_str(), error = %join_err, "fetch task panicked");
                let outcome = FetchOutcome {
                    provider: provider.id.clone(),
                    success: false,
                    snapshot: None,
                    attempts: vec![],
                    error: Some(
                        crate::error::UsageError::new(
                            format!("internal error fetching {}: task panicked", provider.id),
                            crate::error::ErrorCategory::Unknown,
                            crate::error::ErrorSeverity::Recoverable,
                        )
                        .with_provider(provider.id.clone()),
                    ),
                    cached: false,
                    gated: false,
                    fatal: false,
                    gate_remaining_ms: None,
                };
                if let Some(cb) = &on_complete {
                    cb(&outcome);
                }
                outcomes.push(outcome);
            }
        }
    }
    outcomes
}

/// Fetch only the providers with `enabled == true`.
pub async fn fetch_enabled(
    providers: &[ProviderSpec],
    gates: &GateRegistry,
    store: Arc<dyn SnapshotStore>,
    max_concurrent: usize,
    use_cache: bool,
    strategy_timeout: Duration,
    on_complete: Option<OnComplete>,
) -> Vec<FetchOutcome> {
    let enabled: Vec<&ProviderSpec> = providers.iter().filter(|p| p.enabled).collect();
    let owned: Vec<ProviderSpec> = enabled
        .into_iter()
        .map(|p| ProviderSpec { id: p.id.clone(), strategies: p.strategies.clone(), enabled: p.enabled })
        .collect();
    fetch_all(&owned, gates, store, max_concurrent, use_cache, strategy_timeout, on_complete).await
}

/// Bucket of outcomes by category, in the priority order used to decide
/// which bucket a mixed outcome belongs to: `gated` wins over `cached`,
/// which wins over plain `success`, with everything else `failure`.
#[derive(Debug, Default)]
pub struct CategorizedOutcomes {
    pub gated: Vec<FetchOutcome>,
    pub cached: Vec<FetchOutcome>,
    pub success: Vec<FetchOutcome>,
    pub failure: Vec<FetchOutcome>,
}

pub fn categorize_results(outcomes: Vec<FetchOutcome>) -> CategorizedOutcomes {
    let mut buckets = CategorizedOutcomes::default();
    for outcome in outcomes {
        if outcome.gated {
            buckets.gated.push(outcome);
        } else if outcome.success && outcome.cached {
            buckets.cached.push(outcome);
        } else if outcome.success {
            buckets.success.push(outcome);
        } else {
            buckets.failure.push(outcome);
        }
    }
    buckets
}

/// Index outcomes by provider id for easy lookup by downstream callers
/// (the aggregator, the CLI renderer).
pub fn by_provider(outcomes: Vec<FetchOutcome>) -> HashMap<String, FetchOutcome> {
    outcomes.into_iter().map(|o| (o.provider.clone(), o)).collect()
}
