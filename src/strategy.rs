//! The per-provider strategy seam (C6): each provider offers an ordered
//! list of strategies the fetch pipeline tries in turn.

use async_trait::async_trait;

use crate::error::UsageError;
use crate::model::UsageSnapshot;

/// Result of a single strategy's `fetch()` call.
#[derive(Debug, Clone)]
pub enum FetchResult {
    Success(UsageSnapshot),
    /// A failure the pipeline should try the next strategy for.
    Fail { error: UsageError },
    /// A failure severe enough that trying further strategies is
    /// pointless (e.g. invalid credentials) - the pipeline stops here.
    Fatal { error: UsageError },
}

impl FetchResult {
    pub fn error(&self) -> Option<&UsageError> {
        match self {
            FetchResult::Success(_) => None,
            FetchResult::Fail { error } | FetchResult::Fatal { error } => Some(error),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchResult::Fatal { .. })
    }
}

/// One way of obtaining a provider's usage data (e.g. an OAuth-backed
/// API call, or shelling out to a vendored CLI). Strategies are tried in
/// the order their provider lists them.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable name recorded in [`crate::model::UsageSnapshot::source`]
    /// and [`crate::model::FetchAttempt::strategy`].
    fn name(&self) -> &str;

    /// Cheap, synchronous-ish precondition check (credentials present,
    /// executable on PATH, etc.) run before `fetch()` is attempted.
    async fn is_available(&self) -> bool;

    /// Perform the actual fetch. Implementations should not apply their
    /// own timeout - the pipeline wraps this call in a fixed deadline.
    async fn fetch(&self) -> FetchResult;
}
