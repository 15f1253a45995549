//! Per-provider failure gate: short-circuits the fetch pipeline after a
//! run of consecutive failures, without the half-open recovery probing of
//! a classic circuit breaker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::error::UsageError;
use crate::model::{FailureRecord, GateState};

/// Consecutive failures within [`WINDOW_MILLIS`] before the gate closes.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;
/// Width of the rolling window failures are counted within.
pub const WINDOW_MILLIS: u64 = 10 * 60 * 1000;
/// How long the gate stays closed once tripped.
pub const GATE_MILLIS: u64 = 5 * 60 * 1000;

/// Tracks one provider's failure history and gate state. Cheap to clone
/// (shares interior state), safe to hand to multiple tasks.
#[derive(Debug, Clone)]
pub struct FailureGate {
    clock: Arc<dyn Clock>,
    inner: Arc<Mutex<GateState>>,
}

impl FailureGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, inner: Arc::new(Mutex::new(GateState::default())) }
    }

    pub fn from_state(clock: Arc<dyn Clock>, state: GateState) -> Self {
        Self { clock, inner: Arc::new(Mutex::new(state)) }
    }

    pub fn state(&self) -> GateState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a failed attempt: prune failures older than the window,
    /// append the new one (carrying `error`'s category and message so a
    /// tripped gate can be inspected for why later), and trip the gate
    /// once the consecutive count reaches [`MAX_CONSECUTIVE_FAILURES`].
    pub fn record_failure(&self, error: &UsageError) {
        let now = self.clock.unix_millis();
        let mut state = self.lock();
        state.failures.retain(|f| now.saturating_sub(f.at_unix_millis) <= WINDOW_MILLIS);
        state.failures.push(FailureRecord {
            at_unix_millis: now,
            category: error.category,
            message: error.message.clone(),
        });
        state.consecutive_count += 1;
        if state.consecutive_count >= MAX_CONSECUTIVE_FAILURES {
            state.gated_until_unix_millis = Some(now + GATE_MILLIS);
        }
    }

    /// Record a success. Resets the consecutive-failure counter only -
    /// it does NOT clear an already-tripped gate. A gate that's currently
    /// closed stays closed until it expires on its own.
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.consecutive_count = 0;
    }

    /// Whether the gate is currently closed. Auto-clears an expired gate
    /// as a side effect, matching the source's lazy-expiry behaviour.
    pub fn is_gated(&self) -> bool {
        let now = self.clock.unix_millis();
        let mut state = self.lock();
        match state.gated_until_unix_millis {
            Some(until) if now < until => true,
            Some(_) => {
                state.gated_until_unix_millis = None;
                false
            }
            None => false,
        }
    }

    /// Milliseconds remaining until the gate reopens, or `None` if it's
    /// not currently closed.
    pub fn gate_remaining_millis(&self) -> Option<u64> {
        let now = self.clock.unix_millis();
        let state = self.lock();
        state.gated_until_unix_millis.and_then(|until| until.checked_sub(now)).filter(|r| *r > 0)
    }

    /// Most recent failures, newest last, capped at `limit`.
    pub fn recent_failures(&self, limit: usize) -> Vec<FailureRecord> {
        let state = self.lock();
        let len = state.failures.len();
        let start = len.saturating_sub(limit);
        state.failures[start..].to_vec()
    }

    /// Reset all gate state (failures, consecutive count, gate).
    pub fn clear(&self) {
        let mut state = self.lock();
        *state = GateState::default();
    }
}

/// In-memory registry of per-provider gates, keyed by provider id. May be
/// accessed from multiple orchestrator tasks concurrently.
#[derive(Debug, Clone)]
pub struct GateRegistry {
    clock: Arc<dyn Clock>,
    gates: Arc<Mutex<HashMap<String, FailureGate>>>,
}

impl GateRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, gates: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Fetch the gate for `provider_id`, creating a fresh one on first
    /// access.
    pub fn get(&self, provider_id: &str) -> FailureGate {
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        gates
            .entry(provider_id.to_string())
            .or_insert_with(|| FailureGate::new(self.clock.clone()))
            .clone()
    }

    /// Install gate state loaded from the snapshot store (e.g. at
    /// startup), overwriting any in-memory gate for that provider.
    pub fn install(&self, provider_id: &str, state: GateState) {
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        gates.insert(provider_id.to_string(), FailureGate::from_state(self.clock.clone(), state));
    }

    pub fn clear(&self, provider_id: &str) {
        let gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(gate) = gates.get(provider_id) {
            gate.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, ErrorSeverity};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn sample_error() -> UsageError {
        UsageError::new("boom", ErrorCategory::Network, ErrorSeverity::Transient)
    }

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

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(0)))
        }
        fn advance(&self, ms: u64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    #[test]
    fn gate_trips_after_max_consecutive_failures() {
        let clock = FakeClock::new();
        let gate = FailureGate::new(clock.clone());

        gate.record_failure(&sample_error());
        assert!(!gate.is_gated());
        gate.record_failure(&sample_error());
        assert!(!gate.is_gated());
        gate.record_failure(&sample_error());
        assert!(gate.is_gated());
        assert_eq!(gate.gate_remaining_millis(), Some(GATE_MILLIS));
    }

    #[test]
    fn success_resets_consecutive_count_but_not_an_open_gate() {
        let clock = FakeClock::new();
        let gate = FailureGate::new(clock.clone());

        gate.record_failure(&sample_error());
        gate.record_failure(&sample_error());
        gate.record_failure(&sample_error());
        assert!(gate.is_gated());

        gate.record_success();
        assert!(gate.is_gated(), "an already-tripped gate must not be cleared by a success");
        assert_eq!(gate.state().consecutive_count, 0);
    }

    #[test]
    fn gate_auto_clears_after_expiry() {
        let clock = FakeClock::new();
        let gate = FailureGate::new(clock.clone());

        gate.record_failure(&sample_error());
        gate.record_failure(&sample_error());
        gate.record_failure(&sample_error());
        assert!(gate.is_gated());

        clock.advance(GATE_MILLIS + 1);
        assert!(!gate.is_gated());
        assert!(gate.state().gated_until_unix_millis.is_none());
    }

    #[test]
    fn failures_outside_window_do_not_count_toward_trip() {
        let clock = FakeClock::new();
        let gate = FailureGate::new(clock.clone());

        gate.record_failure(&sample_error());
        gate.record_failure(&sample_error());
        clock.advance(WINDOW_MILLIS + 1);
        gate.record_failure(&sample_error());

        // the first two failures should have been pruned by the window,
        // so the gate should NOT trip from a lone third failure's prune
        // pass - but consecutive_count is independent of the window and
        // still reaches 3, matching the source's behaviour.
        assert_eq!(gate.state().failures.len(), 1);
        assert!(gate.is_gated());
    }

    #[test]
    fn recent_failures_caps_at_limit() {
        let clock = FakeClock::new();
        let gate = FailureGate::new(clock.clone());
        for _ in 0..10 {
            gate.record_failure(&sample_error());
        }
        assert_eq!(gate.recent_failures(5).len(), 5);
    }

    #[test]
    fn clear_resets_everything() {
        let clock = FakeClock::new();
        let gate = FailureGate::new(clock.clone());
        gate.record_failure(&sample_error());
        gate.record_failure(&sample_error());
        gate.record_failure(&sample_error());
        gate.clear();
        assert!(!gate.is_gated());
        assert_eq!(gate.state().consecutive_count, 0);
        assert!(gate.state().failures.is_empty());
    }

    #[test]
    fn registry_creates_and_reuses_gates_per_provider() {
        let clock = FakeClock::new();
        let registry = GateRegistry::new(clock.clone());

        let a1 = registry.get("acme-ai");
        a1.record_failure(&sample_error());
        let a2 = registry.get("acme-ai");
        assert_eq!(a2.state().failures.len(), 1, "same provider must share gate state");

        let b = registry.get("nimbus-ai");
        assert_eq!(b.state().failures.len(), 0, "different providers must not share state");
    }
}
