//! Process-wide pooled HTTP client (C2): one `reqwest::Client` shared by
//! every strategy, built lazily and reused until an explicit `shutdown`.

use std::sync::Mutex;
use std::time::Duration;

/// Default total-request timeout when a caller doesn't override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_IDLE_PER_HOST: usize = 5;
/// `reqwest` has no knob for a hard cap on total open connections (only
/// per-host idle pooling); `MAX_IDLE_PER_HOST` is the closest available
/// control and is what actually bounds steady-state socket reuse here.
const MAX_IDLE_PER_HOST_LIMIT: usize = MAX_IDLE_PER_HOST;

static CLIENT: Mutex<Option<reqwest::Client>> = Mutex::new(None);

/// Build a client with the pool/timeout/redirect policy shared by every
/// call site. Panics only on a malformed TLS configuration, which
/// indicates a broken build environment rather than a runtime condition
/// callers should handle.
fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST_LIMIT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("usageguard: failed to construct HTTP client")
}

/// Get the process-wide client, lazily constructing it with
/// [`DEFAULT_TIMEOUT`] on first use (or on first use after [`shutdown`]).
/// All strategies should go through this rather than building their own
/// `reqwest::Client`, so connection pooling is actually shared (§4.2).
pub fn shared_client() -> reqwest::Client {
    let mut guard = CLIENT.lock().unwrap();
    guard.get_or_insert_with(|| build_client(DEFAULT_TIMEOUT)).clone()
}

/// Drop the held client. `reqwest` has no explicit close; this releases
/// our handle so its connection pool's `Drop` impl runs once every clone
/// in flight finishes, and the next [`shared_client`] call rebuilds one.
pub fn shutdown() {
    CLIENT.lock().unwrap().take();
}

/// Construct a standalone client with a caller-chosen timeout, for
/// callers that need a timeout different from the shared default (e.g.
/// the fetch pipeline's per-strategy timeout, which wraps any client's
/// call in `tokio::time::timeout` rather than relying on this).
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    build_client(timeout)
}
