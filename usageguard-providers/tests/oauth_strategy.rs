//! Exercises [`OauthStrategy`] against a mock HTTP endpoint, covering the
//! retry-then-succeed path, the rate-limit-is-fatal path, and the
//! unauthorized-falls-back path.

use usageguard::strategy::{FetchResult, Strategy};
use usageguard_providers::oauth_strategy::OauthStrategy;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a throwaway credentials file under a per-test temp directory and
/// returns its path; callers are responsible for removing the directory.
async fn write_token(label: &str) -> (std::path::PathBuf, String) {
    let dir = std::env::temp_dir().join(format!("usageguard-oauth-test-{label}-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let token_path = dir.join("token");
    tokio::fs::write(&token_path, b"s3cr3t").await.unwrap();
    (dir, token_path.display().to_string())
}

#[tokio::test]
async fn succeeds_after_transient_server_errors_are_retried() {
    let (dir, credentials_path) = write_token("retry").await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "periods": [{"name": "session", "utilization": 50}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let strategy =
        OauthStrategy::new("acme-ai".into(), credentials_path, format!("{}/usage", server.uri()));

    match strategy.fetch().await {
        FetchResult::Success(snapshot) => {
            assert_eq!(snapshot.periods.len(), 1);
            assert_eq!(snapshot.periods[0].utilization, 50);
        }
        other => panic!("expected success after retrying transient failures, got {other:?}"),
    }

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn rate_limit_is_fatal_and_does_not_exhaust_all_retries_as_a_fallback() {
    let (dir, credentials_path) = write_token("rate-limit").await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .mount(&server)
        .await;

    let strategy =
        OauthStrategy::new("acme-ai".into(), credentials_path, format!("{}/usage", server.uri()));

    match strategy.fetch().await {
        FetchResult::Fatal { error } => assert_eq!(error.category, usageguard::ErrorCategory::RateLimited),
        other => panic!("expected a fatal rate-limit result, got {other:?}"),
    }

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn unauthorized_falls_back_without_retrying() {
    let (dir, credentials_path) = write_token("unauthorized").await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let strategy =
        OauthStrategy::new("acme-ai".into(), credentials_path, format!("{}/usage", server.uri()));

    match strategy.fetch().await {
        FetchResult::Fail { error } => assert_eq!(error.category, usageguard::ErrorCategory::Authentication),
        other => panic!("expected a recoverable auth failure, got {other:?}"),
    }

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
