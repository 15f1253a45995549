//! OAuth-token-backed HTTP strategy: reads a bearer token from a
//! credentials file on disk and calls the provider's usage endpoint,
//! retrying transient failures per the documented retry policy before
//! giving the pipeline a chance to fall back to another strategy.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use usageguard::error::{classify_http_error, classify_transport_failure, HttpErrorMapping, TransportFailure};
use usageguard::retry::{with_retry, RetryOutcome, RetryPolicy, RetryableKind};
use usageguard::sleeper::TokioSleeper;
use usageguard::{FetchResult, Strategy, UsageError, UsageSnapshot};

#[derive(Debug, Deserialize)]
struct UsageResponseBody {
    periods: Vec<PeriodBody>,
}

#[derive(Debug, Deserialize)]
struct PeriodBody {
    name: String,
    utilization: i64,
}

pub struct OauthStrategy {
    provider_id: String,
    credentials_path: String,
    endpoint: String,
}

impl OauthStrategy {
    pub fn new(provider_id: String, credentials_path: String, endpoint: String) -> Self {
        Self { provider_id, credentials_path, endpoint }
    }

    async fn read_token(&self) -> Option<String> {
        let raw = tokio::fs::read_to_string(&self.credentials_path).await.ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[async_trait]
impl Strategy for OauthStrategy {
    fn name(&self) -> &str {
        "oauth"
    }

    async fn is_available(&self) -> bool {
        self.read_token().await.is_some()
    }

    async fn fetch(&self) -> FetchResult {
        let token = match self.read_token().await {
            Some(t) => t,
            None => {
                return FetchResult::Fail {
                    error: usageguard::error::classify_io_error(
                        Some(&self.credentials_path),
                        false,
                        Some(&self.provider_id),
                    ),
                };
            }
        };

        let policy = RetryPolicy::default();
        let sleeper = TokioSleeper;
        let outcome = with_retry(
            &policy,
            &sleeper,
            |_attempt| self.attempt_once(&token),
            |err: &AttemptError| err.retryable_kind(),
            |err: &AttemptError| err.retry_after(),
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded(snapshot) => FetchResult::Success(snapshot),
            RetryOutcome::Exhausted(err) => err.into_fetch_result(),
        }
    }
}

/// A single HTTP attempt's failure, carrying enough context for the
/// retry engine's classifier and for the final fallback/fatal decision
/// once retries are exhausted.
enum AttemptError {
    Transport(UsageError),
    Http { status: u16, mapping: HttpErrorMapping, error: UsageError, retry_after: Option<Duration> },
    Parse(UsageError),
}

impl AttemptError {
    fn retryable_kind(&self) -> RetryableKind {
        match self {
            AttemptError::Transport(_) => RetryableKind::NetworkOrTimeout,
            AttemptError::Http { status, .. } => RetryableKind::HttpStatus(*status),
            AttemptError::Parse(_) => RetryableKind::Other,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            AttemptError::Http { mapping, retry_after, .. } if mapping.retry_after_header => *retry_after,
            _ => None,
        }
    }

    fn into_fetch_result(self) -> FetchResult {
        match self {
            AttemptError::Transport(error) | AttemptError::Parse(error) => FetchResult::Fail { error },
            AttemptError::Http { mapping, error, .. } => {
                if mapping.should_fallback {
                    FetchResult::Fail { error }
                } else {
                    FetchResult::Fatal { error }
                }
            }
        }
    }
}

impl OauthStrategy {
    async fn attempt_once(&self, token: &str) -> Result<UsageSnapshot, AttemptError> {
        let client = usageguard::http::shared_client();
        let response = client
            .get(&self.endpoint)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| {
                let kind = if err.is_timeout() {
                    TransportFailure::ReadTimeout
                } else if err.is_connect() {
                    TransportFailure::ConnectRefused
                } else {
                    TransportFailure::Generic
                };
                AttemptError::Transport(classify_transport_failure(kind, Some(&self.provider_id)))
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let json_body: Option<serde_json::Value> = serde_json::from_str(&body).ok();
            let error = classify_http_error(status, json_body.as_ref(), &body, Some(&self.provider_id));
            let mapping = usageguard::error::classify_http_status(status);
            return Err(AttemptError::Http { status, mapping, error, retry_after });
        }

        let body: UsageResponseBody = response
            .json()
            .await
            .map_err(|err| AttemptError::Parse(usageguard::error::classify_parse_error(err.to_string(), Some(&self.provider_id))))?;

        let periods = body
            .periods
            .into_iter()
            .map(|p| usageguard::model::UsagePeriod {
                name: p.name,
                period_type: usageguard::model::PeriodType::Session,
                utilization: p.utilization,
                resets_at: None,
            })
            .collect();

        Ok(UsageSnapshot {
            provider: self.provider_id.clone(),
            fetched_at: chrono::Utc::now(),
            periods,
            overage: None,
            identity: None,
            status: None,
            source: "oauth".to_string(),
        })
    }
}

/// Parse a `Retry-After` header as a number of seconds (the only form the
/// documented contract requires; the HTTP-date form is not supported).
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let seconds: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(seconds))
}
