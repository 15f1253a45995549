//! Structured error taxonomy: categories, severities, and the HTTP-status
//! and exception classifiers that decide retry/fallback behaviour.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of error categories used for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    RateLimited,
    Network,
    Provider,
    Parse,
    Configuration,
    NotFound,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::Network => "network",
            ErrorCategory::Provider => "provider",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Severity level attached to every structured error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Fatal,
    Recoverable,
    Transient,
    Warning,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorSeverity::Fatal => "fatal",
            ErrorSeverity::Recoverable => "recoverable",
            ErrorSeverity::Transient => "transient",
            ErrorSeverity::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// A fully classified, externally-visible error. Serializes directly into
/// the JSON error envelope the CLI emits in `--json` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageError {
    pub message: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl UsageError {
    pub fn new(message: impl Into<String>, category: ErrorCategory, severity: ErrorSeverity) -> Self {
        Self {
            message: message.into(),
            category,
            severity,
            provider: None,
            remediation: None,
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UsageError {}

/// How the pipeline should react to a particular HTTP status.
#[derive(Debug, Clone, Copy)]
pub struct HttpErrorMapping {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub should_retry: bool,
    pub should_fallback: bool,
    pub retry_after_header: bool,
}

const fn mapping(
    category: ErrorCategory,
    severity: ErrorSeverity,
    should_retry: bool,
    should_fallback: bool,
    retry_after_header: bool,
) -> HttpErrorMapping {
    HttpErrorMapping { category, severity, should_retry, should_fallback, retry_after_header }
}

/// Classify an HTTP status code per the verbatim mapping table.
///
/// Every status resolves to exactly one mapping: the table below for the
/// codes it names, otherwise one of the two default arms for the rest of
/// the 4xx/5xx ranges, otherwise an `unknown`/`recoverable` catch-all.
pub fn classify_http_status(status: u16) -> HttpErrorMapping {
    match status {
        401 => mapping(ErrorCategory::Authentication, ErrorSeverity::Recoverable, false, true, false),
        403 => mapping(ErrorCategory::Authorization, ErrorSeverity::Recoverable, false, true, false),
        404 => mapping(ErrorCategory::NotFound, ErrorSeverity::Recoverable, false, true, false),
        429 => mapping(ErrorCategory::RateLimited, ErrorSeverity::Transient, true, false, true),
        500 | 502 | 503 | 504 => {
            mapping(ErrorCategory::Provider, ErrorSeverity::Transient, true, true, false)
        }
        s if (400..500).contains(&s) => {
            mapping(ErrorCategory::Unknown, ErrorSeverity::Recoverable, false, true, false)
        }
        s if (500..600).contains(&s) => {
            mapping(ErrorCategory::Provider, ErrorSeverity::Transient, true, true, false)
        }
        _ => mapping(ErrorCategory::Unknown, ErrorSeverity::Recoverable, false, false, false),
    }
}

/// Probe a decoded JSON error body for a human-readable message, in the
/// documented key priority order, falling back to raw text then the bare
/// status line.
pub fn extract_http_message(body: Option<&serde_json::Value>, raw_text: &str, status: u16) -> String {
    if let Some(value) = body {
        for key in ["error", "message", "detail", "error_description"] {
            if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
                return s.to_string();
            }
        }
        if let Some(nested) = value.get("error").or_else(|| value.get("details")) {
            for key in ["message", "description"] {
                if let Some(s) = nested.get(key).and_then(|v| v.as_str()) {
                    return s.to_string();
                }
            }
        }
    }
    if !raw_text.is_empty() {
        return raw_text.chars().take(200).collect();
    }
    format!("HTTP {status}")
}

/// Classify a fully-formed HTTP failure into a [`UsageError`].
pub fn classify_http_error(
    status: u16,
    body: Option<&serde_json::Value>,
    raw_text: &str,
    provider: Option<&str>,
) -> UsageError {
    let m = classify_http_status(status);
    let detail = extract_http_message(body, raw_text, status);
    let mut err = UsageError::new(format!("HTTP {status}: {detail}"), m.category, m.severity)
        .with_details(serde_json::json!({ "status_code": status, "response": detail }));
    if let Some(p) = provider {
        err = err.with_provider(p);
    }
    err
}

/// The language-neutral exception classifier (§4.1), applied to
/// transport-level failures that never produced an HTTP status (connect
/// errors, timeouts, request building failures).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    ConnectTimeout,
    ReadTimeout,
    ConnectRefused,
    DnsFailure,
    Generic,
    Cancelled,
}

pub fn classify_transport_failure(kind: TransportFailure, provider: Option<&str>) -> UsageError {
    let (message, remediation) = match kind {
        TransportFailure::ConnectTimeout | TransportFailure::ReadTimeout => (
            "Request timed out",
            Some("Check your network connection and try again."),
        ),
        TransportFailure::ConnectRefused | TransportFailure::DnsFailure | TransportFailure::Generic => (
            "Failed to connect to server",
            Some("Check your internet connection. The provider may be down."),
        ),
        TransportFailure::Cancelled => ("Operation cancelled", None),
    };
    let severity = match kind {
        TransportFailure::Cancelled => ErrorSeverity::Recoverable,
        _ => ErrorSeverity::Transient,
    };
    let category =
        if kind == TransportFailure::Cancelled { ErrorCategory::Unknown } else { ErrorCategory::Network };
    let mut err = UsageError::new(message, category, severity);
    if let Some(r) = remediation {
        err = err.with_remediation(r);
    }
    if let Some(p) = provider {
        err = err.with_provider(p);
    }
    err
}

/// Classify a JSON decode failure (`(parse, recoverable)`).
pub fn classify_parse_error(detail: impl Into<String>, provider: Option<&str>) -> UsageError {
    let mut err = UsageError::new("Failed to parse response", ErrorCategory::Parse, ErrorSeverity::Recoverable)
        .with_details(serde_json::json!({ "error": detail.into() }));
    if let Some(p) = provider {
        err = err.with_provider(p);
    }
    err
}

/// Classify a config/credential I/O failure. `fatal` distinguishes
/// permission-denied (fatal) from file-not-found (recoverable).
pub fn classify_io_error(path: Option<&str>, fatal: bool, provider: Option<&str>) -> UsageError {
    let severity = if fatal { ErrorSeverity::Fatal } else { ErrorSeverity::Recoverable };
    let message = match (fatal, path) {
        (true, Some(p)) => format!("Permission denied: {p}"),
        (true, None) => "Permission denied".to_string(),
        (false, Some(p)) => format!("File not found: {p}"),
        (false, None) => "File not found".to_string(),
    };
    let mut err = UsageError::new(message, ErrorCategory::Configuration, severity);
    if fatal {
        err = err.with_remediation("Check file permissions for the usageguard config directory.");
    }
    if let Some(p) = provider {
        err = err.with_provider(p);
    }
    err
}

/// Generic unknown/recoverable fallback for anything the classifier
/// doesn't recognise.
pub fn classify_unknown(detail: impl Into<String>, provider: Option<&str>) -> UsageError {
    let mut err = UsageError::new(detail, ErrorCategory::Unknown, ErrorSeverity::Recoverable);
    if let Some(p) = provider {
        err = err.with_provider(p);
    }
    err
}

/// Thin wrapper distinguishing a hard timeout from the wrapped operation's
/// own error, used at the single seam where the fetch pipeline imposes a
/// deadline on a strategy's `fetch()` call (§5 "cancellation and timeouts").
#[derive(Debug)]
pub enum GuardError<E> {
    Timeout { elapsed: Duration, timeout: Duration },
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for GuardError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::Timeout { elapsed, timeout } => {
                write!(f, "operation timed out after {elapsed:?} (limit: {timeout:?})")
            }
            GuardError::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for GuardError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuardError::Inner(e) => Some(e),
            GuardError::Timeout { .. } => None,
        }
    }
}

impl<E> GuardError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GuardError::Timeout { .. })
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            GuardError::Inner(e) => Some(e),
            GuardError::Timeout { .. } => None,
        }
    }
}
