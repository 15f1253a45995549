//! Domain data model: usage snapshots, provider status, and the
//! bookkeeping types the fetch pipeline produces per attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, UsageError};

/// Kind of accounting period a [`UsagePeriod`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Session,
    Daily,
    Weekly,
    Monthly,
    Billing,
}

/// A single utilization window reported by a provider (e.g. "5-hour
/// session", "weekly quota").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePeriod {
    pub name: String,
    pub period_type: PeriodType,
    /// Percent used, `0..≥100`. Providers may report above 100 when
    /// they've burst past a soft quota; callers should clamp for display
    /// but the raw value is preserved here.
    pub utilization: i64,
    pub resets_at: Option<DateTime<Utc>>,
}

/// Pay-as-you-go overage usage outside the metered periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverageUsage {
    pub used: f64,
    pub limit: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub is_enabled: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Identity of the account the snapshot was fetched for, when the
/// provider's API exposes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub org_id: Option<String>,
    pub display_name: Option<String>,
}

/// Operational status reported by a provider's status page or API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Operational,
    Degraded,
    PartialOutage,
    MajorOutage,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub level: StatusLevel,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A complete, successfully-fetched (or cached) usage reading for one
/// provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub provider: String,
    pub fetched_at: DateTime<Utc>,
    pub periods: Vec<UsagePeriod>,
    pub overage: Option<OverageUsage>,
    pub identity: Option<ProviderIdentity>,
    pub status: Option<ProviderStatus>,
    /// Name of the strategy that produced this snapshot (§4.6).
    pub source: String,
}

/// Validation error for a snapshot that violates the data model's
/// invariants (§4.10).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("period '{name}' utilization {utilization} is negative")]
    NegativeUtilization { name: String, utilization: i64 },
    #[error("snapshot source must not be empty")]
    EmptySource,
    #[error("snapshot provider must not be empty")]
    EmptyProvider,
}

/// Validate a single period: utilization must be non-negative. Values
/// above `100` are allowed (burst/overage).
pub fn validate_period(period: &UsagePeriod) -> Result<(), ValidationError> {
    if period.utilization < 0 {
        return Err(ValidationError::NegativeUtilization {
            name: period.name.clone(),
            utilization: period.utilization,
        });
    }
    Ok(())
}

/// Validate a full snapshot per §4.10: provider and source non-empty,
/// every period individually valid.
pub fn validate_snapshot(snapshot: &UsageSnapshot) -> Result<(), ValidationError> {
    if snapshot.provider.trim().is_empty() {
        return Err(ValidationError::EmptyProvider);
    }
    if snapshot.source.trim().is_empty() {
        return Err(ValidationError::EmptySource);
    }
    for period in &snapshot.periods {
        validate_period(period)?;
    }
    Ok(())
}

/// Record of one strategy attempt within a single fetch pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAttempt {
    pub strategy: String,
    pub succeeded: bool,
    pub error: Option<UsageError>,
    pub duration_ms: u64,
}

/// A single recorded failure in a provider's gate window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub at_unix_millis: u64,
    pub category: ErrorCategory,
    pub message: String,
}

/// Persisted state of a provider's failure gate (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateState {
    pub failures: Vec<FailureRecord>,
    pub consecutive_count: u32,
    pub gated_until_unix_millis: Option<u64>,
}

/// Outcome of running the fetch pipeline for one provider (§4.7/§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub provider: String,
    pub success: bool,
    pub snapshot: Option<UsageSnapshot>,
    pub attempts: Vec<FetchAttempt>,
    pub error: Option<UsageError>,
    pub cached: bool,
    pub gated: bool,
    pub fatal: bool,
    pub gate_remaining_ms: Option<u64>,
}

impl FetchOutcome {
    /// §8 universal invariant: a successful outcome always carries a
    /// snapshot with a non-empty source.
    pub fn is_well_formed(&self) -> bool {
        if self.success {
            matches!(&self.snapshot, Some(s) if !s.source.trim().is_empty())
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_period(utilization: i64) -> UsagePeriod {
        UsagePeriod {
            name: "session".into(),
            period_type: PeriodType::Session,
            utilization,
            resets_at: None,
        }
    }

    #[test]
    fn validate_period_accepts_ordinary_utilization() {
        assert!(validate_period(&sample_period(42)).is_ok());
    }

    #[test]
    fn validate_period_allows_overage_above_100() {
        assert!(validate_period(&sample_period(135)).is_ok());
    }

    #[test]
    fn validate_period_rejects_negative_utilization() {
        assert!(matches!(
            validate_period(&sample_period(-10)),
            Err(ValidationError::NegativeUtilization { .. })
        ));
    }

    #[test]
    fn validate_snapshot_rejects_empty_provider_or_source() {
        let mut snapshot = UsageSnapshot {
            provider: "".into(),
            fetched_at: Utc::now(),
            periods: vec![],
            overage: None,
            identity: None,
            status: None,
            source: "oauth".into(),
        };
        assert_eq!(validate_snapshot(&snapshot), Err(ValidationError::EmptyProvider));

        snapshot.provider = "acme-ai".into();
        snapshot.source = "".into();
        assert_eq!(validate_snapshot(&snapshot), Err(ValidationError::EmptySource));

        snapshot.source = "oauth".into();
        assert!(validate_snapshot(&snapshot).is_ok());
    }

    #[test]
    fn fetch_outcome_well_formed_requires_snapshot_on_success() {
        let outcome = FetchOutcome {
            provider: "acme-ai".into(),
            success: true,
            snapshot: None,
            attempts: vec![],
            error: None,
            cached: false,
            gated: false,
            fatal: false,
            gate_remaining_ms: None,
        };
        assert!(!outcome.is_well_formed());
    }

    #[test]
    fn fetch_outcome_well_formed_allows_missing_snapshot_on_failure() {
        let outcome = FetchOutcome {
            provider: "acme-ai".into(),
            success: false,
            snapshot: None,
            attempts: vec![],
            error: None,
            cached: false,
            gated: true,
            fatal: false,
            gate_remaining_ms: Some(1000),
        };
        assert!(outcome.is_well_formed());
    }
}
