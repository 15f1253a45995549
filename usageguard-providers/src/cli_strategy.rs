//! CLI-backed strategy: shells out to a vendored executable that prints
//! a usage snapshot on stdout as line-oriented `key=value` pairs, one
//! period per line (e.g. `session=42`).

use async_trait::async_trait;
use tokio::process::Command;
use usageguard::{FetchResult, Strategy, UsageSnapshot};

/// Parse `<period_name>=<utilization>` lines, skipping blanks and lines
/// that don't parse as a number (vendor executables are free to print
/// banner/debug lines; only lines that look like the expected format
/// are treated as usage data). The value is parsed as a float and
/// truncated to an integer percent, matching vendored CLIs that print
/// e.g. `42.0` for a round number.
fn parse_key_value_periods(stdout: &[u8]) -> Vec<usageguard::model::UsagePeriod> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once('=')?;
            let utilization: f64 = value.trim().parse().ok()?;
            Some(usageguard::model::UsagePeriod {
                name: name.trim().to_string(),
                period_type: usageguard::model::PeriodType::Session,
                utilization: utilization as i64,
                resets_at: None,
            })
        })
        .collect()
}

pub struct CliStrategy {
    provider_id: String,
    executable: String,
}

impl CliStrategy {
    pub fn new(provider_id: String, executable: String) -> Self {
        Self { provider_id, executable }
    }
}

#[async_trait]
impl Strategy for CliStrategy {
    fn name(&self) -> &str {
        "cli"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn fetch(&self) -> FetchResult {
        let output = match Command::new(&self.executable).arg("usage").output().await {
            Ok(output) => output,
            Err(err) => {
                return FetchResult::Fail {
                    error: usageguard::error::classify_unknown(
                        format!("failed to run '{}': {err}", self.executable),
                        Some(&self.provider_id),
                    ),
                };
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return FetchResult::Fail {
                error: usageguard::error::classify_unknown(
                    format!("'{}' exited with {}: {stderr}", self.executable, output.status),
                    Some(&self.provider_id),
                ),
            };
        }

        let periods = parse_key_value_periods(&output.stdout);
        if periods.is_empty() {
            return FetchResult::Fail {
                error: usageguard::error::classify_parse_error(
                    format!("'{}' produced no parseable usage lines", self.executable),
                    Some(&self.provider_id),
                ),
            };
        }

        FetchResult::Success(UsageSnapshot {
            provider: self.provider_id.clone(),
            fetched_at: chrono::Utc::now(),
            periods,
            overage: None,
            identity: None,
            status: None,
            source: self.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_when_executable_is_missing() {
        let strategy = CliStrategy::new("acme-ai".into(), "definitely-not-a-real-binary".into());
        assert!(!strategy.is_available().await);
    }

    #[test]
    fn parses_key_value_lines_and_skips_junk() {
        let stdout = b"starting up...\nsession=42\ndaily = 10\nnot a usage line\n";
        let periods = parse_key_value_periods(stdout);
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].name, "session");
        assert_eq!(periods[0].utilization, 42);
        assert_eq!(periods[1].name, "daily");
        assert_eq!(periods[1].utilization, 10);
    }

    #[test]
    fn empty_stdout_yields_no_periods() {
        assert!(parse_key_value_periods(b"").is_empty());
    }
}
