//! Deployment run report.
//!
//! Aggregates what each stage produced. Holds names and decisions only, never
//! secret values.

use serde::Serialize;

use super::{DnsOutcome, SecretAction, SecretName, StackResult, TaskOutcome, Topology};

/// Outcome of one secret.
#[derive(Debug, Clone, Serialize)]
pub struct SecretReport {
    pub name: SecretName,
    pub action: SecretAction,
    pub fingerprint: String,
}

/// Result of one smoke check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub name: String,
    pub url: String,
    pub expected: u16,
    /// Observed status, or `None` if the request never completed.
    pub status: Option<u16>,
    pub detail: Option<String>,
}

impl Check {
    pub fn passed(&self) -> bool {
        self.status == Some(self.expected)
    }
}

/// Everything one deployment run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub environment: String,
    pub topology: Topology,
    pub secrets: Vec<SecretReport>,
    pub image: String,
    pub stack: StackResult,
    pub dns: DnsOutcome,
    pub migration: Option<TaskOutcome>,
    pub checks: Vec<Check>,
}

impl RunReport {
    /// Warnings an operator has to act on even though the run succeeded.
    pub fn follow_ups(&self) -> Vec<String> {
        let mut items = Vec::new();
        if let DnsOutcome::UpsertFailed { fqdn, target, reason } = &self.dns {
            items.push(format!(
                "DNS for {} is stale ({}); point it at {} manually",
                fqdn, reason, target
            ));
        }
        for check in self.checks.iter().filter(|c| !c.passed()) {
            let observed = check
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no response".to_string());
            items.push(format!(
                "{} check at {} returned {} (expected {})",
                check.name, check.url, observed, check.expected
            ));
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passed() {
        let mut check = Check {
            name: "health".into(),
            url: "http://lb/health".into(),
            expected: 200,
            status: Some(200),
            detail: None,
        };
        assert!(check.passed());
        check.status = Some(503);
        assert!(!check.passed());
        check.status = None;
        assert!(!check.passed());
    }
}
