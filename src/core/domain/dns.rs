//! DNS records and reconcile decisions.

use serde::Serialize;

/// A single record set as seen in the zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecord {
    pub name: String,
    pub record_type: String,
    pub value: String,
    pub ttl: Option<u32>,
}

/// Canonical form for comparing record names: lowercase, no trailing dot.
pub fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Result of the pre-stack probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsDecision {
    pub zone: String,
    pub fqdn: String,
    /// Records already answering for `fqdn`.
    pub existing: Vec<DnsRecord>,
    /// Whether the template may create the record when none exists.
    pub allow_template_create: bool,
}

impl DnsDecision {
    /// The template creates the record only when nothing answers for it yet.
    pub fn create_via_template(&self) -> bool {
        self.existing.is_empty() && self.allow_template_create
    }

    /// Whether an imperative upsert must follow the stack apply.
    pub fn needs_upsert(&self) -> bool {
        !self.create_via_template()
    }

    /// Current target of the first existing record, if any.
    pub fn current_target(&self) -> Option<&str> {
        self.existing.first().map(|r| r.value.as_str())
    }
}

/// What happened to the record after the stack was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DnsOutcome {
    /// Custom domain not configured.
    Skipped,
    /// The stack owns and created the record.
    CreatedByStack { fqdn: String },
    /// Pointed an existing record at the new address.
    Upserted {
        fqdn: String,
        previous: Option<String>,
        target: String,
    },
    /// Infrastructure is updated but the record is stale.
    UpsertFailed {
        fqdn: String,
        target: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str) -> DnsRecord {
        DnsRecord {
            name: "api.example.com".into(),
            record_type: "CNAME".into(),
            value: value.into(),
            ttl: Some(300),
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("API.Example.com."), "api.example.com");
        assert_eq!(normalize_name("api.example.com"), "api.example.com");
    }

    #[test]
    fn test_empty_zone_creates_via_template() {
        let decision = DnsDecision {
            zone: "Z1".into(),
            fqdn: "api.example.com".into(),
            existing: vec![],
            allow_template_create: true,
        };
        assert!(decision.create_via_template());
        assert!(!decision.needs_upsert());
    }

    #[test]
    fn test_existing_record_needs_upsert() {
        let decision = DnsDecision {
            zone: "Z1".into(),
            fqdn: "api.example.com".into(),
            existing: vec![record("old-lb.elb.amazonaws.com")],
            allow_template_create: true,
        };
        assert!(!decision.create_via_template());
        assert!(decision.needs_upsert());
        assert_eq!(decision.current_target(), Some("old-lb.elb.amazonaws.com"));
    }

    #[test]
    fn test_template_create_disallowed_falls_back_to_upsert() {
        let decision = DnsDecision {
            zone: "Z1".into(),
            fqdn: "api.example.com".into(),
            existing: vec![],
            allow_template_create: false,
        };
        assert!(!decision.create_via_template());
        assert!(decision.needs_upsert());
    }
}
