//! DNS reconciliation for the custom domain.
//!
//! [`precheck`] runs before the stack is applied and decides whether the
//! template may create the record. [`reconcile`] runs after and points an
//! existing record at the new load balancer.
//!
//! The zone is read once, in `precheck`, and not re-read before the upsert.
//! A record created by someone else in between is overwritten.

use tracing::{debug, info, warn};

use crate::core::constants;
use crate::core::domain::{normalize_name, DnsDecision, DnsOutcome, DnsRecord};
use crate::core::provider::DnsProvider;
use crate::error::{DnsError, Result};

/// Custom domain settings.
#[derive(Debug, Clone)]
pub struct DomainSpec {
    pub domain: String,
    pub zone_id: Option<String>,
    pub ttl: u32,
    /// Whether the template may create the record when none exists.
    pub template_managed: bool,
}

/// Read current zone contents for the domain.
///
/// # Errors
///
/// Returns `DnsError::ZoneNotFound` if no zone was configured and none serves
/// the domain.
pub fn precheck(dns: &dyn DnsProvider, spec: &DomainSpec) -> Result<DnsDecision> {
    let fqdn = normalize_name(&spec.domain);
    let zone = match &spec.zone_id {
        Some(zone) => zone.clone(),
        None => dns
            .find_zone(&fqdn)?
            .ok_or_else(|| DnsError::ZoneNotFound(fqdn.clone()))?,
    };

    let existing = dns.list_records(&zone, &fqdn)?;
    let decision = DnsDecision {
        zone,
        fqdn,
        existing,
        allow_template_create: spec.template_managed,
    };
    debug!(
        zone = %decision.zone,
        fqdn = %decision.fqdn,
        existing = decision.existing.len(),
        create_via_template = decision.create_via_template(),
        "dns prechecked"
    );
    Ok(decision)
}

/// Bring the record in line with `target` after the stack is applied.
///
/// Never fails the run: an upsert error is returned as
/// [`DnsOutcome::UpsertFailed`] and logged at warn level.
pub fn reconcile(dns: &dyn DnsProvider, decision: &DnsDecision, target: &str, ttl: u32) -> DnsOutcome {
    if decision.create_via_template() {
        info!(fqdn = %decision.fqdn, "dns record created by stack");
        return DnsOutcome::CreatedByStack {
            fqdn: decision.fqdn.clone(),
        };
    }

    let record = DnsRecord {
        name: decision.fqdn.clone(),
        record_type: constants::DNS_RECORD_TYPE.to_string(),
        value: target.to_string(),
        ttl: Some(ttl),
    };
    let previous = decision.current_target().map(str::to_string);

    match dns.upsert_record(&decision.zone, &record) {
        Ok(()) => {
            info!(
                fqdn = %decision.fqdn,
                previous = previous.as_deref().unwrap_or("-"),
                target,
                "dns record upserted"
            );
            DnsOutcome::Upserted {
                fqdn: decision.fqdn.clone(),
                previous,
                target: target.to_string(),
            }
        }
        Err(e) => {
            warn!(
                fqdn = %decision.fqdn,
                zone = %decision.zone,
                target,
                error = %e,
                "dns upsert failed; record is stale"
            );
            DnsOutcome::UpsertFailed {
                fqdn: decision.fqdn.clone(),
                target: target.to_string(),
                reason: e.to_string(),
            }
        }
    }
}
