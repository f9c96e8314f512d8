//! Route 53.

use serde_json::{json, Value};

use super::{array, str_field, AwsCli};
use crate::core::domain::{normalize_name, DnsRecord};
use crate::core::provider::DnsProvider;
use crate::error::{DnsError, Result};

/// Record types that answer for a name the way the service endpoint does.
const ADDRESS_TYPES: &[&str] = &["CNAME", "A", "AAAA"];

impl DnsProvider for AwsCli {
    fn find_zone(&self, domain: &str) -> Result<Option<String>> {
        let response = self.json(&["route53", "list-hosted-zones"])?;
        Ok(best_zone(&response, domain))
    }

    fn list_records(&self, zone: &str, name: &str) -> Result<Vec<DnsRecord>> {
        let response = self.json(&[
            "route53",
            "list-resource-record-sets",
            "--hosted-zone-id",
            zone,
            "--start-record-name",
            name,
            "--max-items",
            "10",
        ])?;
        Ok(parse_records(&response, name))
    }

    fn upsert_record(&self, zone: &str, record: &DnsRecord) -> Result<()> {
        let batch = change_batch(record).to_string();
        self.run(&[
            "route53",
            "change-resource-record-sets",
            "--hosted-zone-id",
            zone,
            "--change-batch",
            batch.as_str(),
        ])
        .map_err(|e| DnsError::UpsertFailed {
            zone: zone.to_string(),
            fqdn: record.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Most specific public zone that `domain` falls under.
fn best_zone(response: &Value, domain: &str) -> Option<String> {
    let domain = normalize_name(domain);
    array(response, "HostedZones")
        .iter()
        .filter(|z| {
            !z.pointer("/Config/PrivateZone")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .filter_map(|z| Some((normalize_name(&str_field(z, "Name")?), str_field(z, "Id")?)))
        .filter(|(name, _)| domain == *name || domain.ends_with(&format!(".{}", name)))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, id)| id.trim_start_matches("/hostedzone/").to_string())
}

fn parse_records(response: &Value, name: &str) -> Vec<DnsRecord> {
    let wanted = normalize_name(name);
    array(response, "ResourceRecordSets")
        .iter()
        .filter_map(|r| {
            let record_name = str_field(r, "Name")?;
            let record_type = str_field(r, "Type")?;
            if normalize_name(&record_name) != wanted
                || !ADDRESS_TYPES.contains(&record_type.as_str())
            {
                return None;
            }
            let value = r
                .pointer("/ResourceRecords/0/Value")
                .and_then(Value::as_str)
                .or_else(|| r.pointer("/AliasTarget/DNSName").and_then(Value::as_str))
                .map(|v| v.trim_end_matches('.').to_string())
                .unwrap_or_default();
            Some(DnsRecord {
                name: normalize_name(&record_name),
                record_type,
                value,
                ttl: r
                    .get("TTL")
                    .and_then(Value::as_u64)
                    .and_then(|t| u32::try_from(t).ok()),
            })
        })
        .collect()
}

fn change_batch(record: &DnsRecord) -> Value {
    json!({
        "Comment": "bullpen: point record at current load balancer",
        "Changes": [{
            "Action": "UPSERT",
            "ResourceRecordSet": {
                "Name": record.name,
                "Type": record.record_type,
                "TTL": record.ttl.unwrap_or(crate::core::constants::DNS_TTL),
                "ResourceRecords": [{ "Value": record.value }],
            }
        }]
    })
}
