//! Post-deploy smoke checks.
//!
//! Failures are reported, never raised: the checks test eventual consistency
//! of a system the orchestrator has already finished changing.

use serde_json::json;
use tracing::{debug, warn};

use crate::core::domain::Check;
use crate::core::provider::HttpProbe;

/// Where to probe.
#[derive(Debug, Clone)]
pub struct VerifySpec {
    pub scheme: String,
    pub health_path: String,
    pub auth_path: String,
}

/// Base URL for a host name.
pub fn base_url(scheme: &str, host: &str) -> String {
    format!("{}://{}", scheme, host.trim_end_matches('/'))
}

/// Run the health probe and an administrator login.
pub fn smoke(
    probe: &dyn HttpProbe,
    base: &str,
    spec: &VerifySpec,
    admin_username: &str,
    admin_password: &str,
) -> Vec<Check> {
    let health_url = format!("{}{}", base, spec.health_path);
    let health = record("health", health_url.clone(), probe.get(&health_url));

    let auth_url = format!("{}{}", base, spec.auth_path);
    let body = json!({ "username": admin_username, "password": admin_password });
    let auth = record("auth", auth_url.clone(), probe.post_json(&auth_url, &body));

    vec![health, auth]
}

fn record(name: &str, url: String, result: crate::error::Result<u16>) -> Check {
    let (status, detail) = match result {
        Ok(status) => (Some(status), None),
        Err(e) => {
            debug!(check = name, category = ?e.category(), "probe did not complete");
            (None, Some(e.to_string()))
        }
    };
    let check = Check {
        name: name.to_string(),
        url,
        expected: 200,
        status,
        detail,
    };
    if check.passed() {
        debug!(check = name, url = %check.url, "check passed");
    } else {
        warn!(
            check = name,
            url = %check.url,
            status = ?check.status,
            detail = check.detail.as_deref().unwrap_or(""),
            "check failed"
        );
    }
    check
}
