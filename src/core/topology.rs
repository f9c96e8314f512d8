//! Network topology resolution.

use tracing::{debug, warn};

use crate::core::constants::PUBLIC_SUBNET_FALLBACK_COUNT;
use crate::core::domain::Topology;
use crate::core::provider::NetworkProvider;
use crate::error::{Result, TopologyError};

/// Where to look for the network.
#[derive(Debug, Clone)]
pub struct NetworkPreferences {
    pub tag_key: String,
    pub tag_value: String,
    /// Used when the chosen network reports no subnets.
    pub fallback_subnets: Vec<String>,
}

/// Discover the network and subnet sets for `region`.
///
/// Prefers the tagged network and falls back to the first one the provider
/// returns. Public subnets fall back to the first two of the full set.
///
/// # Errors
///
/// Returns `TopologyError::NoNetwork` if the region has no network at all.
pub fn resolve(
    network: &dyn NetworkProvider,
    region: &str,
    prefs: &NetworkPreferences,
) -> Result<Topology> {
    let (network_id, network_fallback) =
        match network.find_network(&prefs.tag_key, &prefs.tag_value)? {
            Some(id) => (id, false),
            None => {
                let id = network
                    .list_networks()?
                    .into_iter()
                    .next()
                    .ok_or_else(|| TopologyError::NoNetwork(region.to_string()))?;
                warn!(
                    tag = %format!("{}={}", prefs.tag_key, prefs.tag_value),
                    network = %id,
                    "tagged network not found, using first network in region"
                );
                (id, true)
            }
        };

    let subnets = network.list_subnets(&network_id)?;
    let mut subnet_ids: Vec<String> = subnets.iter().map(|s| s.id.clone()).collect();
    if subnet_ids.is_empty() && !prefs.fallback_subnets.is_empty() {
        warn!(
            network = %network_id,
            subnets = ?prefs.fallback_subnets,
            "network reports no subnets, using declared fallback subnets"
        );
        subnet_ids = prefs.fallback_subnets.clone();
    }

    let mut public_subnet_ids: Vec<String> = subnets
        .iter()
        .filter(|s| s.public)
        .map(|s| s.id.clone())
        .collect();
    let public_fallback = public_subnet_ids.is_empty();
    if public_fallback {
        public_subnet_ids = subnet_ids
            .iter()
            .take(PUBLIC_SUBNET_FALLBACK_COUNT)
            .cloned()
            .collect();
        warn!(
            network = %network_id,
            subnets = ?public_subnet_ids,
            "no public subnets flagged, using first subnets"
        );
    }

    debug!(
        network = %network_id,
        subnets = subnet_ids.len(),
        public = public_subnet_ids.len(),
        "topology resolved"
    );
    Ok(Topology {
        region: region.to_string(),
        network_id,
        subnet_ids,
        public_subnet_ids,
        network_fallback,
        public_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::memory::MemoryCloud;
    use crate::error::Error;

    fn prefs() -> NetworkPreferences {
        NetworkPreferences {
            tag_key: "Name".into(),
            tag_value: "main".into(),
            fallback_subnets: Vec::new(),
        }
    }

    #[test]
    fn test_tagged_network_with_public_subnets() {
        let cloud = MemoryCloud::standard();
        let topology = resolve(&cloud, "us-east-1", &prefs()).unwrap();
        assert_eq!(topology.network_id, "vpc-main");
        assert_eq!(topology.subnet_ids.len(), 4);
        assert_eq!(topology.public_subnet_ids, vec!["subnet-pub-a", "subnet-pub-b"]);
        assert!(!topology.network_fallback);
        assert!(!topology.public_fallback);
    }

    #[test]
    fn test_untagged_network_falls_back_to_first() {
        let cloud = MemoryCloud::new()
            .with_network("vpc-first", &[])
            .with_network("vpc-second", &[])
            .with_subnets("vpc-first", &[("subnet-1", true)]);
        let topology = resolve(&cloud, "us-east-1", &prefs()).unwrap();
        assert_eq!(topology.network_id, "vpc-first");
        assert!(topology.network_fallback);
    }

    #[test]
    fn test_no_public_subnets_takes_first_two() {
        let cloud = MemoryCloud::new()
            .with_network("vpc-main", &[("Name", "main")])
            .with_subnets(
                "vpc-main",
                &[("subnet-a", false), ("subnet-b", false), ("subnet-c", false)],
            );
        let topology = resolve(&cloud, "us-east-1", &prefs()).unwrap();
        assert_eq!(topology.public_subnet_ids, vec!["subnet-a", "subnet-b"]);
        assert!(topology.public_fallback);
    }

    #[test]
    fn test_declared_fallback_subnets() {
        let cloud = MemoryCloud::new().with_network("vpc-main", &[("Name", "main")]);
        let mut prefs = prefs();
        prefs.fallback_subnets = vec!["subnet-dr-1".into()];
        let topology = resolve(&cloud, "us-east-1", &prefs).unwrap();
        assert_eq!(topology.subnet_ids, vec!["subnet-dr-1"]);
        assert_eq!(topology.public_subnet_ids, vec!["subnet-dr-1"]);
    }

    #[test]
    fn test_no_network_is_fatal() {
        let err = resolve(&MemoryCloud::new(), "eu-west-3", &prefs()).unwrap_err();
        assert!(matches!(err, Error::Topology(TopologyError::NoNetwork(r)) if r == "eu-west-3"));
    }
}
