//! Network placement.

use serde::Serialize;

/// A subnet and whether it assigns public addresses on launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub id: String,
    pub public: bool,
}

/// Resolved network placement for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub region: String,
    pub network_id: String,
    pub subnet_ids: Vec<String>,
    pub public_subnet_ids: Vec<String>,
    /// The preferred network was not found and the first one was used.
    pub network_fallback: bool,
    /// No subnet is flagged public and the first ones were used.
    pub public_fallback: bool,
}
