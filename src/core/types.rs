//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

use std::collections::BTreeMap;

/// A stack name (e.g., production-patient-api).
pub type StackName = String;

/// An opaque network identifier (VPC id).
pub type NetworkId = String;

/// A subnet identifier.
pub type SubnetId = String;

/// A hosted zone identifier.
pub type ZoneId = String;

/// An opaque one-off task identifier.
pub type TaskId = String;

/// Named stack input parameters, ordered by key.
pub type Parameters = BTreeMap<String, String>;

/// Named stack outputs as returned by the provider.
pub type Outputs = BTreeMap<String, String>;

/// Tags attached to a stack.
pub type Tags = BTreeMap<String, String>;
