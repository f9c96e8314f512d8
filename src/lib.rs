//! Bullpen - Deploy a containerized web service and its database to AWS in one run.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── init          # Scaffold bullpen.toml
//! │   ├── check         # Validate config and credentials
//! │   ├── plan          # Read-only probe of what a deploy would do
//! │   ├── deploy        # Full pipeline
//! │   ├── secrets       # Ensure and list vault secrets
//! │   ├── status        # Stack and service state
//! │   ├── migrate       # One-shot initialization task
//! │   ├── verify        # Smoke checks
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # bullpen.toml management
//!     ├── domain/       # Stack, secret, DNS and task types
//!     ├── provider/     # Provider traits
//!     │   ├── aws/      # aws CLI implementation
//!     │   ├── docker    # Image build and push
//!     │   ├── sdk       # Secrets Manager through the SDK
//!     │   └── memory    # In-memory cloud for tests
//!     ├── topology      # Network and subnet discovery
//!     ├── vault         # Secret rotation policy
//!     ├── image         # Build and publish
//!     ├── stack         # Create-or-update reconcile
//!     ├── dns           # Record precheck and upsert
//!     ├── migrate       # Redeploy and migration task
//!     ├── verify        # Smoke checks
//!     └── pipeline      # Stage ordering
//! ```
//!
//! # Features
//!
//! - Idempotent create-or-update of the infrastructure stack
//! - Per-purpose secret rotation with fingerprints, never values, in logs
//! - DNS records the stack does not own are upserted after apply
//! - A failed migration task fails the run with the task ID
//! - Every external system behind a trait, with an in-memory fake

pub mod cli;
pub mod core;
pub mod error;
