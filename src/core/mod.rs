//! Core library components.
//!
//! This module contains the deployment stages, the provider seams they drive,
//! and configuration handling.

pub mod config;
pub mod constants;
pub mod dns;
pub mod domain;
pub mod generate;
pub mod image;
pub mod migrate;
pub mod pipeline;
pub mod provider;
pub mod stack;
pub mod topology;
pub mod types;
pub mod vault;
pub mod verify;
