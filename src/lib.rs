//! # edgeconf
//!
//! Declarative reconciliation of edge service sub-resources.
//!
//! A service is configured through nested attributes (ACLs, Logentries
//! logging endpoints, a compute package). Each attribute has a handler that
//! registers its field schema, reconciles declared changes against the
//! draft version, and reads the active version back into a state sink.
//! The generic diff/plan/apply machinery lives in the `declarative` crate.

pub mod api;
pub mod client;
pub mod config;
pub mod handler;
pub mod schema;
pub mod service;
pub mod state;

pub use config::{ServiceKind, ServiceMetadata};
pub use service::ServiceDefinition;
