//! OAI Harvester - enumerate and retrieve metadata records from OAI-PMH
//! endpoints.
//!
//! Records are exposed under (identifier, metadata prefix) combinations,
//! either by a live endpoint paginated through resumption tokens or by a
//! static repository whose whole catalog is one pre-published document.
//! Harvested records surface as a deduplicated stream in a deterministic
//! order, and a persisted per-endpoint overview decides whether each
//! harvest is full, incremental, or a retry.
//!
//! # Example
//!
//! ```
//! use oai_harvester::config;
//!
//! assert!(config::validate_endpoint_url("https://archive.example.org/oai").is_ok());
//! assert!(config::validate_date("2026-01-01").is_ok());
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, validation, and request URL builders
//! - [`types`]: Core data types (Target, HarvestRecord, endpoint descriptors)
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP client for talking to endpoints
//! - [`xml`]: XML navigation utilities
//! - [`oai`]: OAI-PMH response parsing
//! - [`harvesting`]: The record-list harvesting state machine
//! - [`overview`]: Persisted per-endpoint harvest state and run mode
//! - [`harvester`]: Driving loop tying the pieces together
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod harvester;
pub mod harvesting;
pub mod http;
pub mod oai;
pub mod overview;
pub mod types;
pub mod xml;

// Re-export main functions
pub use harvester::{harvest_endpoint, harvest_records};

// Re-export commonly used items
pub use error::{HarvesterError, Result};
pub use harvesting::{ListHarvesting, ListSource, RecordListHarvesting, StaticListHarvesting};
pub use overview::{decide, HarvestDecision, Overview, RunMode};
pub use types::{EndpointConfig, EndpointKind, HarvestRecord, MetadataFormat, Target, TargetSet};
