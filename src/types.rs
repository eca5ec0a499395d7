//! Core data types for the harvester.
//!
//! A [`Target`] names one harvestable record instance as an
//! `(identifier, prefix)` pair; the [`TargetSet`] keeps targets sorted and
//! duplicate-free so records surface in a deterministic order.

use serde::{Deserialize, Serialize};

/// One harvestable record instance: an identifier combined with the
/// metadata prefix it should be retrieved in.
///
/// Field order matters: the derived `Ord` sorts by `(identifier, prefix)`
/// ascending, which is the order records are yielded in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target {
    /// OAI record identifier (e.g., "oai:archive.example.org:1042").
    pub identifier: String,

    /// Metadata prefix the record is requested in (e.g., "cmdi").
    pub prefix: String,
}

impl Target {
    /// Create a new target.
    #[must_use]
    pub fn new(identifier: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            prefix: prefix.into(),
        }
    }
}

/// Sorted, duplicate-free collection of [`Target`]s.
///
/// Insertion keeps the backing vector sorted via binary search, so the
/// parse cursor can walk targets by index in one pass.
#[derive(Debug, Default)]
pub struct TargetSet {
    entries: Vec<Target>,
}

impl TargetSet {
    /// Create an empty target set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a target, keeping the set sorted.
    ///
    /// Returns `false` if an equal target was already present; re-inserting
    /// is a no-op, which makes response processing idempotent.
    pub fn insert(&mut self, target: Target) -> bool {
        match self.entries.binary_search(&target) {
            Ok(_) => false,
            Err(pos) => {
                self.entries.insert(pos, target);
                true
            }
        }
    }

    /// Number of targets in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target at the given position in sort order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Target> {
        self.entries.get(index)
    }

    /// Iterate over targets in sort order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.entries.iter()
    }
}

/// One metadata format advertised by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFormat {
    /// Prefix used to request records in this format.
    pub prefix: String,

    /// XML namespace of the format.
    pub namespace: String,

    /// Location of the format's schema.
    pub schema_location: String,
}

/// A materialized record, ready for the downstream pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRecord {
    /// OAI record identifier.
    pub identifier: String,

    /// Raw XML of the `<record>` subtree as found in the response.
    pub raw_xml: String,

    /// URI of the endpoint the record was harvested from.
    pub endpoint_uri: String,

    /// Whether the endpoint flagged the record as deleted. Deleted headers
    /// are excluded during processing, so harvested records carry `false`.
    pub deleted: bool,

    /// Whether a downstream transformation has been applied.
    pub transformed: bool,
}

impl HarvestRecord {
    /// Create a fresh, untransformed record.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        raw_xml: impl Into<String>,
        endpoint_uri: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            raw_xml: raw_xml.into(),
            endpoint_uri: endpoint_uri.into(),
            deleted: false,
            transformed: false,
        }
    }
}

/// How an endpoint serves its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Live endpoint, paginated through resumption tokens.
    #[default]
    Dynamic,

    /// Static repository: the URI serves the whole catalog as one document.
    Static,
}

/// One endpoint entry from the harvest configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URI of the endpoint.
    pub uri: String,

    /// Dynamic or static source.
    #[serde(default)]
    pub kind: EndpointKind,

    /// Declared metadata prefixes. When empty, prefixes are discovered
    /// from the endpoint's format listing.
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// Declared sets. When empty, no set argument is sent.
    #[serde(default)]
    pub sets: Vec<String>,
}
