//! List harvesting against a static repository.
//!
//! A static endpoint publishes its whole catalog as one document, fetched
//! once before harvesting starts. Every phase works on that retained
//! document; there is nothing to paginate, and sets do not apply.

use crate::error::{HarvesterError, Result};
use crate::oai;
use crate::types::{HarvestRecord, Target};

use super::{ListHarvesting, ListState};

/// Harvesting state machine for a static endpoint.
pub struct StaticListHarvesting {
    endpoint_uri: String,
    /// The pre-fetched catalog, retained for the whole harvest.
    catalog: String,
    state: ListState,
}

impl StaticListHarvesting {
    /// Associate a retained catalog document with the desired prefixes.
    pub fn new(
        endpoint_uri: impl Into<String>,
        catalog: impl Into<String>,
        prefixes: Vec<String>,
    ) -> Self {
        Self {
            endpoint_uri: endpoint_uri.into(),
            catalog: catalog.into(),
            state: ListState::new(prefixes, Vec::new()),
        }
    }
}

impl ListHarvesting for StaticListHarvesting {
    /// Verify the static content is in place for the current cycle.
    fn request(&mut self) -> Result<()> {
        self.state.current_prefix()?;
        if self.catalog.trim().is_empty() {
            return Err(HarvesterError::Protocol(format!(
                "no static content for {}",
                self.endpoint_uri
            )));
        }
        Ok(())
    }

    fn process_response(&mut self) -> Result<()> {
        if !self.state.has_prefixes() {
            return Err(HarvesterError::Configuration(self.endpoint_uri.clone()));
        }
        let prefix = self.state.current_prefix()?.to_string();
        let headers = oai::catalog_headers(&self.catalog, &prefix)?;

        for header in headers {
            if header.deleted {
                continue;
            }
            self.state.insert_target(Target::new(header.identifier, &prefix));
        }
        Ok(())
    }

    /// The retained document already holds the full catalog for every
    /// prefix, so there is never more to request.
    fn request_more(&mut self) -> bool {
        false
    }

    fn parse_response(&mut self) -> Result<HarvestRecord> {
        let target = self.state.next_target()?;

        match oai::record_in_catalog(&self.catalog, &target.prefix, &target.identifier)? {
            Some(raw) => Ok(HarvestRecord::new(
                target.identifier,
                raw,
                self.endpoint_uri.clone(),
            )),
            None => Err(HarvesterError::Parse(format!(
                "no record matches ({}, {}) in the catalog",
                target.identifier, target.prefix
            ))),
        }
    }

    fn next_cycle(&mut self) -> bool {
        self.state.advance_cycle()
    }

    fn targets_remaining(&self) -> usize {
        self.state.targets_remaining()
    }

    fn endpoint_uri(&self) -> &str {
        &self.endpoint_uri
    }
}
