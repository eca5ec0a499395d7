//! Record-list harvesting state machine.
//!
//! One harvesting instance per endpoint drives the
//! `request -> process_response -> request_more -> parse_response` cycle,
//! reused across the endpoint's declared prefixes and sets. Targets
//! accumulate in a sorted, deduplicated set during the process phase and
//! are drained in sort order by the parse phase.

mod dynamic;
mod static_list;

pub use dynamic::{HttpSource, RecordListHarvesting};
pub use static_list::StaticListHarvesting;

use crate::error::{HarvesterError, Result};
use crate::types::{HarvestRecord, Target, TargetSet};

/// Capability to issue record-listing requests against a live endpoint.
///
/// Implemented over HTTP for real harvests; tests substitute canned pages.
pub trait ListSource {
    /// Fetch one `ListRecords` page. A resumption token, when present,
    /// replaces every other argument.
    fn list_records(
        &self,
        prefix: &str,
        set: Option<&str>,
        from: Option<&str>,
        token: Option<&str>,
    ) -> Result<String>;
}

/// Contract the driving loop runs against, satisfied by both the dynamic
/// and the static variant.
pub trait ListHarvesting {
    /// Obtain or verify the response for the current prefix/set cycle.
    fn request(&mut self) -> Result<()>;

    /// Evaluate the header listing of the stored response and add one
    /// target per non-deleted header. Idempotent per response.
    fn process_response(&mut self) -> Result<()>;

    /// Whether another page exists for the current cycle; arming the next
    /// `request()` with its continuation token when it does.
    fn request_more(&mut self) -> bool;

    /// Materialize the next target, advancing the parse cursor.
    fn parse_response(&mut self) -> Result<HarvestRecord>;

    /// Advance to the next prefix/set cycle. False when all cycles are done.
    fn next_cycle(&mut self) -> bool;

    /// Targets not yet consumed by `parse_response`.
    fn targets_remaining(&self) -> usize;

    /// URI of the endpoint this instance harvests.
    fn endpoint_uri(&self) -> &str;
}

/// Prefix/set cycle bookkeeping and the target set, shared by both
/// harvesting variants.
#[derive(Debug)]
pub(crate) struct ListState {
    prefixes: Vec<String>,
    sets: Vec<String>,
    p_index: usize,
    s_index: usize,
    targets: TargetSet,
    t_index: usize,
}

impl ListState {
    pub(crate) fn new(prefixes: Vec<String>, sets: Vec<String>) -> Self {
        Self {
            prefixes,
            sets,
            p_index: 0,
            s_index: 0,
            targets: TargetSet::new(),
            t_index: 0,
        }
    }

    pub(crate) fn has_prefixes(&self) -> bool {
        !self.prefixes.is_empty()
    }

    /// Prefix of the current cycle, or a protocol error when the index has
    /// run off the end.
    pub(crate) fn current_prefix(&self) -> Result<&str> {
        self.prefixes
            .get(self.p_index)
            .map(String::as_str)
            .ok_or_else(|| HarvesterError::Protocol("prefix index out of range".to_string()))
    }

    /// Set of the current cycle; `None` when no sets are declared.
    pub(crate) fn current_set(&self) -> Result<Option<&str>> {
        if self.sets.is_empty() {
            return Ok(None);
        }
        self.sets
            .get(self.s_index)
            .map(|s| Some(s.as_str()))
            .ok_or_else(|| HarvesterError::Protocol("set index out of range".to_string()))
    }

    /// Advance to the next (prefix, set) pair, sets innermost.
    pub(crate) fn advance_cycle(&mut self) -> bool {
        if !self.sets.is_empty() && self.s_index + 1 < self.sets.len() {
            self.s_index += 1;
        } else {
            self.s_index = 0;
            self.p_index += 1;
        }
        self.p_index < self.prefixes.len()
    }

    /// Insert a target; duplicates are ignored.
    pub(crate) fn insert_target(&mut self, target: Target) {
        self.targets.insert(target);
    }

    /// Take the next target in sort order, advancing the cursor.
    pub(crate) fn next_target(&mut self) -> Result<Target> {
        let target = self
            .targets
            .get(self.t_index)
            .cloned()
            .ok_or_else(|| HarvesterError::Protocol("target cursor exhausted".to_string()))?;
        self.t_index += 1;
        Ok(target)
    }

    pub(crate) fn targets_remaining(&self) -> usize {
        self.targets.len() - self.t_index
    }
}
