//! Persisted harvest overview.
//!
//! The overview records, per endpoint, whether harvesting is blocked,
//! whether incremental harvesting is allowed, whether a retry is required,
//! and when the last attempt and last success happened, plus one global
//! run mode. It is read once when opened, held as a working copy, and
//! written back exactly once by an explicit [`Overview::close`] call —
//! persistence is never tied to drop timing.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use roxmltree::Document;

use crate::error::{HarvesterError, Result};
use crate::xml::{escape_attribute, find_children};

/// Global harvesting mode, read once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Incremental where permitted, full otherwise.
    #[default]
    Normal,

    /// Full harvest of every endpoint, ignoring previous successes.
    Refresh,

    /// Only endpoints flagged for retry.
    Retry,
}

impl RunMode {
    /// Attribute value in the persisted store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Refresh => "refresh",
            Self::Retry => "retry",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "refresh" => Some(Self::Refresh),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

/// Harvest state of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointState {
    /// Endpoint URI, the key in the persisted store.
    pub uri: String,

    /// Operator switch: skip this endpoint entirely.
    pub blocked: bool,

    /// Whether incremental harvesting is allowed for this endpoint.
    pub incremental: bool,

    /// Whether the previous harvest must be redone.
    pub retry: bool,

    /// Date of the most recent attempt, successful or not.
    pub attempted: Option<NaiveDate>,

    /// Date of the most recent successful harvest.
    pub harvested: Option<NaiveDate>,
}

impl EndpointState {
    fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            blocked: false,
            incremental: true,
            retry: false,
            attempted: None,
            harvested: None,
        }
    }

    /// Whether harvesting this endpoint is blocked.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Whether incremental harvesting is permitted right now: it must be
    /// allowed, a previous success must exist, and no retry may be pending.
    #[must_use]
    pub fn allows_incremental(&self) -> bool {
        self.incremental && self.harvested.is_some() && !self.retry
    }

    /// Whether the previous harvest must be redone.
    #[must_use]
    pub fn needs_retry(&self) -> bool {
        self.retry
    }

    /// Date of the most recent successful harvest, if any.
    #[must_use]
    pub fn last_successful_date(&self) -> Option<NaiveDate> {
        self.harvested
    }

    /// Register the outcome of a harvest attempt.
    ///
    /// The attempt date is always stamped; the success date only advances
    /// on success and never regresses on failure.
    pub fn record_attempt(&mut self, success: bool) {
        self.record_attempt_on(chrono::Local::now().date_naive(), success);
    }

    fn record_attempt_on(&mut self, date: NaiveDate, success: bool) {
        self.attempted = Some(date);
        if success {
            self.harvested = Some(date);
        }
    }
}

/// What the overview decides for one endpoint in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestDecision {
    /// Do not harvest this endpoint in this run.
    Skip,

    /// Harvest everything.
    Full,

    /// Harvest records changed on or after the given date.
    Incremental {
        /// Date of the previous successful harvest.
        from: NaiveDate,
    },
}

/// Decide how an endpoint should be harvested under the given run mode.
///
/// An endpoint that has never been harvested successfully is always a full
/// harvest, never incremental.
#[must_use]
pub fn decide(mode: RunMode, state: &EndpointState) -> HarvestDecision {
    if state.is_blocked() {
        return HarvestDecision::Skip;
    }
    match mode {
        RunMode::Refresh => HarvestDecision::Full,
        RunMode::Retry => {
            if state.needs_retry() {
                HarvestDecision::Full
            } else {
                HarvestDecision::Skip
            }
        }
        RunMode::Normal => match (state.allows_incremental(), state.last_successful_date()) {
            (true, Some(from)) => HarvestDecision::Incremental { from },
            _ => HarvestDecision::Full,
        },
    }
}

/// Working copy of the persisted overview store.
#[derive(Debug)]
pub struct Overview {
    path: PathBuf,
    mode: RunMode,
    endpoints: Vec<EndpointState>,
}

impl Overview {
    /// Open the overview, reading the store once.
    ///
    /// A missing file yields an empty overview in `normal` mode; an
    /// unreadable or malformed file is a persistence error, fatal to the
    /// run.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                mode: RunMode::Normal,
                endpoints: Vec::new(),
            });
        }
        let text = fs::read_to_string(&path).map_err(|e| HarvesterError::Persistence {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_xml(path, &text)
    }

    /// The global run mode.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// All endpoint states, in store order.
    #[must_use]
    pub fn endpoints(&self) -> &[EndpointState] {
        &self.endpoints
    }

    /// State for the given URI, materializing and storing a default entry
    /// on first encounter.
    pub fn endpoint_state(&mut self, uri: &str) -> &mut EndpointState {
        let pos = match self.endpoints.iter().position(|e| e.uri == uri) {
            Some(pos) => pos,
            None => {
                self.endpoints.push(EndpointState::new(uri));
                self.endpoints.len() - 1
            }
        };
        &mut self.endpoints[pos]
    }

    /// Close the overview, writing the store back exactly once.
    pub fn close(self) -> Result<()> {
        fs::write(&self.path, self.to_xml()).map_err(|e| HarvesterError::Persistence {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn from_xml(path: PathBuf, text: &str) -> Result<Self> {
        let persistence_error = |message: String| HarvesterError::Persistence {
            path: path.clone(),
            message,
        };

        let doc =
            Document::parse(text).map_err(|e| persistence_error(format!("malformed store: {e}")))?;
        let root = doc.root_element();
        if root.tag_name().name() != "harvesting" {
            return Err(persistence_error(format!(
                "unexpected root element <{}>",
                root.tag_name().name()
            )));
        }

        let mode = match root.attribute("mode") {
            None => RunMode::Normal,
            Some(value) => RunMode::parse(value)
                .ok_or_else(|| persistence_error(format!("unknown mode '{value}'")))?,
        };

        let mut endpoints = Vec::new();
        for node in find_children(root, "endpoint") {
            let uri = node
                .attribute("uri")
                .ok_or_else(|| persistence_error("endpoint element without uri".to_string()))?;

            let parse_bool = |name: &str, default: bool| -> Result<bool> {
                match node.attribute(name) {
                    None => Ok(default),
                    Some("true") => Ok(true),
                    Some("false") => Ok(false),
                    Some(other) => Err(persistence_error(format!(
                        "invalid boolean '{other}' in attribute {name} of {uri}"
                    ))),
                }
            };
            let parse_date = |name: &str| -> Result<Option<NaiveDate>> {
                match node.attribute(name) {
                    None => Ok(None),
                    Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                        .map(Some)
                        .map_err(|_| {
                            persistence_error(format!(
                                "invalid date '{value}' in attribute {name} of {uri}"
                            ))
                        }),
                }
            };

            endpoints.push(EndpointState {
                uri: uri.to_string(),
                blocked: parse_bool("blocked", false)?,
                incremental: parse_bool("incremental", true)?,
                retry: parse_bool("retry", false)?,
                attempted: parse_date("attempted")?,
                harvested: parse_date("harvested")?,
            });
        }

        Ok(Self {
            path,
            mode,
            endpoints,
        })
    }

    fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!("<harvesting mode=\"{}\">\n", self.mode.as_str()));
        for e in &self.endpoints {
            out.push_str(&format!(
                "  <endpoint uri=\"{}\" blocked=\"{}\" incremental=\"{}\" retry=\"{}\"",
                escape_attribute(&e.uri),
                e.blocked,
                e.incremental,
                e.retry
            ));
            if let Some(date) = e.attempted {
                out.push_str(&format!(" attempted=\"{}\"", date.format("%Y-%m-%d")));
            }
            if let Some(date) = e.harvested {
                out.push_str(&format!(" harvested=\"{}\"", date.format("%Y-%m-%d")));
            }
            out.push_str("/>\n");
        }
        out.push_str("</harvesting>\n");
        out
    }
}
