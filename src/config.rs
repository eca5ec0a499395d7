//! Configuration constants, validation, and OAI-PMH request URL builders.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HarvesterError, Result};
use crate::types::EndpointConfig;

/// HTTP timeout in seconds.
///
/// Set to 60 seconds: endpoints can take a while to assemble large pages.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// Default path of the persisted harvest overview.
pub const DEFAULT_OVERVIEW_PATH: &str = "overview.xml";

/// Default directory harvested records are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "records";

/// Endpoint URL pattern: http or https scheme with a non-empty host.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ENDPOINT_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("valid regex"));

/// Date pattern: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Harvest configuration file: a list of endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Endpoints to harvest, in order.
    pub endpoints: Vec<EndpointConfig>,
}

impl HarvestConfig {
    /// Parse a harvest configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        for endpoint in &config.endpoints {
            validate_endpoint_url(&endpoint.uri)?;
        }
        Ok(config)
    }
}

/// Validate an endpoint URL.
///
/// # Examples
/// ```
/// use oai_harvester::config::validate_endpoint_url;
///
/// assert!(validate_endpoint_url("https://archive.example.org/oai").is_ok());
/// assert!(validate_endpoint_url("ftp://archive.example.org").is_err());
/// ```
pub fn validate_endpoint_url(url: &str) -> Result<()> {
    if ENDPOINT_URL_PATTERN.is_match(url) {
        Ok(())
    } else {
        Err(HarvesterError::InvalidEndpointUrl(url.to_string()))
    }
}

/// Validate a date string (YYYY-MM-DD, must be a real calendar date).
///
/// # Examples
/// ```
/// use oai_harvester::config::validate_date;
///
/// assert!(validate_date("2026-01-01").is_ok());
/// assert!(validate_date("2026-13-01").is_err());
/// ```
pub fn validate_date(date_str: &str) -> Result<()> {
    parse_date(date_str).map(|_| ())
}

/// Parse a date string (YYYY-MM-DD) into a calendar date.
pub fn parse_date(date_str: &str) -> Result<chrono::NaiveDate> {
    if !DATE_PATTERN.is_match(date_str) {
        return Err(HarvesterError::InvalidDate(date_str.to_string()));
    }

    chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| HarvesterError::InvalidDate(date_str.to_string()))
}

/// Percent-encode a query argument value.
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Build a `ListRecords` request URL.
///
/// When a resumption token is present it is the only argument besides the
/// verb; the protocol forbids combining it with prefix, set, or date.
///
/// # Arguments
/// * `base` - Endpoint base URI
/// * `prefix` - Metadata prefix to list records in
/// * `set` - Optional set to restrict the listing to
/// * `from` - Optional start date for incremental harvesting
/// * `token` - Optional resumption token from the previous page
pub fn list_records_url(
    base: &str,
    prefix: &str,
    set: Option<&str>,
    from: Option<&str>,
    token: Option<&str>,
) -> String {
    if let Some(token) = token {
        return format!(
            "{base}?verb=ListRecords&resumptionToken={}",
            encode_query_value(token)
        );
    }

    let mut url = format!(
        "{base}?verb=ListRecords&metadataPrefix={}",
        encode_query_value(prefix)
    );
    if let Some(set) = set {
        url.push_str("&set=");
        url.push_str(&encode_query_value(set));
    }
    if let Some(from) = from {
        url.push_str("&from=");
        url.push_str(&encode_query_value(from));
    }
    url
}

/// Build a `ListMetadataFormats` request URL.
pub fn list_formats_url(base: &str) -> String {
    format!("{base}?verb=ListMetadataFormats")
}

/// Turn a record identifier into a safe file name.
///
/// # Examples
/// ```
/// use oai_harvester::config::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("oai:archive.example.org:1042"),
///            "oai_archive.example.org_1042");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
