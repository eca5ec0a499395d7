//! OAI-PMH response parsing.
//!
//! Works on two document shapes: live `ListRecords` pages (one page per
//! request, with an optional resumption token) and static-repository
//! catalogs, where one document carries a `ListRecords` section per
//! metadata prefix.

use roxmltree::Document;

use crate::error::{HarvesterError, Result};
use crate::types::MetadataFormat;
use crate::xml::{descendants_named, find_by_path, find_child, raw_slice, tag_name, text_of};

/// One `<header>` entry from a record listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// OAI record identifier.
    pub identifier: String,

    /// Whether the header carries `status="deleted"`.
    pub deleted: bool,
}

/// Fail with the endpoint's own error report, if the response carries one.
///
/// Protocol-level errors (`badArgument`, `noRecordsMatch`, ...) arrive as an
/// `<error>` element instead of the requested listing.
fn check_protocol_error(doc: &Document<'_>) -> Result<()> {
    // Only a direct child of the root counts: record payloads may carry
    // their own <error> elements.
    if let Some(error) = find_child(doc.root_element(), "error") {
        let code = error.attribute("code").unwrap_or("unknown");
        return Err(HarvesterError::Parse(format!(
            "endpoint reported {code}: {}",
            text_of(error)
        )));
    }
    Ok(())
}

/// Extract all record headers from a `ListRecords` page.
///
/// Headers without an identifier are dropped with a warning; the deleted
/// flag is taken from the `status` attribute.
pub fn parse_headers(page: &str) -> Result<Vec<RecordHeader>> {
    let doc = Document::parse(page)?;
    check_protocol_error(&doc)?;
    Ok(collect_headers(doc.root_element()))
}

fn collect_headers(scope: roxmltree::Node<'_, '_>) -> Vec<RecordHeader> {
    let mut headers = Vec::new();
    for header in descendants_named(scope, "header") {
        let identifier = find_child(header, "identifier")
            .map(text_of)
            .unwrap_or_default();
        if identifier.is_empty() {
            tracing::warn!("Skipping header without identifier");
            continue;
        }
        headers.push(RecordHeader {
            identifier,
            deleted: header.attribute("status") == Some("deleted"),
        });
    }
    headers
}

/// Extract the resumption token from a `ListRecords` page.
///
/// An empty or whitespace-only token element closes the list, the same as
/// no token element at all.
pub fn resumption_token(page: &str) -> Result<Option<String>> {
    let doc = Document::parse(page)?;
    let token = descendants_named(doc.root_element(), "resumptionToken")
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());
    Ok(token)
}

/// Parse a `ListMetadataFormats` response (or the matching section of a
/// static catalog) into the advertised formats.
pub fn parse_formats(xml: &str) -> Result<Vec<MetadataFormat>> {
    let doc = Document::parse(xml)?;
    check_protocol_error(&doc)?;

    let mut formats = Vec::new();
    for node in descendants_named(doc.root_element(), "metadataFormat") {
        let prefix = find_child(node, "metadataPrefix")
            .map(text_of)
            .unwrap_or_default();
        if prefix.is_empty() {
            continue;
        }
        formats.push(MetadataFormat {
            prefix,
            namespace: find_child(node, "metadataNamespace")
                .map(text_of)
                .unwrap_or_default(),
            schema_location: find_child(node, "schema").map(text_of).unwrap_or_default(),
        });
    }
    Ok(formats)
}

/// Extract the headers of a static catalog's `ListRecords` section for one
/// metadata prefix.
///
/// A catalog that has no section for the prefix is a parse failure; the
/// caller moves on to the next declared prefix.
pub fn catalog_headers(catalog: &str, prefix: &str) -> Result<Vec<RecordHeader>> {
    let doc = Document::parse(catalog)?;
    let section = catalog_section(&doc, prefix).ok_or_else(|| {
        HarvesterError::Parse(format!("catalog has no ListRecords section for prefix '{prefix}'"))
    })?;
    Ok(collect_headers(section))
}

/// Look a record up in a live page by identifier.
///
/// Returns the raw XML of the matching `<record>` subtree.
pub fn record_in_page(page: &str, identifier: &str) -> Result<Option<String>> {
    let doc = Document::parse(page)?;
    Ok(find_record(doc.root_element(), identifier).map(|n| raw_slice(page, n).to_string()))
}

/// Look a record up in a static catalog by `(prefix, identifier)`.
///
/// The lookup is scoped to the catalog's `ListRecords` section for the
/// prefix, so the same identifier can resolve to a different subtree per
/// prefix.
pub fn record_in_catalog(catalog: &str, prefix: &str, identifier: &str) -> Result<Option<String>> {
    let doc = Document::parse(catalog)?;
    let Some(section) = catalog_section(&doc, prefix) else {
        return Ok(None);
    };
    Ok(find_record(section, identifier).map(|n| raw_slice(catalog, n).to_string()))
}

fn catalog_section<'a, 'input>(
    doc: &'a Document<'input>,
    prefix: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    descendants_named(doc.root_element(), "ListRecords")
        .find(|n| n.attribute("metadataPrefix") == Some(prefix))
}

fn find_record<'a, 'input>(
    scope: roxmltree::Node<'a, 'input>,
    identifier: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    scope
        .descendants()
        .filter(|n| n.is_element() && tag_name(*n) == "record")
        .find(|record| {
            find_by_path(*record, "header/identifier")
                .map(|id| text_of(id) == identifier)
                .unwrap_or(false)
        })
}
