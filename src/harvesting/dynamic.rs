//! List harvesting against a live, paginated endpoint.

use chrono::NaiveDate;
use reqwest::blocking::Client;

use crate::config::list_records_url;
use crate::error::{HarvesterError, Result};
use crate::http::download_text;
use crate::oai;
use crate::types::{HarvestRecord, Target};

use super::{ListHarvesting, ListSource, ListState};

/// [`ListSource`] over a blocking HTTP client.
pub struct HttpSource {
    client: Client,
    base: String,
}

impl HttpSource {
    /// Create a source for the given endpoint base URI.
    #[must_use]
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }
}

impl ListSource for HttpSource {
    fn list_records(
        &self,
        prefix: &str,
        set: Option<&str>,
        from: Option<&str>,
        token: Option<&str>,
    ) -> Result<String> {
        let url = list_records_url(&self.base, prefix, set, from, token);
        tracing::debug!(%url, "Requesting record listing");
        download_text(&self.client, &url)
    }
}

/// Harvesting state machine for a paginated live endpoint.
///
/// Pages are retained for the whole endpoint run: targets accumulate across
/// pages and prefixes before any of them is parsed, and each target's record
/// is looked up in the page of the prefix cycle that produced it.
pub struct RecordListHarvesting<S: ListSource> {
    source: S,
    endpoint_uri: String,
    from: Option<String>,
    state: ListState,
    /// (prefix, page body) per fetched page, in fetch order.
    pages: Vec<(String, String)>,
    /// Continuation token armed by `request_more` for the next `request`.
    token: Option<String>,
}

impl<S: ListSource> RecordListHarvesting<S> {
    /// Associate a source with the endpoint's declared prefixes and sets.
    ///
    /// `from` restricts the listing to records changed on or after that
    /// date (incremental harvesting).
    pub fn new(
        source: S,
        endpoint_uri: impl Into<String>,
        prefixes: Vec<String>,
        sets: Vec<String>,
        from: Option<NaiveDate>,
    ) -> Self {
        Self {
            source,
            endpoint_uri: endpoint_uri.into(),
            from: from.map(|d| d.format("%Y-%m-%d").to_string()),
            state: ListState::new(prefixes, sets),
            pages: Vec::new(),
            token: None,
        }
    }

    fn last_page(&self) -> Result<&str> {
        self.pages
            .last()
            .map(|(_, body)| body.as_str())
            .ok_or_else(|| HarvesterError::Protocol("no response to process".to_string()))
    }
}

impl<S: ListSource> ListHarvesting for RecordListHarvesting<S> {
    fn request(&mut self) -> Result<()> {
        let prefix = self.state.current_prefix()?.to_string();
        let set = self.state.current_set()?.map(str::to_string);

        let page = self.source.list_records(
            &prefix,
            set.as_deref(),
            self.from.as_deref(),
            self.token.as_deref(),
        )?;
        if page.trim().is_empty() {
            return Err(HarvesterError::Protocol(format!(
                "empty response from {}",
                self.endpoint_uri
            )));
        }
        self.pages.push((prefix, page));
        Ok(())
    }

    fn process_response(&mut self) -> Result<()> {
        if !self.state.has_prefixes() {
            return Err(HarvesterError::Configuration(self.endpoint_uri.clone()));
        }
        let prefix = self.state.current_prefix()?.to_string();
        let headers = oai::parse_headers(self.last_page()?)?;

        let mut inserted = 0;
        for header in headers {
            if header.deleted {
                continue;
            }
            self.state.insert_target(Target::new(header.identifier, &prefix));
            inserted += 1;
        }
        tracing::debug!(prefix = %prefix, count = inserted, "Processed header listing");
        Ok(())
    }

    fn request_more(&mut self) -> bool {
        let Ok(page) = self.last_page() else {
            return false;
        };
        match oai::resumption_token(page) {
            Ok(Some(token)) => {
                self.token = Some(token);
                true
            }
            Ok(None) => {
                self.token = None;
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read resumption token, closing list");
                self.token = None;
                false
            }
        }
    }

    fn parse_response(&mut self) -> Result<HarvestRecord> {
        let target = self.state.next_target()?;

        // Newest pages first: resumed pages of the same prefix supersede
        // earlier ones when an identifier appears twice.
        for (prefix, body) in self.pages.iter().rev() {
            if *prefix != target.prefix {
                continue;
            }
            if let Some(raw) = oai::record_in_page(body, &target.identifier)? {
                return Ok(HarvestRecord::new(
                    target.identifier,
                    raw,
                    self.endpoint_uri.clone(),
                ));
            }
        }

        Err(HarvesterError::Parse(format!(
            "no record matches ({}, {}) in any retained page",
            target.identifier, target.prefix
        )))
    }

    fn next_cycle(&mut self) -> bool {
        // A continuation token never crosses a prefix/set boundary.
        self.token = None;
        self.state.advance_cycle()
    }

    fn targets_remaining(&self) -> usize {
        self.state.targets_remaining()
    }

    fn endpoint_uri(&self) -> &str {
        &self.endpoint_uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Source returning canned pages and recording every call.
    struct ScriptedSource {
        pages: RefCell<Vec<String>>,
        calls: RefCell<Vec<Option<String>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<&str>) -> Self {
            Self {
                pages: RefCell::new(pages.into_iter().rev().map(String::from).collect()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn tokens_seen(&self) -> Vec<Option<String>> {
            self.calls.borrow().clone()
        }
    }

    impl ListSource for ScriptedSource {
        fn list_records(
            &self,
            _prefix: &str,
            _set: Option<&str>,
            _from: Option<&str>,
            token: Option<&str>,
        ) -> Result<String> {
            self.calls.borrow_mut().push(token.map(String::from));
            self.pages
                .borrow_mut()
                .pop()
                .ok_or_else(|| HarvesterError::Protocol("no more pages scripted".to_string()))
        }
    }

    fn page(records: &[(&str, bool)], token: Option<&str>) -> String {
        let mut xml = String::from("<OAI-PMH><ListRecords>");
        for (id, deleted) in records {
            let status = if *deleted { " status=\"deleted\"" } else { "" };
            xml.push_str(&format!(
                "<record><header{status}><identifier>{id}</identifier></header>\
                 <metadata><dc><title>{id}</title></dc></metadata></record>"
            ));
        }
        if let Some(t) = token {
            xml.push_str(&format!("<resumptionToken>{t}</resumptionToken>"));
        }
        xml.push_str("</ListRecords></OAI-PMH>");
        xml
    }

    fn harvesting(pages: Vec<&str>, prefixes: Vec<&str>) -> RecordListHarvesting<ScriptedSource> {
        RecordListHarvesting::new(
            ScriptedSource::new(pages),
            "https://x.org/oai",
            prefixes.into_iter().map(String::from).collect(),
            Vec::new(),
            None,
        )
    }

    #[test]
    fn test_resumption_token_drives_pagination() {
        let p1 = page(&[("oai:x:2", false)], Some("T1"));
        let p2 = page(&[("oai:x:1", false)], None);
        let mut h = harvesting(vec![&p1, &p2], vec!["cmdi"]);

        h.request().unwrap();
        h.process_response().unwrap();
        assert!(h.request_more(), "first page carries token T1");

        h.request().unwrap();
        h.process_response().unwrap();
        assert!(!h.request_more(), "second page closes the list");

        // The second request presented T1, the first none.
        assert_eq!(
            h.source.tokens_seen(),
            vec![None, Some("T1".to_string())]
        );
        assert_eq!(h.targets_remaining(), 2);
    }

    #[test]
    fn test_records_surface_in_target_order_across_pages() {
        // Page order is descending by identifier; output must be ascending.
        let p1 = page(&[("oai:x:2", false)], Some("T1"));
        let p2 = page(&[("oai:x:1", false)], None);
        let mut h = harvesting(vec![&p1, &p2], vec!["cmdi"]);

        h.request().unwrap();
        h.process_response().unwrap();
        assert!(h.request_more());
        h.request().unwrap();
        h.process_response().unwrap();
        assert!(!h.request_more());
        assert!(!h.next_cycle());

        let first = h.parse_response().unwrap();
        let second = h.parse_response().unwrap();
        assert_eq!(first.identifier, "oai:x:1");
        assert_eq!(second.identifier, "oai:x:2");
        assert!(second.raw_xml.contains("<title>oai:x:2</title>"));

        let err = h.parse_response().unwrap_err();
        assert!(matches!(err, HarvesterError::Protocol(_)));
    }

    #[test]
    fn test_deleted_headers_never_become_targets() {
        let p = page(&[("oai:x:1", false), ("oai:x:2", true)], None);
        let mut h = harvesting(vec![&p], vec!["cmdi"]);

        h.request().unwrap();
        h.process_response().unwrap();
        assert_eq!(h.targets_remaining(), 1);
    }

    #[test]
    fn test_reprocessing_a_page_is_idempotent() {
        let p = page(&[("oai:x:1", false)], None);
        let mut h = harvesting(vec![&p], vec!["cmdi"]);

        h.request().unwrap();
        h.process_response().unwrap();
        h.process_response().unwrap();
        assert_eq!(h.targets_remaining(), 1);
    }

    #[test]
    fn test_request_without_prefixes_is_protocol_error() {
        let mut h = harvesting(vec![], vec![]);
        let err = h.request().unwrap_err();
        assert!(matches!(err, HarvesterError::Protocol(_)));
    }

    #[test]
    fn test_process_without_prefixes_is_configuration_error() {
        let mut h = harvesting(vec![], vec![]);
        let err = h.process_response().unwrap_err();
        assert!(matches!(err, HarvesterError::Configuration(_)));
    }
}
