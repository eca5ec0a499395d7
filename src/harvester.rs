//! Main harvesting service: drives the list-harvesting cycle for one
//! endpoint and hands each materialized record to a consumer.

use chrono::NaiveDate;
use reqwest::blocking::Client;

use crate::config::{list_formats_url, validate_endpoint_url};
use crate::error::{HarvesterError, Result};
use crate::harvesting::{
    HttpSource, ListHarvesting, RecordListHarvesting, StaticListHarvesting,
};
use crate::http::download_text;
use crate::oai;
use crate::types::{EndpointConfig, EndpointKind, HarvestRecord};

/// Consumer invoked once per harvested record.
pub type RecordConsumer<'a> = dyn FnMut(HarvestRecord) -> Result<()> + 'a;

/// Run the full harvesting cycle of one list-harvesting instance.
///
/// For every prefix/set cycle: request the listing, process its headers,
/// and follow continuation tokens until the list is exhausted. Recoverable
/// failures (malformed listings, missing catalog sections) are logged and
/// the loop moves on to the next cycle; protocol and transport failures
/// abort the attempt. Once all cycles are done, targets are drained in
/// sort order and each record goes to the consumer.
///
/// Returns the number of records handed to the consumer.
pub fn harvest_records<H: ListHarvesting>(
    harvesting: &mut H,
    consumer: &mut RecordConsumer<'_>,
) -> Result<usize> {
    let uri = harvesting.endpoint_uri().to_string();

    loop {
        harvesting.request()?;
        match harvesting.process_response() {
            Ok(()) => {
                while harvesting.request_more() {
                    harvesting.request()?;
                    if let Err(e) = harvesting.process_response() {
                        if !e.is_recoverable() {
                            return Err(e);
                        }
                        tracing::warn!(endpoint = %uri, error = %e, "Skipping rest of cycle");
                        break;
                    }
                }
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(endpoint = %uri, error = %e, "Skipping prefix/set cycle");
            }
            Err(e) => return Err(e),
        }
        if !harvesting.next_cycle() {
            break;
        }
    }

    let mut produced = 0;
    while harvesting.targets_remaining() > 0 {
        match harvesting.parse_response() {
            Ok(record) => {
                consumer(record)?;
                produced += 1;
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(endpoint = %uri, error = %e, "Skipping target");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(endpoint = %uri, records = produced, "Harvest cycle complete");
    Ok(produced)
}

/// Fetch the metadata prefixes a live endpoint advertises.
pub fn discover_prefixes(client: &Client, base: &str) -> Result<Vec<String>> {
    let xml = download_text(client, &list_formats_url(base))?;
    Ok(oai::parse_formats(&xml)?
        .into_iter()
        .map(|f| f.prefix)
        .collect())
}

/// Harvest one endpoint, dynamic or static.
///
/// Prefixes not declared in the configuration are discovered from the
/// endpoint's format listing. An endpoint that ends up with no prefixes at
/// all logs the configuration error and yields zero records instead of
/// failing the run. `from` requests an incremental harvest (dynamic only;
/// a static catalog is always complete).
pub fn harvest_endpoint(
    client: &Client,
    endpoint: &EndpointConfig,
    from: Option<NaiveDate>,
    consumer: &mut RecordConsumer<'_>,
) -> Result<usize> {
    validate_endpoint_url(&endpoint.uri)?;

    match endpoint.kind {
        EndpointKind::Dynamic => {
            let prefixes = if endpoint.prefixes.is_empty() {
                discover_prefixes(client, &endpoint.uri)?
            } else {
                endpoint.prefixes.clone()
            };
            if prefixes.is_empty() {
                let e = HarvesterError::Configuration(endpoint.uri.clone());
                tracing::error!(error = %e, "Skipping endpoint");
                return Ok(0);
            }

            let source = HttpSource::new(client.clone(), endpoint.uri.clone());
            let mut harvesting = RecordListHarvesting::new(
                source,
                endpoint.uri.clone(),
                prefixes,
                endpoint.sets.clone(),
                from,
            );
            harvest_records(&mut harvesting, consumer)
        }
        EndpointKind::Static => {
            let catalog = download_text(client, &endpoint.uri)?;
            let prefixes = if endpoint.prefixes.is_empty() {
                oai::parse_formats(&catalog)?
                    .into_iter()
                    .map(|f| f.prefix)
                    .collect()
            } else {
                endpoint.prefixes.clone()
            };
            if prefixes.is_empty() {
                let e = HarvesterError::Configuration(endpoint.uri.clone());
                tracing::error!(error = %e, "Skipping endpoint");
                return Ok(0);
            }

            let mut harvesting =
                StaticListHarvesting::new(endpoint.uri.clone(), catalog, prefixes);
            harvest_records(&mut harvesting, consumer)
        }
    }
}
