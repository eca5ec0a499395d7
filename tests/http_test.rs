//! HTTP layer tests against a local mock server.
//!
//! The client is blocking, so calls run inside `spawn_blocking` while the
//! mock server lives on the test runtime.

use oai_harvester::http::{create_client, download_text};
use oai_harvester::types::{EndpointConfig, EndpointKind};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn download_text_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<OAI-PMH/>"))
        .mount(&server)
        .await;

    let url = format!("{}/oai", server.uri());
    let body = tokio::task::spawn_blocking(move || {
        let client = create_client()?;
        download_text(&client, &url)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(body, "<OAI-PMH/>");
}

#[tokio::test(flavor = "multi_thread")]
async fn download_text_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&server)
        .await;

    let url = format!("{}/oai", server.uri());
    let body = tokio::task::spawn_blocking(move || {
        let client = create_client()?;
        download_text(&client, &url)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(body, "recovered");
}

#[tokio::test(flavor = "multi_thread")]
async fn download_text_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/oai", server.uri());
    let result = tokio::task::spawn_blocking(move || {
        let client = create_client()?;
        download_text(&client, &url)
    })
    .await
    .unwrap();

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn dynamic_endpoint_harvests_over_http_with_pagination() {
    let server = MockServer::start().await;

    let page1 = r#"<OAI-PMH><ListRecords>
        <record><header><identifier>oai:x:2</identifier></header>
        <metadata><dc/></metadata></record>
        <resumptionToken>T1</resumptionToken>
      </ListRecords></OAI-PMH>"#;
    let page2 = r#"<OAI-PMH><ListRecords>
        <record><header><identifier>oai:x:1</identifier></header>
        <metadata><dc/></metadata></record>
      </ListRecords></OAI-PMH>"#;

    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListRecords"))
        .and(query_param("metadataPrefix", "oai_dc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListRecords"))
        .and(query_param("resumptionToken", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page2))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = EndpointConfig {
        uri: format!("{}/oai", server.uri()),
        kind: EndpointKind::Dynamic,
        prefixes: vec!["oai_dc".to_string()],
        sets: Vec::new(),
    };

    let identifiers = tokio::task::spawn_blocking(move || {
        let client = create_client()?;
        let mut seen = Vec::new();
        oai_harvester::harvest_endpoint(&client, &endpoint, None, &mut |record| {
            seen.push(record.identifier);
            Ok(())
        })?;
        Ok::<_, oai_harvester::HarvesterError>(seen)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(identifiers, vec!["oai:x:1", "oai:x:2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn endpoint_advertising_no_formats_yields_zero_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListMetadataFormats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<OAI-PMH><ListMetadataFormats/></OAI-PMH>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    // no prefixes declared and none advertised: the endpoint is skipped
    // without failing the run
    let endpoint = EndpointConfig {
        uri: format!("{}/oai", server.uri()),
        kind: EndpointKind::Dynamic,
        prefixes: Vec::new(),
        sets: Vec::new(),
    };

    let count = tokio::task::spawn_blocking(move || {
        let client = create_client()?;
        oai_harvester::harvest_endpoint(&client, &endpoint, None, &mut |_| Ok(()))
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn static_endpoint_fetches_catalog_once_and_discovers_prefixes() {
    let server = MockServer::start().await;

    let catalog = r#"<Repository>
        <ListMetadataFormats>
          <metadataFormat><metadataPrefix>cmdi</metadataPrefix></metadataFormat>
        </ListMetadataFormats>
        <ListRecords metadataPrefix="cmdi">
          <record><header><identifier>oai:x:1</identifier></header>
          <metadata><cmd/></metadata></record>
        </ListRecords>
      </Repository>"#;

    Mock::given(method("GET"))
        .and(path("/repository.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog))
        .expect(1)
        .mount(&server)
        .await;

    // no prefixes declared: they come from the catalog's format listing
    let endpoint = EndpointConfig {
        uri: format!("{}/repository.xml", server.uri()),
        kind: EndpointKind::Static,
        prefixes: Vec::new(),
        sets: Vec::new(),
    };

    let count = tokio::task::spawn_blocking(move || {
        let client = create_client()?;
        oai_harvester::harvest_endpoint(&client, &endpoint, None, &mut |_| Ok(()))
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(count, 1);
}
