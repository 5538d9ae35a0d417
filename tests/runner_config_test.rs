use httpmock::prelude::*;
use knotbus::utils::validation::Validate;
use knotbus::{ClientRequest, Document, Fragment, KnotError, KnotRunner, RunnerConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn runner_toml(server: &MockServer, chain: &str) -> String {
    format!(
        r#"
[bus]
request_timeout_ms = 5000
queue_capacity = 16

[[knots]]
kind = "service"
instances = 2

[knots.config]
address = "knot.service"
client_timeout_ms = 2000

[[knots.config.services]]
path = "/api/.*"
domain = "{}"
port = {}

[chain]
addresses = [{}]
"#,
        server.host(),
        server.port(),
        chain
    )
}

#[tokio::test]
async fn test_runner_from_file_enriches_document() -> anyhow::Result<()> {
    let server = MockServer::start();
    let user_mock = server.mock(|when, then| {
        when.method(GET).path("/api/user.json");
        then.status(200).json_body(serde_json::json!({"name": "Ada"}));
    });

    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(runner_toml(&server, r#""knot.service""#).as_bytes())?;

    let config = RunnerConfig::from_file(temp_file.path())?;
    tokio_test::assert_ok!(config.validate());

    let runner = KnotRunner::start(&config)?;
    assert_eq!(runner.bus().consumer_count("knot.service"), 2);

    let document = Document::new(ClientRequest::get("/profile.html")).with_fragments(vec![
        Fragment::new(["services"], "<span>{{user.name}}</span>")
            .with_attribute("data-service-user", "/api/user.json"),
    ]);
    let reply = runner.run(document).await?;

    user_mock.assert();
    assert_eq!(reply.fragments().unwrap()[0].context["user"]["name"], "Ada");

    runner.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_same_knot_twice_in_chain_reuses_address() {
    let server = MockServer::start();
    let user_mock = server.mock(|when, then| {
        when.method(GET).path("/api/user.json");
        then.status(200).json_body(serde_json::json!({"name": "Ada"}));
    });

    let config =
        RunnerConfig::from_toml_str(&runner_toml(&server, r#""knot.service", "knot.service""#))
            .unwrap();
    let runner = KnotRunner::start(&config).unwrap();

    let document = Document::new(ClientRequest::get("/profile.html")).with_fragments(vec![
        Fragment::new(["services"], "<span></span>")
            .with_attribute("data-service-user", "/api/user.json"),
    ]);
    let reply = runner.run(document).await.unwrap();

    user_mock.assert_hits(2);
    assert!(!reply.is_failed());

    runner.shutdown().await;
}

#[test]
fn test_chain_without_deployed_knot_is_config_error() {
    let server = MockServer::start();
    let config = RunnerConfig::from_toml_str(&runner_toml(&server, r#""knot.other""#)).unwrap();

    let err = tokio_test::assert_err!(KnotRunner::start(&config).map(|_| ()));
    assert!(matches!(err, KnotError::InvalidConfigValueError { .. }));
}
