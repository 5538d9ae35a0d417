use httpmock::prelude::*;
use knotbus::app::knots::SERVICE_KNOT_NAME;
use knotbus::{
    create_proxy, deploy, ClientRequest, Document, EventBus, Fragment, KnotProxy, ServiceKnot,
};
use serde_json::json;

fn service_config(server: &MockServer) -> serde_json::Value {
    json!({
        "address": "knot.service",
        "services": [
            {"path": "/service/.*", "domain": server.host(), "port": server.port()}
        ],
        "client_timeout_ms": 2000
    })
}

#[tokio::test]
async fn test_shared_service_uri_is_fetched_once() {
    let server = MockServer::start();
    let news_mock = server.mock(|when, then| {
        when.method(GET).path("/service/news.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"title": "Knot released", "items": [1, 2, 3]}));
    });

    let bus = EventBus::new();
    let handle = deploy(&bus, ServiceKnot::new(), &service_config(&server)).unwrap();
    let proxy = create_proxy(&bus, "knot.service");

    let document = Document::new(ClientRequest::get("/index.html")).with_fragments(vec![
        Fragment::raw("<body>"),
        Fragment::new(["services"], "<div>{{news.title}}</div>")
            .with_attribute("data-service-news", "/service/news.json"),
        Fragment::new(["services"], "<aside>{{latest.items}}</aside>")
            .with_attribute("data-service-latest", "/service/news.json"),
        Fragment::raw("</body>"),
    ]);

    let reply = proxy.process(document.clone()).await.unwrap();

    news_mock.assert_hits(1);
    assert!(!reply.is_failed());

    let fragments = reply.fragments().unwrap();
    assert_eq!(fragments[0], document.fragments().unwrap()[0]);
    assert_eq!(fragments[3], document.fragments().unwrap()[3]);
    assert_eq!(fragments[1].context["news"]["title"], "Knot released");
    assert_eq!(fragments[2].context["latest"]["items"], json!([1, 2, 3]));

    handle.stop().await;
}

#[tokio::test]
async fn test_failing_service_is_reported_in_document() {
    let server = MockServer::start();
    let weather_mock = server.mock(|when, then| {
        when.method(GET).path("/service/weather.json");
        then.status(503);
    });
    let news_mock = server.mock(|when, then| {
        when.method(GET).path("/service/news.json");
        then.status(200).json_body(json!({"title": "Still here"}));
    });

    let bus = EventBus::new();
    let handle = deploy(&bus, ServiceKnot::new(), &service_config(&server)).unwrap();
    let proxy = create_proxy(&bus, "knot.service");

    let document = Document::new(ClientRequest::get("/index.html")).with_fragments(vec![
        Fragment::new(["services"], "<div></div>")
            .with_attribute("data-service-weather", "/service/weather.json")
            .with_attribute("data-service-news", "/service/news.json"),
    ]);

    let reply = proxy.process(document).await.unwrap();

    weather_mock.assert();
    news_mock.assert();

    let error = reply.error.as_ref().unwrap();
    assert_eq!(error.source, SERVICE_KNOT_NAME);
    assert_eq!(
        error.message,
        "Service /service/weather.json responded with status 503"
    );
    let context = &reply.fragments().unwrap()[0].context;
    assert_eq!(context["news"]["title"], "Still here");
    assert!(!context.contains_key("weather"));

    handle.stop().await;
}

#[tokio::test]
async fn test_non_json_service_body_is_recovered_by_process_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/service/page.html");
        then.status(200).body("<html>not json</html>");
    });

    let bus = EventBus::new();
    let handle = deploy(&bus, ServiceKnot::new(), &service_config(&server)).unwrap();
    let proxy = create_proxy(&bus, "knot.service");

    let document = Document::new(ClientRequest::get("/index.html")).with_fragments(vec![
        Fragment::new(["services"], "<div></div>")
            .with_attribute("data-service-page", "/service/page.html"),
    ]);

    let reply = proxy.process(document.clone()).await.unwrap();

    assert_eq!(reply.client_response.status_code, Some(500));
    assert_eq!(reply.error.as_ref().unwrap().source, SERVICE_KNOT_NAME);
    assert_eq!(reply.fragments(), document.fragments());

    handle.stop().await;
}

#[tokio::test]
async fn test_document_without_service_fragments_is_untouched() {
    let server = MockServer::start();
    let bus = EventBus::new();
    let handle = deploy(&bus, ServiceKnot::new(), &service_config(&server)).unwrap();
    let proxy = create_proxy(&bus, "knot.service");

    let document = Document::new(ClientRequest::get("/static.html"))
        .with_fragments(vec![Fragment::new(["templating"], "<p>static</p>")]);

    let reply = proxy.process(document.clone()).await.unwrap();

    assert_eq!(reply, document);
    handle.stop().await;
}
