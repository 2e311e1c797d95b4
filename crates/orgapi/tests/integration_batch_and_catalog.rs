//! Batch fetch and resource catalog dispatch, end to end

mod common;

use orgapi::batch::batch_fetch;
use orgapi::catalog::{EndpointSpec, ResourceCatalog};
use orgapi::validation::RequiredFields;
use orgapi::{ErrorKind, Outcome};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{ScriptedTransport, Step, client_builder, scripted_client};

fn members_catalog() -> ResourceCatalog {
    ResourceCatalog::new()
        .with_endpoint("members", "list", EndpointSpec::get("members"))
        .with_endpoint("members", "get", EndpointSpec::get("members/{id}"))
        .with_endpoint(
            "members",
            "create",
            EndpointSpec::post("members").with_request_schema(Arc::new(RequiredFields::new(["email"]))),
        )
        .with_endpoint("members", "remove", EndpointSpec::delete("teams/{team}/members/{id}"))
}

// ===== Batch =====

#[tokio::test]
async fn test_batch_get_returns_items_in_id_order() {
    let mock_server = MockServer::start().await;
    for id in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/acme/api/members/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id})))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = client_builder(mock_server.uri()).build().unwrap();
    let members = client
        .batch_get::<Value, _>("members", vec![3, 1, 2])
        .await
        .into_data()
        .unwrap();

    assert_eq!(
        members,
        vec![json!({"id": 3}), json!({"id": 1}), json!({"id": 2})]
    );
}

#[tokio::test]
async fn test_batch_get_aggregates_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/api/members/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/acme/api/members/2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri()).build().unwrap();
    let outcome = client.batch_get::<Value, _>("members", vec![1, 2]).await;

    assert!(outcome.data().is_none());
    let error = outcome.into_error().unwrap();
    assert!(matches!(error.kind(), ErrorKind::Aggregate { .. }));
    assert_eq!(error.children().len(), 1);
    assert_eq!(error.children()[0].kind(), &ErrorKind::NotFound);
    assert_eq!(error.status_code(), 404);
}

#[tokio::test]
async fn test_batch_get_encodes_ids() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/api/files/q3%20report%2Fdraft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri()).build().unwrap();
    let outcome = client.batch_get::<Value, _>("files", vec!["q3 report/draft"]).await;

    assert!(outcome.is_data());
}

#[tokio::test(start_paused = true)]
async fn test_batch_runs_in_waves() {
    let transport = ScriptedTransport::repeating(Step::json(200, json!({})))
        .with_latency(Duration::from_millis(100))
        .shared();
    let client = scripted_client(transport.clone(), |b| b.parallel_limit(5));

    let outcome = client.batch_get::<Value, _>("members", (0..7).collect()).await;

    assert_eq!(outcome.into_data().map(|items| items.len()), Some(7));
    assert_eq!(transport.in_flight_samples(), vec![1, 2, 3, 4, 5, 1, 2]);
    let gaps = transport.gaps();
    assert_eq!(gaps[4], Duration::from_millis(100));
    assert!(gaps[..4].iter().all(|gap| gap.is_zero()));
}

#[tokio::test]
async fn test_batch_fetch_over_client_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/api/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri()).build().unwrap();
    let outcome: Outcome<Vec<Vec<Value>>> = batch_fetch(
        vec!["eng", "ops"],
        |team| {
            let client = client.clone();
            async move { client.get("teams", Some(json!({"department": team}))).await }
        },
        2,
    )
    .await;

    assert_eq!(outcome.into_data(), Some(vec![vec![], vec![]]));
}

// ===== Catalog =====

#[tokio::test]
async fn test_call_renders_path_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/api/members/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri())
        .catalog(members_catalog())
        .build()
        .unwrap();
    let outcome = client.call("members", "get", Some(json!({"id": 42})), None).await;

    assert_eq!(outcome.into_data(), Some(json!({"id": 42})));
}

#[tokio::test]
async fn test_call_forwards_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/api/members"))
        .and(query_param("role", "owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri())
        .catalog(members_catalog())
        .build()
        .unwrap();
    let outcome = client
        .call_as::<Vec<Value>>("members", "list", None, Some(json!({"role": "owner"})))
        .await;

    assert_eq!(outcome.into_data().map(|items| items.len()), Some(1));
}

#[tokio::test]
async fn test_call_validates_request_body_before_sending() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri())
        .catalog(members_catalog())
        .validate_requests(true)
        .build()
        .unwrap();
    let error = client
        .call("members", "create", None, Some(json!({"name": "no email"})))
        .await
        .into_error()
        .unwrap();

    assert!(matches!(error.kind(), ErrorKind::SchemaValidation { .. }));
    assert_eq!(error.issues()[0].path, "email");
}

#[tokio::test]
async fn test_call_sends_valid_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acme/api/members"))
        .and(body_json(json!({"email": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri())
        .catalog(members_catalog())
        .validate_requests(true)
        .build()
        .unwrap();
    let outcome = client
        .call("members", "create", None, Some(json!({"email": "ada@example.com"})))
        .await;

    assert_eq!(outcome.into_data(), Some(json!({"id": 5})));
}

#[tokio::test]
async fn test_call_with_missing_path_param_never_hits_network() {
    let transport = ScriptedTransport::default().shared();
    let client = client_builder("https://api.test")
        .catalog(members_catalog())
        .transport(transport.clone())
        .build()
        .unwrap();

    let error = client
        .call("members", "remove", Some(json!({"id": 3})), None)
        .await
        .into_error()
        .unwrap();

    assert_eq!(error.kind(), &ErrorKind::Generic);
    assert_eq!(error.status_code(), 0);
    assert!(error.message().contains("team"));
    assert_eq!(transport.attempts(), 0);
}
