//! Pagination tests against a mock collection endpoint

mod common;

use futures::{StreamExt, TryStreamExt};
use orgapi::ErrorKind;
use orgapi::pagination::PageResponse;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client_builder, load_response_fixture};

#[derive(Debug, Deserialize, PartialEq)]
struct Member {
    id: u64,
    name: String,
}

async fn mount_page(server: &MockServer, offset: u64, limit: u64, body: Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/acme/api/members"))
        .and(query_param("offset", offset.to_string().as_str()))
        .and(query_param("limit", limit.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .named(format!("members page at offset {offset}"))
        .mount(server)
        .await;
}

fn page(total: u64, offset: u64, limit: u64, ids: std::ops::Range<u64>) -> Value {
    let items: Vec<Value> = ids.map(|id| json!({"id": id, "name": format!("member-{id}")})).collect();
    let end = offset + items.len() as u64;
    json!({
        "totalCount": total,
        "offset": offset,
        "limit": limit,
        "items": items,
        "next": (end < total).then(|| format!("members?offset={end}&limit={limit}")),
    })
}

#[tokio::test]
async fn test_get_all_fetches_every_page_in_order() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 0, 2, load_response_fixture("members_page_0"), 1).await;
    mount_page(&mock_server, 2, 2, load_response_fixture("members_page_2"), 1).await;

    let client = client_builder(mock_server.uri()).page_size(2).build().unwrap();
    let members = client.get_all::<Member>("members", None).await.into_data().unwrap();

    let ids: Vec<u64> = members.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(members[2].name, "Katherine Johnson");
}

#[tokio::test]
async fn test_single_page_needs_one_request() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 0, 100, page(2, 0, 100, 1..3), 1).await;

    let client = client_builder(mock_server.uri()).build().unwrap();
    let members = client.get_all::<Member>("members", None).await.into_data().unwrap();

    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_many_pages_keep_offset_order() {
    let mock_server = MockServer::start().await;
    for offset in (0..23).step_by(3) {
        let end = (offset + 3).min(23);
        mount_page(&mock_server, offset, 3, page(23, offset, 3, offset..end), 1).await;
    }

    let client = client_builder(mock_server.uri())
        .page_size(3)
        .parallel_limit(3)
        .build()
        .unwrap();
    let members = client.get_all::<Member>("members", None).await.into_data().unwrap();

    let ids: Vec<u64> = members.iter().map(|m| m.id).collect();
    assert_eq!(ids, (0..23).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_caller_params_are_forwarded_with_paging() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acme/api/members"))
        .and(query_param("role", "admin"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(1, 0, 50, 7..8)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri()).page_size(50).build().unwrap();
    let members = client
        .get_all::<Member>("members", Some(json!({"role": "admin", "offset": 400})))
        .await
        .into_data()
        .unwrap();

    assert_eq!(members.iter().map(|m| m.id).collect::<Vec<_>>(), vec![7]);
}

#[tokio::test]
async fn test_failing_page_aborts_aggregation() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 0, 1, page(5, 0, 1, 0..1), 1).await;
    mount_page(&mock_server, 1, 1, page(5, 1, 1, 1..2), 1).await;
    mount_page(&mock_server, 3, 1, page(5, 3, 1, 3..4), 0).await;
    mount_page(&mock_server, 4, 1, page(5, 4, 1, 4..5), 0).await;

    Mock::given(method("GET"))
        .and(path("/acme/api/members"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(load_response_fixture("member_not_found")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri())
        .page_size(1)
        .parallel_limit(2)
        .build()
        .unwrap();
    let outcome = client.get_all::<Member>("members", None).await;

    assert!(outcome.data().is_none());
    let error = outcome.into_error().unwrap();
    assert_eq!(error.kind(), &ErrorKind::NotFound);
    assert_eq!(error.message(), "Member does not exist");
}

#[tokio::test]
async fn test_missing_total_follows_next() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        0,
        2,
        json!({"results": [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}], "next": "more"}),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        2,
        2,
        json!({"results": [{"id": 3, "name": "c"}], "next": null}),
        1,
    )
    .await;

    let client = client_builder(mock_server.uri()).page_size(2).build().unwrap();
    let members = client.get_all::<Member>("members", None).await.into_data().unwrap();

    assert_eq!(members.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_lazy_stream_walks_pages() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 0, 2, load_response_fixture("members_page_0"), 1).await;
    mount_page(&mock_server, 2, 2, load_response_fixture("members_page_2"), 1).await;

    let client = client_builder(mock_server.uri()).page_size(2).build().unwrap();
    let members: Vec<Member> = client
        .paginate::<Member>("members", None)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(members.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_lazy_stream_fetches_on_demand() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 0, 2, load_response_fixture("members_page_0"), 1).await;
    mount_page(&mock_server, 2, 2, load_response_fixture("members_page_2"), 0).await;

    let client = client_builder(mock_server.uri()).page_size(2).build().unwrap();
    let first_two: Vec<Member> = client
        .paginate::<Member>("members", None)
        .take(2)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(first_two.len(), 2);
}

#[tokio::test]
async fn test_lazy_stream_ends_after_error() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 0, 2, load_response_fixture("members_page_0"), 1).await;

    Mock::given(method("GET"))
        .and(path("/acme/api/members"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri())
        .page_size(2)
        .max_retries(0)
        .build()
        .unwrap();
    let results: Vec<Result<Member, _>> = client.paginate::<Member>("members", None).collect().await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert_eq!(results[2].as_ref().unwrap_err().kind(), &ErrorKind::ServerError);
}

#[tokio::test]
async fn test_zero_page_size_fails_without_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_builder(mock_server.uri()).build().unwrap();
    let error = client
        .paginator()
        .with_page_size(0)
        .collect_all(|_: u64, _: u64| async {
            client.get::<PageResponse<Member>>("members", None).await
        })
        .await
        .into_error()
        .unwrap();

    assert_eq!(error.status_code(), 0);
}
