// tests/api_http.rs
//
// HTTP-level tests for the dashboard Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{day, FakeSource, Rec, DATA, ENG};
use crypto_jobs_dashboard::api::{self, AppState, MSG_MAP, MSG_PANIC, MSG_TABLE};
use crypto_jobs_dashboard::fetch::{FetchSettings, PageQuery, RecordSource, StoreError};
use crypto_jobs_dashboard::config::RelaySettings;
use crypto_jobs_dashboard::relay::{
    ChatExchange, ChatRelay, ClassifiedResponse, QueryRelay, BASE_PROMPTS,
};
use crypto_jobs_dashboard::JobRecord;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct Echo;

#[async_trait]
impl QueryRelay for Echo {
    async fn relay(&self, query: &str, _history: &[ChatExchange]) -> ClassifiedResponse {
        ClassifiedResponse::Text {
            text: format!("echo: {query}"),
        }
    }
    fn name(&self) -> &'static str {
        "echo"
    }
}

struct Panicking;

#[async_trait]
impl RecordSource for Panicking {
    async fn fetch_page(&self, _q: &PageQuery) -> Result<Vec<JobRecord>, StoreError> {
        panic!("store exploded");
    }
    fn name(&self) -> &'static str {
        "panicking"
    }
}

fn records() -> Vec<JobRecord> {
    vec![
        Rec::new("Rust Engineer").company("Acme").location("Remote").function(ENG).salary(150_000.0).posted(day(2025, 4, 2)).build(),
        Rec::new("Data Analyst").company("Acme").location("Germany").function(DATA).posted(day(2025, 4, 1)).build(),
        Rec::new("Backend Engineer").company("Beta").location("Remote").function(ENG).posted(day(2025, 3, 20)).build(),
    ]
}

fn app_with(source: Arc<dyn RecordSource>) -> Router {
    api::router(AppState::new(source, Arc::new(Echo), FetchSettings::default()))
}

fn test_router() -> Router {
    app_with(Arc::new(FakeSource::new(records())))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn jobs_applies_filters_and_lists_options() {
    let (status, v) = get_json(test_router(), "/api/jobs?company=Acme&location=Remote").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["total"], 3);
    assert_eq!(v["matched"], 1);
    assert_eq!(v["rows"][0]["title"], "Rust Engineer");
    assert_eq!(v["rows"][0]["salary"], "150,000");
    assert_eq!(v["options"]["companies"], json!(["Acme", "Beta"]));
}

#[tokio::test]
async fn jobs_search_is_case_insensitive() {
    let (_, v) = get_json(test_router(), "/api/jobs?q=engineer").await;
    assert_eq!(v["matched"], 2);
}

#[tokio::test]
async fn functions_rows_are_formatted() {
    let (status, v) = get_json(test_router(), "/api/functions").await;
    assert_eq!(status, StatusCode::OK);
    let rows = v["rows"].as_array().unwrap();
    assert_eq!(rows[0]["job_function"], ENG);
    assert_eq!(rows[0]["percentage"], "67%");
    assert_eq!(rows[0]["average_salary"], "$150,000");
    assert_eq!(rows[1]["average_salary"], "No salary data");
}

#[tokio::test]
async fn locations_and_companies_respect_top() {
    let (_, v) = get_json(test_router(), "/api/locations?top=1").await;
    assert_eq!(v["buckets"].as_array().unwrap().len(), 1);
    assert_eq!(v["buckets"][0]["key"], "Remote");
    assert_eq!(v["buckets"][0]["percentage"], 66.7);

    let (_, v) = get_json(test_router(), "/api/companies").await;
    assert_eq!(v["companies"]["buckets"][0]["key"], "Acme");
    assert_eq!(v["size_ranges"][1]["range"], "2-5");
    assert_eq!(v["size_ranges"][1]["companies"], 1);
}

#[tokio::test]
async fn timeline_and_overview_render() {
    let (status, v) = get_json(test_router(), "/api/timeline").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["dates"].as_array().unwrap().len(), 3);
    assert_eq!(v["weekdays"].as_array().unwrap().len(), 7);

    let (status, v) = get_json(test_router(), "/api/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["span"]["total_records"], 3);
    assert!(v["markdown"].as_str().unwrap().contains("### Locations"));
}

#[tokio::test]
async fn store_failure_maps_to_bad_gateway_with_region_message() {
    let app = app_with(Arc::new(FakeSource::new(records()).failing_at(0)));
    let (status, v) = get_json(app, "/api/jobs").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(v["error"], MSG_TABLE);
    assert!(v["detail"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn panics_are_contained_per_region() {
    let (status, v) = get_json(app_with(Arc::new(Panicking)), "/api/locations").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["error"], MSG_MAP);

    let (status, v) = get_json(app_with(Arc::new(Panicking)), "/api/companies").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["error"], MSG_PANIC);

    // Regions that do not touch the store keep working.
    let (status, _) = get_json(app_with(Arc::new(Panicking)), "/api/chat/history").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn chat_round_trip_updates_history() {
    let app = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "query": "hello" }).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["seq"], 1);
    assert_eq!(v["response"]["kind"], "string");
    assert_eq!(v["response"]["text"], "echo: hello");

    let (_, v) = get_json(app, "/api/chat/history").await;
    let messages = v["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[2]["content"], "echo: hello");
}

#[tokio::test]
async fn unknown_backend_type_is_reported_as_unsupported() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": { "type": "weird" } })),
        )
        .mount(&backend)
        .await;
    let relay = ChatRelay::new(&RelaySettings {
        base_url: backend.uri(),
        ..RelaySettings::default()
    })
    .expect("relay builds");
    let app = api::router(AppState::new(
        Arc::new(FakeSource::new(records())),
        Arc::new(relay),
        FetchSettings::default(),
    ));

    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "query": "render this" }).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["response"], json!({ "kind": "unsupported", "type": "weird" }));

    let (_, v) = get_json(app, "/api/chat/history").await;
    assert_eq!(v["busy"], false);
    let messages = v["messages"].as_array().unwrap();
    assert!(messages[2]["content"].as_str().unwrap().contains("\"weird\""));
}

#[tokio::test]
async fn blank_chat_query_is_rejected() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "query": "   " }).to_string()))
        .unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn suggestions_fall_back_when_store_is_down() {
    let (_, v) = get_json(test_router(), "/api/chat/suggestions").await;
    let seeded = v.as_array().unwrap();
    assert!(seeded.len() > BASE_PROMPTS.len());
    assert!(seeded.iter().any(|p| p.as_str().unwrap().contains("Acme")));

    let app = app_with(Arc::new(FakeSource::new(vec![]).failing_at(0)));
    let (status, v) = get_json(app, "/api/chat/suggestions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v.as_array().unwrap().len(), BASE_PROMPTS.len());
}
