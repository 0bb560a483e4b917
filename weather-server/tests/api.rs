//! End-to-end tests: router + real adapters against mock upstreams, with the
//! in-memory cache store.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use weather_core::{
    CacheError, CacheGateway, Config, FailoverOrchestrator, KeyValueStore, build_providers,
};
use weather_server::{AppState, create_router};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn config(upstream: &MockServer, ttl_secs: u64) -> Config {
    let mut cfg = Config::default();
    cfg.cache_store_url = "memory://".into();
    cfg.cache_ttl_seconds = ttl_secs;
    cfg.service_timeout_seconds = 1;

    let vars = [
        ("WEATHERSTACK_API_KEY", "WS_KEY".to_string()),
        ("OPENWEATHER_API_KEY", "OW_KEY".to_string()),
        ("WEATHERSTACK_BASE_URL", format!("{}/current", upstream.uri())),
        ("OPENWEATHER_BASE_URL", format!("{}/weather", upstream.uri())),
    ];
    cfg.apply_env(|name| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.clone()))
        .expect("test variables parse");
    cfg
}

async fn server(cfg: &Config) -> TestServer {
    let state = AppState::from_config(cfg).await.expect("state builds");
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

async fn mount_weatherstack(upstream: &MockServer, body: Value, hits: u64) {
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(hits)
        .mount(upstream)
        .await;
}

async fn mount_openweather(upstream: &MockServer, status: u16, body: Value, hits: u64) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(hits)
        .mount(upstream)
        .await;
}

fn weatherstack_ok() -> Value {
    json!({
        "request": {"type": "City"},
        "location": {"name": "Melbourne"},
        "current": {"temperature": 14, "wind_speed": 20}
    })
}

fn weatherstack_err() -> Value {
    json!({"success": false, "error": {"code": 104, "info": "Usage limit reached."}})
}

#[tokio::test]
async fn first_request_is_live() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_ok(), 1).await;
    mount_openweather(&upstream, 200, json!({}), 0).await;

    let server = server(&config(&upstream, 60)).await;
    let response = server.get("/v1/weather").add_query_param("city", "Melbourne").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["wind_speed"], 20.0);
    assert_eq!(body["temperature_degrees"], 14.0);
    assert_eq!(body["cached"], false);
    assert!(body["cached_time"].is_null());
}

#[tokio::test]
async fn second_request_within_ttl_is_cached() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_ok(), 1).await;

    let server = server(&config(&upstream, 60)).await;
    let first: Value = server.get("/v1/weather").add_query_param("city", "Adelaide").await.json();
    let second: Value = server.get("/v1/weather").add_query_param("city", "Adelaide").await.json();

    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(second["wind_speed"], first["wind_speed"]);
    assert_eq!(second["temperature_degrees"], first["temperature_degrees"]);

    let stamp = second["cached_time"].as_str().expect("cached_time is a string");
    chrono::DateTime::parse_from_rfc3339(stamp).expect("cached_time is ISO-8601");
}

#[tokio::test]
async fn cache_keys_are_case_sensitive() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_ok(), 2).await;

    let server = server(&config(&upstream, 60)).await;
    let upper: Value = server.get("/v1/weather").add_query_param("city", "Melbourne").await.json();
    let lower: Value = server.get("/v1/weather").add_query_param("city", "melbourne").await.json();

    assert_eq!(upper["cached"], false);
    assert_eq!(lower["cached"], false);
}

#[tokio::test]
async fn entry_expires_after_ttl() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_ok(), 2).await;

    let server = server(&config(&upstream, 1)).await;
    let first: Value = server.get("/v1/weather").add_query_param("city", "Perth").await.json();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let second: Value = server.get("/v1/weather").add_query_param("city", "Perth").await.json();

    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], false);
    assert!(second["cached_time"].is_null());
}

#[tokio::test]
async fn falls_over_to_second_provider() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_err(), 1).await;
    mount_openweather(
        &upstream,
        200,
        json!({"coord": {}, "main": {"temp": 18.3}, "wind": {"speed": 5.1}}),
        1,
    )
    .await;

    let server = server(&config(&upstream, 60)).await;
    let response = server.get("/v1/weather").add_query_param("city", "Sydney").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["wind_speed"], 5.1);
    assert_eq!(body["temperature_degrees"], 18.3);
    assert!(body.get("status_code").is_none());
    assert!(body.get("detail").is_none());
}

#[tokio::test]
async fn total_failure_passes_through_last_status() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_err(), 1).await;
    mount_openweather(&upstream, 404, json!({"cod": "404", "message": "city not found"}), 1)
        .await;

    let server = server(&config(&upstream, 60)).await;
    let response = server.get("/v1/weather").add_query_param("city", "Atlantis").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["detail"], "city not found");
}

#[tokio::test]
async fn failures_are_not_cached() {
    let upstream = MockServer::start().await;
    let mut cfg = config(&upstream, 60);
    cfg.provider_priority = "weatherstack".into();
    mount_weatherstack(&upstream, weatherstack_err(), 2).await;

    let server = server(&cfg).await;
    for _ in 0..2 {
        let response = server.get("/v1/weather").add_query_param("city", "Darwin").await;
        response.assert_status_service_unavailable();
        let body: Value = response.json();
        assert_eq!(body["detail"], "Weather service currently unavailable");
    }
}

#[tokio::test]
async fn missing_city_is_bad_request() {
    let upstream = MockServer::start().await;
    let server = server(&config(&upstream, 60)).await;

    let response = server.get("/v1/weather").await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["detail"].as_str().is_some_and(|d| d.contains("city")));
}

#[tokio::test]
async fn malformed_query_is_bad_request_with_detail() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_ok(), 0).await;
    let server = server(&config(&upstream, 60)).await;

    let response = server
        .get("/v1/weather")
        .add_query_param("city", "Melbourne")
        .add_query_param("city", "Sydney")
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["detail"].as_str().is_some_and(|d| d.contains("city")));
}

#[tokio::test]
async fn health_reports_ok() {
    let upstream = MockServer::start().await;
    let server = server(&config(&upstream, 60)).await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn startup_fails_without_api_keys() {
    let mut cfg = Config::default();
    cfg.cache_store_url = "memory://".into();

    let err = AppState::from_config(&cfg).await.unwrap_err();
    assert!(format!("{err:#}").contains("missing API key"));
}

/// Store that fails every operation.
#[derive(Debug)]
struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(broken())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(broken())
    }
}

fn broken() -> CacheError {
    let err = serde_json::from_str::<Value>("{").unwrap_err();
    CacheError::Serialize(err)
}

fn broken_cache_state(upstream: &MockServer) -> AppState {
    let cfg = config(upstream, 60);
    let priority = cfg.validate().expect("config is valid");
    let providers = build_providers(&cfg, &priority).expect("providers build");
    let orchestrator = FailoverOrchestrator::new(providers, cfg.service_timeout());
    let cache = CacheGateway::new(Arc::new(BrokenStore), cfg.cache_ttl());
    AppState::new(cache, orchestrator)
}

#[tokio::test]
async fn cache_outage_surfaces_by_default() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_ok(), 0).await;

    let server = TestServer::new(create_router(broken_cache_state(&upstream))).unwrap();
    let response = server.get("/v1/weather").add_query_param("city", "Brisbane").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Cache unavailable");
}

#[tokio::test]
async fn cache_outage_degrades_when_fail_open() {
    let upstream = MockServer::start().await;
    mount_weatherstack(&upstream, weatherstack_ok(), 1).await;

    let state = broken_cache_state(&upstream).with_cache_fail_open(true);
    let server = TestServer::new(create_router(state)).unwrap();
    let response = server.get("/v1/weather").add_query_param("city", "Brisbane").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["cached"], false);
    assert_eq!(body["wind_speed"], 20.0);
}
