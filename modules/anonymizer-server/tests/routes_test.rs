//! Router behaviour that does not need a live database. The pool points at a
//! closed port, so any handler that reaches storage fails fast.

use anonymizer_core::{file_config::parse_config, AppConfig, ServerDeps};
use anonymizer_server::routes::build_router;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const UNREACHABLE_DB: &str = "postgres://anonymizer@127.0.0.1:1/anonymizer";

fn app() -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy(UNREACHABLE_DB)
        .unwrap();
    let file_config = parse_config(
        r#"
        [server]
        host = "127.0.0.1"
        port = 8000

        [database]
        max_connections = 2
        "#,
    )
    .unwrap();
    let config = AppConfig {
        database_url: UNREACHABLE_DB.to_string(),
        host_override: None,
        port_override: None,
    };
    build_router(Arc::new(ServerDeps::new(pool, config, Arc::new(file_config))))
}

async fn post_json(path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_returns_ok() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn half_specified_area_is_rejected_before_storage() {
    let (status, body) = post_json(
        "/ipt_anonymizer/api/v1/user/extract",
        json!({
            "request": "Partial_Mobility",
            "source_app": "travis",
            "start_lat": 45.07,
            "start_lon": 7.68
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["resource"], "USER");
    assert!(!body["detail"]["violations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn small_radius_is_rejected() {
    let (status, _) = post_json(
        "/ipt_anonymizer/api/v1/user/extract",
        json!({
            "request": "Complete_Mobility",
            "source_app": "travis",
            "end_lat": 45.07,
            "end_lon": 7.68,
            "end_radius": 50.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_request_kind_is_rejected() {
    let (status, body) = post_json(
        "/ipt_anonymizer/api/v1/user/extract",
        json!({"request": "Everything", "source_app": "travis"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["resource"], "USER");
}

#[tokio::test]
async fn valid_request_against_unreachable_storage_is_500() {
    let (status, body) = post_json(
        "/ipt_anonymizer/api/v1/user/extract",
        json!({
            "request": "Stats_num_tracks",
            "source_app": "travis",
            "type_aggregation": "space"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"]["request"], "Stats_num_tracks");
    assert_eq!(body["detail"]["status"], "Something went wrong extracting data");
}

#[tokio::test]
async fn empty_trace_is_rejected_on_store() {
    let (status, body) = post_json(
        "/ipt_anonymizer/api/v1/user/store",
        json!({
            "source_app": "travis",
            "journey_id": "J1",
            "company_code": "ACME",
            "distance": 0,
            "elapsedTime": "0:00:00",
            "endDate": 0,
            "id": "device-1",
            "mainTypeSpace": "walk",
            "mainTypeTime": "walk",
            "startDate": 0,
            "trace_information": []
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["violations"][0]["fields"][0], "trace_information");
}

#[tokio::test]
async fn iot_lookup_without_id_is_rejected() {
    let (status, body) = post_json("/ipt_anonymizer/api/v1/iot/extract", json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["resource"], "IOT");
}
