//! Router-level tests: each endpoint's success shape and error envelope,
//! driven through `tower::ServiceExt::oneshot` against an in-memory store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde_json::{Value, json};
use tally_core::{
  extract::{Extraction, ImagePayload, ValueExtractor},
  workflow::MeasurementWorkflow,
};
use tally_store_sqlite::SqliteStore;
use thiserror::Error;
use tower::ServiceExt as _;
use uuid::Uuid;

// ─── Test fixture ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("recognition service unavailable")]
struct StubFailure;

#[derive(Clone)]
struct StubExtractor {
  value: f64,
  fail:  bool,
}

impl ValueExtractor for StubExtractor {
  type Error = StubFailure;

  async fn extract(&self, _image: &ImagePayload) -> Result<Extraction, StubFailure> {
    if self.fail {
      return Err(StubFailure);
    }
    Ok(Extraction {
      value:           self.value,
      image_reference: "https://files.example/meter-0001".into(),
    })
  }
}

async fn app_with(extractor: StubExtractor) -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  crate::router(Arc::new(MeasurementWorkflow::new(store, extractor)))
}

async fn app() -> Router {
  app_with(StubExtractor { value: 1042.0, fail: false }).await
}

fn upload_body(customer: &str, datetime: &str, meter_type: &str) -> Value {
  json!({
    "image":            B64.encode(b"\xff\xd8\xff\xe0fake"),
    "customer_code":    customer,
    "measure_datetime": datetime,
    "measure_type":     meter_type,
  })
}

async fn send(app: &Router, method: &str, path: &str, body: Option<&Value>) -> (StatusCode, Value) {
  let request = match body {
    Some(v) => Request::builder()
      .method(method)
      .uri(path)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => Request::builder()
      .method(method)
      .uri(path)
      .body(Body::empty())
      .unwrap(),
  };

  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn assert_envelope(body: &Value, code: &str) {
  assert_eq!(body["error_code"], code, "unexpected envelope: {body}");
  assert!(body["error_description"].is_string());
}

// ─── Upload ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_returns_the_persisted_reading() {
  let app = app().await;

  let (status, body) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-05T10:00:00Z", "WATER")),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["image_url"], "https://files.example/meter-0001");
  assert_eq!(body["measure_value"], 1042.0);
  Uuid::parse_str(body["measure_uuid"].as_str().unwrap()).unwrap();
}

#[tokio::test]
async fn upload_same_month_is_a_double_report() {
  let app = app().await;

  send(&app, "POST", "/upload", Some(&upload_body("C1", "2024-03-05T10:00:00Z", "WATER"))).await;
  let (status, body) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-20T10:00:00Z", "WATER")),
  )
  .await;

  assert_eq!(status, StatusCode::CONFLICT);
  assert_envelope(&body, "DOUBLE_REPORT");
}

#[tokio::test]
async fn upload_adjacent_months_both_succeed() {
  let app = app().await;

  let (status, _) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-01-31T23:59:59Z", "WATER")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-02-01T00:00:01Z", "WATER")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_accepts_lowercase_measure_type() {
  let app = app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-05T10:00:00Z", "water")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_rejects_undecodable_image() {
  let app = app().await;
  let mut body = upload_body("C1", "2024-03-05T10:00:00Z", "WATER");
  body["image"] = json!("not-base64!!!");

  let (status, body) = send(&app, "POST", "/upload", Some(&body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, "INVALID_IMAGE");
}

#[tokio::test]
async fn upload_rejects_unknown_measure_type() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-05T10:00:00Z", "OIL")),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, "INVALID_DATA");
}

#[tokio::test]
async fn upload_rejects_malformed_datetime() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "last tuesday", "WATER")),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, "INVALID_DATA");
}

#[tokio::test]
async fn upload_rejects_missing_fields() {
  let app = app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/upload",
    Some(&json!({ "customer_code": "C1" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, "INVALID_DATA");
}

#[tokio::test]
async fn upload_extraction_failure_is_a_server_error() {
  let app = app_with(StubExtractor { value: 0.0, fail: true }).await;

  let (status, body) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-05T10:00:00Z", "WATER")),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_envelope(&body, "SERVER_ERROR");

  // The failed upload left no orphaned record behind.
  let (status, body) = send(&app, "GET", "/C1/list", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_envelope(&body, "MEASURES_NOT_FOUND");
}

// ─── Confirm ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn confirm_succeeds_once_then_conflicts() {
  let app = app().await;
  let (_, uploaded) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-05T10:00:00Z", "WATER")),
  )
  .await;
  let uuid = uploaded["measure_uuid"].as_str().unwrap().to_owned();

  let confirm = json!({ "measure_uuid": uuid, "confirmed_value": 1050.0 });
  let (status, body) = send(&app, "PATCH", "/confirm", Some(&confirm)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "success": true }));

  let (status, body) = send(&app, "PATCH", "/confirm", Some(&confirm)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_envelope(&body, "CONFIRMATION_DUPLICATE");
}

#[tokio::test]
async fn confirm_unknown_id_is_not_found() {
  let app = app().await;
  let confirm = json!({ "measure_uuid": Uuid::new_v4(), "confirmed_value": 1.0 });
  let (status, body) = send(&app, "PATCH", "/confirm", Some(&confirm)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_envelope(&body, "MEASURE_NOT_FOUND");
}

#[tokio::test]
async fn confirm_malformed_id_is_not_found() {
  let app = app().await;
  let confirm = json!({ "measure_uuid": "measure-123", "confirmed_value": 1.0 });
  let (status, body) = send(&app, "PATCH", "/confirm", Some(&confirm)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_envelope(&body, "MEASURE_NOT_FOUND");
}

#[tokio::test]
async fn confirm_requires_a_numeric_value() {
  let app = app().await;
  let confirm = json!({ "measure_uuid": Uuid::new_v4(), "confirmed_value": "lots" });
  let (status, body) = send(&app, "PATCH", "/confirm", Some(&confirm)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, "INVALID_DATA");
}

// ─── List ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_projects_readings_without_values() {
  let app = app().await;
  send(&app, "POST", "/upload", Some(&upload_body("C1", "2024-03-05T10:00:00Z", "WATER"))).await;

  let (status, body) = send(&app, "GET", "/C1/list", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["customer_code"], "C1");

  let measures = body["measures"].as_array().unwrap();
  assert_eq!(measures.len(), 1);

  let measure = measures[0].as_object().unwrap();
  assert!(measure.contains_key("measure_uuid"));
  assert!(measure.contains_key("measure_datetime"));
  assert_eq!(measure["measure_type"], "WATER");
  assert_eq!(measure["has_confirmed"], false);
  assert!(measure.contains_key("image_url"));

  // The numeric reading is never exposed by this endpoint.
  assert!(!measure.contains_key("measure_value"));
  assert!(!measure.contains_key("value"));
}

#[tokio::test]
async fn list_with_no_readings_is_not_found() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/C1/list", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_envelope(&body, "MEASURES_NOT_FOUND");
}

#[tokio::test]
async fn list_filter_is_case_insensitive() {
  let app = app().await;
  send(&app, "POST", "/upload", Some(&upload_body("C1", "2024-03-05T10:00:00Z", "WATER"))).await;

  for filter in ["WATER", "water", "Water"] {
    let (status, body) =
      send(&app, "GET", &format!("/C1/list?measure_type={filter}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["measures"].as_array().unwrap().len(), 1);
  }
}

#[tokio::test]
async fn list_rejects_unknown_filter() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/C1/list?measure_type=OIL", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_envelope(&body, "INVALID_TYPE");
}

// ─── End-to-end scenario ─────────────────────────────────────────────────────

#[tokio::test]
async fn intake_confirm_and_list_lifecycle() {
  let app = app().await;

  // First reading of the month succeeds and carries a fresh id and value.
  let (status, uploaded) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-05T10:00:00Z", "WATER")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(uploaded["measure_value"].is_number());
  let uuid = uploaded["measure_uuid"].as_str().unwrap().to_owned();

  // A second reading in the same month is rejected.
  let (status, body) = send(
    &app,
    "POST",
    "/upload",
    Some(&upload_body("C1", "2024-03-20T10:00:00Z", "WATER")),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_envelope(&body, "DOUBLE_REPORT");

  // Confirm once, then never again.
  let confirm = json!({ "measure_uuid": uuid, "confirmed_value": 1042.0 });
  let (status, _) = send(&app, "PATCH", "/confirm", Some(&confirm)).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&app, "PATCH", "/confirm", Some(&confirm)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  // No GAS readings exist for this customer.
  let (status, body) = send(&app, "GET", "/C1/list?measure_type=GAS", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_envelope(&body, "MEASURES_NOT_FOUND");

  // The WATER reading lists as confirmed.
  let (status, body) = send(&app, "GET", "/C1/list?measure_type=WATER", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["measures"][0]["has_confirmed"], true);
}
