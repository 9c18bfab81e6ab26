//! Handler for `POST /upload`.
//!
//! Body: `{image: base64, customer_code, measure_datetime, measure_type}`.
//! The body is validated field by field here so the workflow only ever sees
//! well-typed values, and so malformed requests still get the protocol's
//! error envelope rather than a framework rejection.

use std::sync::Arc;

use axum::{Json, extract::State};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tally_core::{
  extract::{ImagePayload, ValueExtractor},
  measurement::MeterType,
  store::MeasurementStore,
  workflow::MeasurementWorkflow,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Request parsing ──────────────────────────────────────────────────────────

struct SubmitRequest {
  customer_code: String,
  meter_type:    MeterType,
  measured_at:   DateTime<Utc>,
  image:         ImagePayload,
}

fn field_str<'v>(body: &'v serde_json::Value, name: &str) -> Result<&'v str, ApiError> {
  body
    .get(name)
    .and_then(|v| v.as_str())
    .ok_or_else(|| ApiError::InvalidData(format!("{name} must be a string")))
}

impl SubmitRequest {
  fn parse(raw: &[u8]) -> Result<Self, ApiError> {
    let body: serde_json::Value = serde_json::from_slice(raw)
      .map_err(|_| ApiError::InvalidData("request body must be a JSON object".into()))?;

    let customer_code = field_str(&body, "customer_code")?.to_owned();
    if customer_code.is_empty() {
      return Err(ApiError::InvalidData("customer_code must not be empty".into()));
    }

    let measured_at = parse_datetime(field_str(&body, "measure_datetime")?)
      .ok_or_else(|| {
        ApiError::InvalidData("measure_datetime must be an ISO 8601 date-time".into())
      })?;

    let meter_type = MeterType::parse(field_str(&body, "measure_type")?)
      .ok_or_else(|| ApiError::InvalidData("measure_type must be WATER or GAS".into()))?;

    let bytes = B64
      .decode(field_str(&body, "image")?)
      .map_err(|_| ApiError::InvalidImage)?;
    if bytes.is_empty() {
      return Err(ApiError::InvalidImage);
    }

    Ok(Self {
      customer_code,
      meter_type,
      measured_at,
      image: ImagePayload {
        mime_type: sniff_mime(&bytes).to_owned(),
        bytes:     Bytes::from(bytes),
      },
    })
  }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  // ISO 8601 without an offset is accepted and read as UTC.
  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
    .ok()
    .map(|ndt| ndt.and_utc())
}

/// PNG and WebP are recognised by magic bytes; everything else is treated as
/// JPEG, which is what meter photographs are in practice.
fn sniff_mime(bytes: &[u8]) -> &'static str {
  if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
    "image/png"
  } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
    "image/webp"
  } else {
    "image/jpeg"
  }
}

// ─── Handler ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub image_url:     String,
  pub measure_value: Option<f64>,
  pub measure_uuid:  Uuid,
}

/// `POST /upload`
pub async fn handler<S, X>(
  State(workflow): State<Arc<MeasurementWorkflow<S, X>>>,
  body: Bytes,
) -> Result<Json<UploadResponse>, ApiError>
where
  S: MeasurementStore + 'static,
  X: ValueExtractor + 'static,
{
  let request = SubmitRequest::parse(&body)?;

  let measurement = workflow
    .submit(
      &request.customer_code,
      request.meter_type,
      request.measured_at,
      request.image,
    )
    .await
    .map_err(ApiError::from_submit)?;

  Ok(Json(UploadResponse {
    image_url:     measurement.image_reference,
    measure_value: measurement.value,
    measure_uuid:  measurement.id,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sniffs_png_and_webp_magic_bytes() {
    assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n...."), "image/png");
    assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
    assert_eq!(sniff_mime(b"\xff\xd8\xff\xe0JFIF"), "image/jpeg");
  }

  #[test]
  fn datetime_accepts_offset_and_naive_forms() {
    assert!(parse_datetime("2024-03-05T10:00:00Z").is_some());
    assert!(parse_datetime("2024-03-05T10:00:00-03:00").is_some());
    assert!(parse_datetime("2024-03-05T10:00:00").is_some());
    assert!(parse_datetime("2024-03-05").is_none());
    assert!(parse_datetime("yesterday").is_none());
  }
}
