//! Handler for `PATCH /confirm`.
//!
//! Body: `{measure_uuid, confirmed_value}`. The confirmed value is validated
//! and accepted, but the stored reading is immutable — confirmation only
//! flips the flag.

use std::sync::Arc;

use axum::{Json, extract::State};
use bytes::Bytes;
use serde_json::json;
use tally_core::{
  extract::ValueExtractor, store::MeasurementStore, workflow::MeasurementWorkflow,
};
use uuid::Uuid;

use crate::error::ApiError;

struct ConfirmRequest {
  id:              Uuid,
  confirmed_value: f64,
}

impl ConfirmRequest {
  fn parse(raw: &[u8]) -> Result<Self, ApiError> {
    let body: serde_json::Value = serde_json::from_slice(raw)
      .map_err(|_| ApiError::InvalidData("request body must be a JSON object".into()))?;

    let uuid_str = body
      .get("measure_uuid")
      .and_then(|v| v.as_str())
      .ok_or_else(|| ApiError::InvalidData("measure_uuid must be a string".into()))?;

    let confirmed_value = body
      .get("confirmed_value")
      .and_then(|v| v.as_f64())
      .ok_or_else(|| ApiError::InvalidData("confirmed_value must be a number".into()))?;

    // A syntactically invalid id cannot name any measurement.
    let id = Uuid::parse_str(uuid_str).map_err(|_| ApiError::MeasureNotFound)?;

    Ok(Self { id, confirmed_value })
  }
}

/// `PATCH /confirm`
pub async fn handler<S, X>(
  State(workflow): State<Arc<MeasurementWorkflow<S, X>>>,
  body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: MeasurementStore + 'static,
  X: ValueExtractor + 'static,
{
  let request = ConfirmRequest::parse(&body)?;

  workflow
    .confirm(request.id, Some(request.confirmed_value))
    .await
    .map_err(ApiError::from_confirm)?;

  Ok(Json(json!({ "success": true })))
}
