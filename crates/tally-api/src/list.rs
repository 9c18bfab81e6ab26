//! Handler for `GET /{customer_code}/list`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{
  extract::ValueExtractor,
  measurement::{MeasurementSummary, MeterType},
  store::MeasurementStore,
  workflow::MeasurementWorkflow,
};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Optional filter; accepted case-insensitively.
  pub measure_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
  pub customer_code: String,
  pub measures:      Vec<ListedMeasure>,
}

/// Wire projection of one reading. Deliberately carries no value field.
#[derive(Debug, Serialize)]
pub struct ListedMeasure {
  pub measure_uuid:     Uuid,
  pub measure_datetime: DateTime<Utc>,
  pub measure_type:     MeterType,
  pub has_confirmed:    bool,
  pub image_url:        String,
}

impl From<MeasurementSummary> for ListedMeasure {
  fn from(s: MeasurementSummary) -> Self {
    Self {
      measure_uuid:     s.id,
      measure_datetime: s.measured_at,
      measure_type:     s.meter_type,
      has_confirmed:    s.confirmed,
      image_url:        s.image_reference,
    }
  }
}

/// `GET /{customer_code}/list[?measure_type=WATER|GAS]`
pub async fn handler<S, X>(
  State(workflow): State<Arc<MeasurementWorkflow<S, X>>>,
  Path(customer_code): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError>
where
  S: MeasurementStore + 'static,
  X: ValueExtractor + 'static,
{
  // An unknown filter value is rejected before touching the store.
  let meter_type = match params.measure_type.as_deref() {
    None => None,
    Some(raw) => Some(MeterType::parse(raw).ok_or(ApiError::InvalidType)?),
  };

  let summaries = workflow
    .list(&customer_code, meter_type)
    .await
    .map_err(ApiError::from_list)?;

  Ok(Json(ListResponse {
    customer_code,
    measures: summaries.into_iter().map(ListedMeasure::from).collect(),
  }))
}
