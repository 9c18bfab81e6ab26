//! API error type, wire envelope, and mappings from workflow errors.
//!
//! The envelope shape and the per-endpoint error codes are a compatibility
//! contract: every non-2xx response is `{error_code, error_description}`,
//! and the two 500 codes differ between upload and the other endpoints.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::Error as WorkflowError;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid data: {0}")]
  InvalidData(String),

  #[error("invalid image")]
  InvalidImage,

  #[error("invalid measure type")]
  InvalidType,

  #[error("reading for this month already recorded")]
  DoubleReport,

  #[error("measurement not found")]
  MeasureNotFound,

  #[error("measurement already confirmed")]
  ConfirmationDuplicate,

  #[error("no measurements found")]
  MeasuresNotFound,

  /// Unanticipated fault during upload. Kept distinct from [`Self::Internal`]
  /// because the wire code differs.
  #[error("upload failed")]
  UploadFault,

  #[error("internal error")]
  Internal,
}

impl ApiError {
  fn parts(&self) -> (StatusCode, &'static str, String) {
    match self {
      ApiError::InvalidData(msg) => {
        (StatusCode::BAD_REQUEST, "INVALID_DATA", msg.clone())
      }
      ApiError::InvalidImage => (
        StatusCode::BAD_REQUEST,
        "INVALID_IMAGE",
        "the supplied image is not valid base64 image data".into(),
      ),
      ApiError::InvalidType => (
        StatusCode::BAD_REQUEST,
        "INVALID_TYPE",
        "measure_type must be WATER or GAS".into(),
      ),
      ApiError::DoubleReport => (
        StatusCode::CONFLICT,
        "DOUBLE_REPORT",
        "a reading for this month has already been recorded".into(),
      ),
      ApiError::MeasureNotFound => (
        StatusCode::NOT_FOUND,
        "MEASURE_NOT_FOUND",
        "measurement not found".into(),
      ),
      ApiError::ConfirmationDuplicate => (
        StatusCode::CONFLICT,
        "CONFIRMATION_DUPLICATE",
        "measurement already confirmed".into(),
      ),
      ApiError::MeasuresNotFound => (
        StatusCode::NOT_FOUND,
        "MEASURES_NOT_FOUND",
        "no measurements found".into(),
      ),
      ApiError::UploadFault => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "SERVER_ERROR",
        "an unexpected error occurred".into(),
      ),
      ApiError::Internal => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_SERVER_ERROR",
        "error processing the request".into(),
      ),
    }
  }

  /// Map a submit failure onto the upload endpoint's wire codes.
  ///
  /// Extraction, storage and any unanticipated fault are logged here and
  /// leave the process as a generic 500 — no internal detail reaches the
  /// caller.
  pub fn from_submit(e: WorkflowError) -> Self {
    match e {
      WorkflowError::EmptyImage => ApiError::InvalidImage,
      WorkflowError::DuplicatePeriod { .. } => ApiError::DoubleReport,
      e => {
        error!(error = %e, "upload failed");
        ApiError::UploadFault
      }
    }
  }

  /// Map a confirm failure onto the confirm endpoint's wire codes.
  pub fn from_confirm(e: WorkflowError) -> Self {
    match e {
      WorkflowError::NonFiniteValue => {
        ApiError::InvalidData("confirmed_value must be a finite number".into())
      }
      WorkflowError::NotFound(_) => ApiError::MeasureNotFound,
      WorkflowError::AlreadyConfirmed(_) => ApiError::ConfirmationDuplicate,
      e => {
        error!(error = %e, "confirm failed");
        ApiError::Internal
      }
    }
  }

  /// Map a list failure onto the list endpoint's wire codes.
  pub fn from_list(e: WorkflowError) -> Self {
    match e {
      WorkflowError::NoMeasurements(_) => ApiError::MeasuresNotFound,
      e => {
        error!(error = %e, "list failed");
        ApiError::Internal
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, description) = self.parts();
    (
      status,
      Json(json!({ "error_code": code, "error_description": description })),
    )
      .into_response()
  }
}
