//! Error types for `tally-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::measurement::MeterType;

#[derive(Debug, Error)]
pub enum Error {
  #[error("image payload is empty")]
  EmptyImage,

  #[error("confirmed value must be a finite number")]
  NonFiniteValue,

  #[error("a {meter_type} reading already exists for customer {customer_code} in this month")]
  DuplicatePeriod {
    customer_code: String,
    meter_type:    MeterType,
  },

  #[error("measurement not found: {0}")]
  NotFound(Uuid),

  #[error("measurement {0} is already confirmed")]
  AlreadyConfirmed(Uuid),

  #[error("no measurements recorded for customer {0:?}")]
  NoMeasurements(String),

  #[error("value extraction failed: {0}")]
  Extraction(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
