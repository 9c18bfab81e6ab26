//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, meter types as their wire discriminant.

use chrono::{DateTime, Utc};
use tally_core::measurement::{Measurement, MeterType};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── MeterType ───────────────────────────────────────────────────────────────

pub fn decode_meter_type(s: &str) -> Result<MeterType> {
  MeterType::parse(s).ok_or_else(|| Error::UnknownMeterType(s.to_owned()))
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `measurements` row.
pub struct RawMeasurement {
  pub measurement_id:  String,
  pub customer_code:   String,
  pub meter_type:      String,
  pub measured_at:     String,
  pub value:           Option<f64>,
  pub image_reference: String,
  pub confirmed:       bool,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawMeasurement {
  pub fn into_measurement(self) -> Result<Measurement> {
    Ok(Measurement {
      id:              decode_uuid(&self.measurement_id)?,
      customer_code:   self.customer_code,
      meter_type:      decode_meter_type(&self.meter_type)?,
      measured_at:     decode_dt(&self.measured_at)?,
      value:           self.value,
      image_reference: self.image_reference,
      confirmed:       self.confirmed,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}
