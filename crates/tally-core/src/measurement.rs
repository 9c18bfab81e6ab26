//! Measurement — the sole entity of the service.
//!
//! A measurement is one photographed reading of one customer's meter. The
//! numeric value is produced by the extraction collaborator at intake and is
//! immutable afterwards; confirmation flips a single boolean exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Meter type ──────────────────────────────────────────────────────────────

/// The kind of utility meter a reading was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeterType {
  Water,
  Gas,
}

impl MeterType {
  /// The discriminant string stored in the database and used on the wire.
  /// Must match the `rename_all = "UPPERCASE"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Water => "WATER",
      Self::Gas => "GAS",
    }
  }

  /// Parse a wire value. Case-insensitive: `"water"`, `"Water"` and
  /// `"WATER"` all select the same type.
  pub fn parse(s: &str) -> Option<Self> {
    match s.to_ascii_uppercase().as_str() {
      "WATER" => Some(Self::Water),
      "GAS" => Some(Self::Gas),
      _ => None,
    }
  }
}

impl std::fmt::Display for MeterType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Measurement ─────────────────────────────────────────────────────────────

/// One meter reading. The id is assigned at creation and never changes;
/// `value`, once non-null, is immutable; `confirmed` transitions false→true
/// at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
  pub id:              Uuid,
  /// Billing account the reading belongs to. Not unique — a customer
  /// accumulates one measurement per meter type per month.
  pub customer_code:   String,
  pub meter_type:      MeterType,
  /// The instant the reading applies to — supplied by the caller, not the
  /// server clock.
  pub measured_at:     DateTime<Utc>,
  /// Extracted reading. Nullable to leave room for asynchronous extraction;
  /// with the current synchronous intake it is always set after creation.
  pub value:           Option<f64>,
  /// Stable, externally dereferenceable locator for the uploaded image.
  pub image_reference: String,
  pub confirmed:       bool,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::MeasurementStore::create`].
/// Ids and audit timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMeasurement {
  pub customer_code:   String,
  pub meter_type:      MeterType,
  pub measured_at:     DateTime<Utc>,
  pub value:           f64,
  pub image_reference: String,
}

// ─── Summary projection ──────────────────────────────────────────────────────

/// The projection served by the list operation. Deliberately excludes the
/// numeric `value` — listing readings does not expose them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementSummary {
  pub id:              Uuid,
  pub measured_at:     DateTime<Utc>,
  pub meter_type:      MeterType,
  pub confirmed:       bool,
  pub image_reference: String,
}

impl From<Measurement> for MeasurementSummary {
  fn from(m: Measurement) -> Self {
    Self {
      id:              m.id,
      measured_at:     m.measured_at,
      meter_type:      m.meter_type,
      confirmed:       m.confirmed,
      image_reference: m.image_reference,
    }
  }
}
