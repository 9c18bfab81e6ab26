//! [`SqliteStore`] — the SQLite implementation of [`MeasurementStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use tally_core::{
  measurement::{Measurement, MeterType, NewMeasurement},
  period::MonthWindow,
  store::{ConfirmOutcome, CreateOutcome, MeasurementStore},
};

use crate::{
  Error, Result,
  encode::{RawMeasurement, encode_dt, encode_uuid},
  schema::SCHEMA,
};

const COLUMNS: &str = "measurement_id, customer_code, meter_type, measured_at, \
                       value, image_reference, confirmed, created_at, updated_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A measurement store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMeasurement> {
  Ok(RawMeasurement {
    measurement_id:  row.get(0)?,
    customer_code:   row.get(1)?,
    meter_type:      row.get(2)?,
    measured_at:     row.get(3)?,
    value:           row.get(4)?,
    image_reference: row.get(5)?,
    confirmed:       row.get(6)?,
    created_at:      row.get(7)?,
    updated_at:      row.get(8)?,
  })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── MeasurementStore impl ───────────────────────────────────────────────────

impl MeasurementStore for SqliteStore {
  type Error = Error;

  async fn find_by_period(
    &self,
    customer_code: &str,
    meter_type: MeterType,
    window: MonthWindow,
  ) -> Result<Option<Measurement>> {
    let customer  = customer_code.to_owned();
    let type_str  = meter_type.as_str();
    let start_str = encode_dt(window.start);
    let end_str   = encode_dt(window.end);

    let raw: Option<RawMeasurement> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {COLUMNS} FROM measurements
                 WHERE customer_code = ?1 AND meter_type = ?2
                   AND measured_at >= ?3 AND measured_at < ?4"
              ),
              rusqlite::params![customer, type_str, start_str, end_str],
              row_to_raw,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMeasurement::into_measurement).transpose()
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Measurement>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMeasurement> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COLUMNS} FROM measurements WHERE measurement_id = ?1"),
              rusqlite::params![id_str],
              row_to_raw,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMeasurement::into_measurement).transpose()
  }

  async fn find_all_by_customer(
    &self,
    customer_code: &str,
    meter_type: Option<MeterType>,
  ) -> Result<Vec<Measurement>> {
    let customer = customer_code.to_owned();
    let type_str = meter_type.map(MeterType::as_str);

    let raws: Vec<RawMeasurement> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(t) = type_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM measurements
             WHERE customer_code = ?1 AND meter_type = ?2
             ORDER BY measured_at"
          ))?;
          stmt
            .query_map(rusqlite::params![customer, t], row_to_raw)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM measurements
             WHERE customer_code = ?1
             ORDER BY measured_at"
          ))?;
          stmt
            .query_map(rusqlite::params![customer], row_to_raw)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawMeasurement::into_measurement)
      .collect()
  }

  async fn create(&self, input: NewMeasurement) -> Result<CreateOutcome> {
    let now = Utc::now();
    let measurement = Measurement {
      id:              Uuid::new_v4(),
      customer_code:   input.customer_code,
      meter_type:      input.meter_type,
      measured_at:     input.measured_at,
      value:           Some(input.value),
      image_reference: input.image_reference,
      confirmed:       false,
      created_at:      now,
      updated_at:      now,
    };

    let id_str       = encode_uuid(measurement.id);
    let customer     = measurement.customer_code.clone();
    let type_str     = measurement.meter_type.as_str();
    let measured_str = encode_dt(measurement.measured_at);
    let bucket       = MonthWindow::containing(measurement.measured_at).bucket();
    let value        = measurement.value;
    let image_ref    = measurement.image_reference.clone();
    let created_str  = encode_dt(measurement.created_at);
    let updated_str  = encode_dt(measurement.updated_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO measurements (
             measurement_id, customer_code, meter_type, measured_at,
             month_bucket, value, image_reference, confirmed,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)",
          rusqlite::params![
            id_str,
            customer,
            type_str,
            measured_str,
            bucket,
            value,
            image_ref,
            created_str,
            updated_str,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          // The unique month index rejected the row.
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if inserted {
      Ok(CreateOutcome::Created(measurement))
    } else {
      Ok(CreateOutcome::PeriodTaken)
    }
  }

  async fn mark_confirmed(&self, id: Uuid) -> Result<ConfirmOutcome> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        // Compare-and-set: only the transition false→true touches a row.
        let changed = conn.execute(
          "UPDATE measurements SET confirmed = 1, updated_at = ?2
           WHERE measurement_id = ?1 AND confirmed = 0",
          rusqlite::params![id_str, now_str],
        )?;
        if changed == 1 {
          return Ok(ConfirmOutcome::Confirmed);
        }

        // Zero rows: the id is unknown, or it lost the confirm race.
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM measurements WHERE measurement_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        Ok(if exists {
          ConfirmOutcome::AlreadyConfirmed
        } else {
          ConfirmOutcome::Missing
        })
      })
      .await?;

    Ok(outcome)
  }
}
