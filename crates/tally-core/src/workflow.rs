//! The measurement workflow — intake, confirmation and listing.
//!
//! Owns every invariant of the measurement lifecycle:
//!
//! - at most one reading per customer/meter-type/calendar-month,
//! - `confirmed` transitions false→true exactly once,
//! - the extracted value is immutable once stored,
//! - the duplicate check runs before the costly external extraction call.
//!
//! The workflow itself is stateless; all state lives in measurement records
//! behind [`MeasurementStore`]. Collaborators are injected at construction —
//! there are no ambient singletons.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  extract::{ImagePayload, ValueExtractor},
  measurement::{Measurement, MeasurementSummary, MeterType, NewMeasurement},
  period::MonthWindow,
  store::{ConfirmOutcome, CreateOutcome, MeasurementStore},
};

pub struct MeasurementWorkflow<S, X> {
  store:     S,
  extractor: X,
}

impl<S, X> MeasurementWorkflow<S, X>
where
  S: MeasurementStore,
  X: ValueExtractor,
{
  pub fn new(store: S, extractor: X) -> Self {
    Self { store, extractor }
  }

  /// Intake a new reading: check the month is free, extract the value from
  /// the photograph, persist.
  ///
  /// The duplicate check precedes extraction so a reading that would be
  /// rejected anyway never pays for the external call or stores an image.
  /// The backend's unique month index re-checks at write time, which closes
  /// the check-then-act race between concurrent submits.
  pub async fn submit(
    &self,
    customer_code: &str,
    meter_type: MeterType,
    measured_at: DateTime<Utc>,
    image: ImagePayload,
  ) -> Result<Measurement> {
    if image.bytes.is_empty() {
      return Err(Error::EmptyImage);
    }

    let window = MonthWindow::containing(measured_at);
    let existing = self
      .store
      .find_by_period(customer_code, meter_type, window)
      .await
      .map_err(box_storage)?;
    if existing.is_some() {
      debug!(
        customer_code,
        %meter_type,
        month = %window.bucket(),
        "reading for this month already recorded"
      );
      return Err(Error::DuplicatePeriod {
        customer_code: customer_code.to_owned(),
        meter_type,
      });
    }

    let extraction = self
      .extractor
      .extract(&image)
      .await
      .map_err(|e| Error::Extraction(Box::new(e)))?;

    let outcome = self
      .store
      .create(NewMeasurement {
        customer_code:   customer_code.to_owned(),
        meter_type,
        measured_at,
        value:           extraction.value,
        image_reference: extraction.image_reference,
      })
      .await
      .map_err(box_storage)?;

    match outcome {
      CreateOutcome::Created(m) => {
        info!(id = %m.id, customer_code, %meter_type, "measurement recorded");
        Ok(m)
      }
      // A concurrent submit won the race between our check and our write.
      CreateOutcome::PeriodTaken => Err(Error::DuplicatePeriod {
        customer_code: customer_code.to_owned(),
        meter_type,
      }),
    }
  }

  /// Confirm a reading. Single-shot: the first confirm wins, every later
  /// one fails, and the losing side of a concurrent confirm sees
  /// [`Error::AlreadyConfirmed`].
  ///
  /// `confirmed_value` is validated but advisory — the stored value is
  /// immutable once extraction has produced it.
  pub async fn confirm(&self, id: Uuid, confirmed_value: Option<f64>) -> Result<()> {
    if confirmed_value.is_some_and(|v| !v.is_finite()) {
      return Err(Error::NonFiniteValue);
    }

    match self.store.mark_confirmed(id).await.map_err(box_storage)? {
      ConfirmOutcome::Confirmed => {
        info!(%id, "measurement confirmed");
        Ok(())
      }
      ConfirmOutcome::AlreadyConfirmed => Err(Error::AlreadyConfirmed(id)),
      ConfirmOutcome::Missing => Err(Error::NotFound(id)),
    }
  }

  /// All of a customer's readings as value-free summaries, optionally
  /// restricted to one meter type.
  ///
  /// An empty result is an error, not an empty success — callers rely on
  /// the 404 this turns into.
  pub async fn list(
    &self,
    customer_code: &str,
    meter_type: Option<MeterType>,
  ) -> Result<Vec<MeasurementSummary>> {
    let measurements = self
      .store
      .find_all_by_customer(customer_code, meter_type)
      .await
      .map_err(box_storage)?;

    if measurements.is_empty() {
      return Err(Error::NoMeasurements(customer_code.to_owned()));
    }

    Ok(
      measurements
        .into_iter()
        .map(MeasurementSummary::from)
        .collect(),
    )
  }
}

fn box_storage<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Storage(Box::new(e))
}
