//! The `MeasurementStore` trait and write-outcome types.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! The workflow depends on this abstraction, not on any concrete backend.
//!
//! Write operations report concurrency-sensitive outcomes as values rather
//! than backend errors: the period-uniqueness and single-confirm races are
//! resolved inside the backend (unique index, compare-and-set), and the
//! workflow only translates the outcome into its own error taxonomy.

use std::future::Future;

use uuid::Uuid;

use crate::{
  measurement::{Measurement, MeterType, NewMeasurement},
  period::MonthWindow,
};

/// Result of [`MeasurementStore::create`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
  /// The row was inserted.
  Created(Measurement),
  /// A measurement for the same customer, meter type and calendar month
  /// already exists; nothing was written.
  PeriodTaken,
}

/// Result of [`MeasurementStore::mark_confirmed`].
///
/// The transition must be an atomic compare-and-set: flip `confirmed` only
/// if it is currently false. Concurrent confirms of the same id yield
/// exactly one `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
  Confirmed,
  AlreadyConfirmed,
  Missing,
}

/// Abstraction over a measurement storage backend.
///
/// All operations are atomic at the single-record level; the workflow never
/// requires a multi-record transaction.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MeasurementStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find the measurement for `customer_code`/`meter_type` whose timestamp
  /// falls inside `window`, if any.
  fn find_by_period<'a>(
    &'a self,
    customer_code: &'a str,
    meter_type: MeterType,
    window: MonthWindow,
  ) -> impl Future<Output = Result<Option<Measurement>, Self::Error>> + Send + 'a;

  /// Retrieve a measurement by id. Returns `None` if not found.
  fn find_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Measurement>, Self::Error>> + Send + '_;

  /// All measurements for a customer, optionally restricted to one meter
  /// type.
  fn find_all_by_customer<'a>(
    &'a self,
    customer_code: &'a str,
    meter_type: Option<MeterType>,
  ) -> impl Future<Output = Result<Vec<Measurement>, Self::Error>> + Send + 'a;

  /// Persist a new measurement. The backend enforces one reading per
  /// customer/type/month at write time and reports a losing race as
  /// [`CreateOutcome::PeriodTaken`].
  fn create(
    &self,
    input: NewMeasurement,
  ) -> impl Future<Output = Result<CreateOutcome, Self::Error>> + Send + '_;

  /// Atomically set `confirmed = true` if it is currently false.
  fn mark_confirmed(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ConfirmOutcome, Self::Error>> + Send + '_;
}
