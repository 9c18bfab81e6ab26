//! Calendar-month windows.
//!
//! The duplicate-submission guard partitions time by the calendar month of
//! the reading's own timestamp. A window is the half-open interval
//! `[month start, next month start)`.

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// The calendar month containing a timestamp, as a half-open UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl MonthWindow {
  /// The window containing `ts`, computed from the timestamp's own calendar
  /// month — not the wall clock at insert time.
  pub fn containing(ts: DateTime<Utc>) -> Self {
    let start = month_start(ts.year(), ts.month());
    let end = if ts.month() == 12 {
      month_start(ts.year() + 1, 1)
    } else {
      month_start(ts.year(), ts.month() + 1)
    };
    Self { start, end }
  }

  /// `true` if `ts` falls inside the window. The start is inclusive, the
  /// end exclusive.
  pub fn contains(&self, ts: DateTime<Utc>) -> bool {
    self.start <= ts && ts < self.end
  }

  /// The `YYYY-MM` partition key the storage layer indexes on.
  pub fn bucket(&self) -> String {
    format!("{:04}-{:02}", self.start.year(), self.start.month())
  }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
  // Midnight on the first of the month always exists in UTC.
  Utc
    .with_ymd_and_hms(year, month, 1, 0, 0, 0)
    .single()
    .expect("UTC month start is unambiguous")
}
