//! SQL schema for the tally SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS measurements (
    measurement_id  TEXT PRIMARY KEY,
    customer_code   TEXT NOT NULL,
    meter_type      TEXT NOT NULL,    -- 'WATER' | 'GAS'
    measured_at     TEXT NOT NULL,    -- ISO 8601 UTC; caller-supplied
    month_bucket    TEXT NOT NULL,    -- 'YYYY-MM' of measured_at
    value           REAL,             -- NULL only until extraction completes
    image_reference TEXT NOT NULL,
    confirmed       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,    -- server-assigned
    updated_at      TEXT NOT NULL     -- server-assigned
);

-- One reading per customer, meter type and calendar month. This index is the
-- serialization point for concurrent submits: whichever insert arrives second
-- is rejected here, regardless of what its pre-insert duplicate check saw.
CREATE UNIQUE INDEX IF NOT EXISTS measurements_period_idx
    ON measurements(customer_code, meter_type, month_bucket);

CREATE INDEX IF NOT EXISTS measurements_customer_idx
    ON measurements(customer_code);

PRAGMA user_version = 1;
";
