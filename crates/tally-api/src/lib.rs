//! JSON HTTP API for tally.
//!
//! Exposes an axum [`Router`] backed by any [`MeasurementStore`] and
//! [`ValueExtractor`] pairing. Transport concerns (TLS, auth) are the
//! caller's responsibility.
//!
//! | Method  | Path                     | Notes |
//! |---------|--------------------------|-------|
//! | `POST`  | `/upload`                | Intake a photographed reading |
//! | `PATCH` | `/confirm`               | Confirm a reading, once |
//! | `GET`   | `/{customer_code}/list`  | Optional `?measure_type=` filter |
//!
//! Every non-2xx response carries the `{error_code, error_description}`
//! envelope; see [`error::ApiError`].

pub mod confirm;
pub mod error;
pub mod list;
pub mod upload;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, patch, post},
};
use serde::Deserialize;
use tally_core::{
  extract::ValueExtractor, store::MeasurementStore, workflow::MeasurementWorkflow,
};

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Directory where images are staged while extraction is in flight.
  pub staging_dir:          PathBuf,
  pub recognition_api_key:  String,
  #[serde(default = "default_recognition_base_url")]
  pub recognition_base_url: String,
  #[serde(default = "default_recognition_model")]
  pub recognition_model:    String,
}

fn default_recognition_base_url() -> String {
  "https://generativelanguage.googleapis.com".into()
}

fn default_recognition_model() -> String { "gemini-1.5-flash".into() }

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for `workflow`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S, X>(workflow: Arc<MeasurementWorkflow<S, X>>) -> Router<()>
where
  S: MeasurementStore + 'static,
  X: ValueExtractor + 'static,
{
  Router::new()
    .route("/upload", post(upload::handler::<S, X>))
    .route("/confirm", patch(confirm::handler::<S, X>))
    .route("/{customer_code}/list", get(list::handler::<S, X>))
    .with_state(workflow)
}

#[cfg(test)]
mod tests;
