//! Error types for `tally-extract`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to stage image: {0}")]
  Staging(#[source] std::io::Error),

  #[error("recognition request failed: {0}")]
  Http(#[source] reqwest::Error),

  #[error("recognition API error {status}: {body}")]
  Api { status: u16, body: String },

  #[error("upload response carried no file reference")]
  MissingFileUri,

  #[error("recognition reply carried no text")]
  EmptyReply,

  #[error("recognition reply is not a number: {0:?}")]
  UnparseableValue(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
