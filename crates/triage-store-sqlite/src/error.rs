//! Error type for `triage-store-sqlite`.

use thiserror::Error;
use triage_core::DomainError;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] triage_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// Raised by helpers that run inside a connection closure.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value that does not map onto a domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl DomainError for Error {
  fn domain(&self) -> Option<&triage_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
