//! Error types for `triage-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("sla policy not found: {0}")]
  PolicyNotFound(Uuid),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The policy collection changed since the caller last read it.
  #[error("policy collection version mismatch: expected {expected}, found {actual}")]
  VersionConflict { expected: u64, actual: u64 },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Access to the domain [`Error`] carried inside a backend error, if any.
///
/// HTTP layers use this to tell "policy not found" apart from "database
/// unreachable" without knowing the concrete backend.
pub trait DomainError {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
