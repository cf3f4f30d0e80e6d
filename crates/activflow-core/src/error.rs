//! Error taxonomy shared by every operation of the core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The referenced object does not exist or is soft-deleted.
  #[error("{0}")]
  NotFound(String),

  /// The caller asked for something outside the scope it is entitled to.
  #[error("{0}")]
  Forbidden(String),

  /// Malformed input: bad date range, invalid payload, ceiling violation.
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Unauthorized(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend failure. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
