//! Error types for `tally-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid claim intent: {0}")]
  InvalidIntent(String),

  #[error("unknown identifier class discriminant: {0:?}")]
  UnknownClass(String),

  #[error("unknown lifetime discriminant: {0:?}")]
  UnknownLifetime(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
