//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::claim::Conflict;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Commit lost its uniqueness race; the body carries every offending
  /// `(class, value, kind)` triple so the caller can tell a permanently
  /// blocked value from one that frees up when its holder closes.
  #[error("uniqueness conflict on {} claim(s)", .0.len())]
  Conflict(Vec<Conflict>),

  #[error("ledger error: {0}")]
  Ledger(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Conflict(conflicts) => (
        StatusCode::CONFLICT,
        Json(json!({ "conflicts": conflicts })),
      )
        .into_response(),
      ApiError::Ledger(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
      )
        .into_response(),
    }
  }
}
