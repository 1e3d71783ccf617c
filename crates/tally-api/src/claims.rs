//! Handler for the advisory `/claims/check` endpoint.

use axum::{Json, extract::State};
use serde::Serialize;
use tally_core::{
  claim::{ClaimIntent, Conflict},
  ledger::UniquenessLedger,
};

use crate::{
  AppState,
  error::ApiError,
  operations::{OperationBody, resolve_fields},
};

/// Response of `POST /claims/check`: the claims the body would make and the
/// subset that currently conflicts. Advisory only — commit remains the
/// authority, so an empty conflict list is no reservation.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
  pub intents:   Vec<ClaimIntent>,
  pub conflicts: Vec<Conflict>,
}

/// `POST /claims/check` — same body as `POST /operations`.
pub async fn check<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<OperationBody>,
) -> Result<Json<CheckResponse>, ApiError>
where
  S: UniquenessLedger,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let fields = resolve_fields(&state.extractor, &body);
  let intents = state.extractor.extract(&fields);

  let conflicts = state
    .ledger
    .check_conflicts(&intents)
    .await
    .map_err(|e| ApiError::Ledger(Box::new(e)))?;

  Ok(Json(CheckResponse { intents, conflicts }))
}
