//! Handlers for `/operations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/operations` | Optional `?state=open\|closed` |
//! | `POST` | `/operations` | Body: [`OperationBody`]; 201 or 409 with conflicts |
//! | `GET`  | `/operations/:id` | 404 if not found |
//! | `GET`  | `/operations/:id/claims` | All claims, released ones included |
//! | `POST` | `/operations/:id/close` | Idempotent; releases renewable claims |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tally_core::{
  claim::Claim,
  extract::ClaimExtractor,
  ledger::{CommitError, UniquenessLedger},
  normalize::{join_multi, normalize, split_multi},
  operation::{CloseOutcome, NewOperation, Operation, OperationFields, OperationState},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Intake body ──────────────────────────────────────────────────────────────

/// Raw field set accepted by `POST /operations` and `POST /claims/check`.
/// Values arrive as the operator (or OCR) typed them; normalization happens
/// here, before extraction. Catalog resolution of driver / vehicle / carrier
/// is the caller's job — the `*_ref` fields are stored opaquely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationBody {
  pub shipment_order: Option<String>,
  pub booking:        Option<String>,
  pub awb:            Option<String>,
  pub thermographs:   Option<String>,
  pub security_seals: Option<String>,
  pub customs_seal:   Option<String>,
  pub operator_seal:  Option<String>,
  pub sanitary_cert:  Option<String>,
  pub line_seal:      Option<String>,
  pub customs_ref:    Option<String>,
  pub driver_ref:     Option<String>,
  pub vehicle_ref:    Option<String>,
  pub carrier_ref:    Option<String>,
  pub origin:         Option<String>,
  pub actor:          Option<String>,
}

/// Normalize a raw body into the canonical field set, including the derived
/// sanitary / line-seal identifier and the joined multi-valued fields.
pub fn resolve_fields(
  extractor: &ClaimExtractor,
  body: &OperationBody,
) -> OperationFields {
  let cfg = extractor.config();
  let sep = cfg.multi_separator;

  OperationFields {
    shipment_order:     normalize(body.shipment_order.as_deref()),
    booking:            normalize(body.booking.as_deref()),
    awb:                normalize(body.awb.as_deref()),
    thermographs:       join_multi(split_multi(body.thermographs.as_deref(), sep), sep),
    security_seals:     join_multi(split_multi(body.security_seals.as_deref(), sep), sep),
    customs_seal:       normalize(body.customs_seal.as_deref()),
    operator_seal:      normalize(body.operator_seal.as_deref()),
    sanitary_cert:      normalize(body.sanitary_cert.as_deref()),
    line_seal:          normalize(body.line_seal.as_deref()),
    sanitary_line_seal: cfg
      .derived_seal(body.sanitary_cert.as_deref(), body.line_seal.as_deref()),
    customs_ref:        normalize(body.customs_ref.as_deref()),
    driver_ref:         normalize(body.driver_ref.as_deref()),
    vehicle_ref:        normalize(body.vehicle_ref.as_deref()),
    carrier_ref:        normalize(body.carrier_ref.as_deref()),
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /operations` — normalize, extract claims, commit atomically.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<OperationBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: UniquenessLedger,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let fields = resolve_fields(&state.extractor, &body);
  let intents = state.extractor.extract(&fields);

  let draft = NewOperation {
    fields,
    origin: normalize(body.origin.as_deref()),
    actor: normalize(body.actor.as_deref()),
  };

  let operation = state
    .ledger
    .commit(draft, intents)
    .await
    .map_err(|e| match e {
      CommitError::Conflict(conflicts) => {
        tracing::info!(count = conflicts.len(), "commit rejected on conflicts");
        ApiError::Conflict(conflicts)
      }
      CommitError::Storage(e) => ApiError::Ledger(Box::new(e)),
    })?;

  tracing::info!(operation_id = %operation.operation_id, "operation committed");
  Ok((StatusCode::CREATED, Json(operation)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub state: Option<OperationState>,
}

/// `GET /operations[?state=<state>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Operation>>, ApiError>
where
  S: UniquenessLedger,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let operations = state
    .ledger
    .list_operations(params.state)
    .await
    .map_err(|e| ApiError::Ledger(Box::new(e)))?;
  Ok(Json(operations))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /operations/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Operation>, ApiError>
where
  S: UniquenessLedger,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let operation = state
    .ledger
    .get_operation(id)
    .await
    .map_err(|e| ApiError::Ledger(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("operation {id} not found")))?;
  Ok(Json(operation))
}

// ─── Claims of one operation ──────────────────────────────────────────────────

/// `GET /operations/:id/claims`
pub async fn claims<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Claim>>, ApiError>
where
  S: UniquenessLedger,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state
    .ledger
    .get_operation(id)
    .await
    .map_err(|e| ApiError::Ledger(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("operation {id} not found")))?;

  let claims = state
    .ledger
    .claims_for(id)
    .await
    .map_err(|e| ApiError::Ledger(Box::new(e)))?;
  Ok(Json(claims))
}

// ─── Close ────────────────────────────────────────────────────────────────────

/// `POST /operations/:id/close` — idempotent forward transition.
pub async fn close_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CloseOutcome>, ApiError>
where
  S: UniquenessLedger,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let outcome = state
    .ledger
    .close(id)
    .await
    .map_err(|e| ApiError::Ledger(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("operation {id} not found")))?;

  if !outcome.already_closed {
    tracing::info!(
      operation_id = %id,
      released = outcome.released,
      "operation closed"
    );
  }
  Ok(Json(outcome))
}
