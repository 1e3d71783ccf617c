//! Operation — the logistics record that owns a set of claims.
//!
//! An operation moves through exactly one transition, `Open → Closed`, and
//! closing is the only event that releases its renewable claims. There is no
//! reopen and no delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
  Open,
  Closed,
}

impl OperationState {
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::Closed => "closed",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "open" => Ok(Self::Open),
      "closed" => Ok(Self::Closed),
      other => Err(Error::InvalidIntent(format!(
        "unknown operation state: {other:?}"
      ))),
    }
  }

  pub fn is_closed(&self) -> bool { matches!(self, Self::Closed) }
}

// ─── Field set ───────────────────────────────────────────────────────────────

/// The normalized field set of one logistics operation. Every value here has
/// already been through the normalizer; multi-valued fields are stored in
/// their joined canonical form (e.g. `"T1/T2"`).
///
/// `driver_ref`, `vehicle_ref` and `carrier_ref` are opaque references
/// resolved by the intake layer against its catalogs; the ledger never
/// interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFields {
  pub shipment_order:     Option<String>,
  pub booking:            Option<String>,
  pub awb:                Option<String>,
  pub thermographs:       Option<String>,
  pub security_seals:     Option<String>,
  pub customs_seal:       Option<String>,
  pub operator_seal:      Option<String>,
  pub sanitary_cert:      Option<String>,
  pub line_seal:          Option<String>,
  /// Synthesized from `sanitary_cert` and `line_seal`; stored so report rows
  /// never have to re-derive it.
  pub sanitary_line_seal: Option<String>,
  pub customs_ref:        Option<String>,
  pub driver_ref:         Option<String>,
  pub vehicle_ref:        Option<String>,
  pub carrier_ref:        Option<String>,
}

// ─── Operation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
  pub operation_id: Uuid,
  pub state:        OperationState,
  pub fields:       OperationFields,
  /// Server-assigned; never changes after creation.
  pub created_at:   DateTime<Utc>,
  pub closed_at:    Option<DateTime<Utc>>,
}

// ─── NewOperation ────────────────────────────────────────────────────────────

/// Input to [`crate::ledger::UniquenessLedger::commit`].
/// `operation_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewOperation {
  pub fields: OperationFields,
  /// Audit metadata copied onto every claim the commit creates.
  pub origin: Option<String>,
  pub actor:  Option<String>,
}

impl NewOperation {
  pub fn new(fields: OperationFields) -> Self {
    Self { fields, origin: None, actor: None }
  }
}

// ─── Close outcome ───────────────────────────────────────────────────────────

/// Result of [`crate::ledger::UniquenessLedger::close`]. Closing an already
/// closed operation is a successful no-op with `already_closed = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
  pub state:          OperationState,
  pub already_closed: bool,
  /// Number of renewable claims this call released; zero on a repeat close.
  pub released:       u64,
}
