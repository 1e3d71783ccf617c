//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enum-like fields (class,
//! lifetime, state) are stored as their discriminant strings. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use tally_core::{
  claim::{Claim, IdentifierClass, Lifetime},
  operation::{Operation, OperationFields, OperationState},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// One `operations` row as read from SQLite, before decoding.
pub struct RawOperation {
  pub operation_id:       String,
  pub state:              String,
  pub created_at:         String,
  pub closed_at:          Option<String>,
  pub shipment_order:     Option<String>,
  pub booking:            Option<String>,
  pub awb:                Option<String>,
  pub thermographs:       Option<String>,
  pub security_seals:     Option<String>,
  pub customs_seal:       Option<String>,
  pub operator_seal:      Option<String>,
  pub sanitary_cert:      Option<String>,
  pub line_seal:          Option<String>,
  pub sanitary_line_seal: Option<String>,
  pub customs_ref:        Option<String>,
  pub driver_ref:         Option<String>,
  pub vehicle_ref:        Option<String>,
  pub carrier_ref:        Option<String>,
}

/// Column list matching [`RawOperation::from_row`]; keep the two in sync.
pub const OPERATION_COLUMNS: &str = "operation_id, state, created_at, \
   closed_at, shipment_order, booking, awb, thermographs, security_seals, \
   customs_seal, operator_seal, sanitary_cert, line_seal, sanitary_line_seal, \
   customs_ref, driver_ref, vehicle_ref, carrier_ref";

impl RawOperation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      operation_id:       row.get(0)?,
      state:              row.get(1)?,
      created_at:         row.get(2)?,
      closed_at:          row.get(3)?,
      shipment_order:     row.get(4)?,
      booking:            row.get(5)?,
      awb:                row.get(6)?,
      thermographs:       row.get(7)?,
      security_seals:     row.get(8)?,
      customs_seal:       row.get(9)?,
      operator_seal:      row.get(10)?,
      sanitary_cert:      row.get(11)?,
      line_seal:          row.get(12)?,
      sanitary_line_seal: row.get(13)?,
      customs_ref:        row.get(14)?,
      driver_ref:         row.get(15)?,
      vehicle_ref:        row.get(16)?,
      carrier_ref:        row.get(17)?,
    })
  }

  pub fn into_operation(self) -> Result<Operation> {
    Ok(Operation {
      operation_id: decode_uuid(&self.operation_id)?,
      state:        OperationState::from_discriminant(&self.state)?,
      created_at:   decode_dt(&self.created_at)?,
      closed_at:    self.closed_at.as_deref().map(decode_dt).transpose()?,
      fields:       OperationFields {
        shipment_order:     self.shipment_order,
        booking:            self.booking,
        awb:                self.awb,
        thermographs:       self.thermographs,
        security_seals:     self.security_seals,
        customs_seal:       self.customs_seal,
        operator_seal:      self.operator_seal,
        sanitary_cert:      self.sanitary_cert,
        line_seal:          self.line_seal,
        sanitary_line_seal: self.sanitary_line_seal,
        customs_ref:        self.customs_ref,
        driver_ref:         self.driver_ref,
        vehicle_ref:        self.vehicle_ref,
        carrier_ref:        self.carrier_ref,
      },
    })
  }
}

/// One `claims` row as read from SQLite, before decoding.
pub struct RawClaim {
  pub claim_id:     String,
  pub operation_id: String,
  pub class:        String,
  pub value:        String,
  pub lifetime:     String,
  pub active:       bool,
  pub origin:       Option<String>,
  pub actor:        Option<String>,
  pub created_at:   String,
  pub released_at:  Option<String>,
}

pub const CLAIM_COLUMNS: &str = "claim_id, operation_id, class, value, \
   lifetime, active, origin, actor, created_at, released_at";

impl RawClaim {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      claim_id:     row.get(0)?,
      operation_id: row.get(1)?,
      class:        row.get(2)?,
      value:        row.get(3)?,
      lifetime:     row.get(4)?,
      active:       row.get(5)?,
      origin:       row.get(6)?,
      actor:        row.get(7)?,
      created_at:   row.get(8)?,
      released_at:  row.get(9)?,
    })
  }

  pub fn into_claim(self) -> Result<Claim> {
    Ok(Claim {
      claim_id:     decode_uuid(&self.claim_id)?,
      operation_id: decode_uuid(&self.operation_id)?,
      class:        IdentifierClass::from_discriminant(&self.class)?,
      value:        self.value,
      lifetime:     Lifetime::from_discriminant(&self.lifetime)?,
      active:       self.active,
      origin:       self.origin,
      actor:        self.actor,
      created_at:   decode_dt(&self.created_at)?,
      released_at:  self.released_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
