//! Claim types — the fundamental unit of the Tally uniqueness ledger.
//!
//! A claim is a durable record that a specific identifier value of a specific
//! class has been used by an operation. Claims are never deleted; the only
//! mutation ever applied is the release of a renewable claim (`active` flips
//! to `false`, `released_at` is set) when its owning operation closes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identifier class ────────────────────────────────────────────────────────

/// The category of a claimed value. Closed enumeration; the ledger never
/// interprets a value beyond its class tag and literal string.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierClass {
  /// Internal shipment order number.
  ShipmentOrder,
  /// Carrier booking number.
  Booking,
  /// Container / air-waybill reference. The one renewable class under the
  /// default policy.
  Awb,
  /// Thermograph (temperature sensor) code; multi-valued on the operation.
  Thermograph,
  /// Security seal code; multi-valued on the operation.
  SecuritySeal,
  /// Customs seal code.
  CustomsSeal,
  /// Operator seal code.
  OperatorSeal,
  /// Combined sanitary-certificate / line-seal identifier, synthesized by the
  /// extractor from two other fields.
  SanitaryLineSeal,
}

impl IdentifierClass {
  /// Every class, in declaration order. Used to drive policy tables.
  pub const ALL: [IdentifierClass; 8] = [
    Self::ShipmentOrder,
    Self::Booking,
    Self::Awb,
    Self::Thermograph,
    Self::SecuritySeal,
    Self::CustomsSeal,
    Self::OperatorSeal,
    Self::SanitaryLineSeal,
  ];

  /// The discriminant string stored in the `class` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::ShipmentOrder => "shipment_order",
      Self::Booking => "booking",
      Self::Awb => "awb",
      Self::Thermograph => "thermograph",
      Self::SecuritySeal => "security_seal",
      Self::CustomsSeal => "customs_seal",
      Self::OperatorSeal => "operator_seal",
      Self::SanitaryLineSeal => "sanitary_line_seal",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "shipment_order" => Ok(Self::ShipmentOrder),
      "booking" => Ok(Self::Booking),
      "awb" => Ok(Self::Awb),
      "thermograph" => Ok(Self::Thermograph),
      "security_seal" => Ok(Self::SecuritySeal),
      "customs_seal" => Ok(Self::CustomsSeal),
      "operator_seal" => Ok(Self::OperatorSeal),
      "sanitary_line_seal" => Ok(Self::SanitaryLineSeal),
      other => Err(Error::UnknownClass(other.to_owned())),
    }
  }
}

// ─── Lifetime policy ─────────────────────────────────────────────────────────

/// How long a claim excludes other users of its `(class, value)` pair.
///
/// Derived strictly from the class via [`crate::extract::ExtractorConfig`];
/// never mutated after a claim is created.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
  /// Once used, the pair can never be claimed again, by anyone, ever —
  /// including after the owning operation is closed.
  Permanent,
  /// The pair is locked only while the owning operation is open; release
  /// makes it available again.
  Renewable,
}

impl Lifetime {
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Permanent => "permanent",
      Self::Renewable => "renewable",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "permanent" => Ok(Self::Permanent),
      "renewable" => Ok(Self::Renewable),
      other => Err(Error::UnknownLifetime(other.to_owned())),
    }
  }
}

// ─── Claim intent ────────────────────────────────────────────────────────────

/// A claim an operation intends to make, produced by the extractor before
/// anything touches the store. `value` is already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIntent {
  pub class:    IdentifierClass,
  pub value:    String,
  pub lifetime: Lifetime,
}

impl ClaimIntent {
  pub fn new(
    class: IdentifierClass,
    value: impl Into<String>,
    lifetime: Lifetime,
  ) -> Self {
    Self { class, value: value.into(), lifetime }
  }
}

// ─── Claim ───────────────────────────────────────────────────────────────────

/// One durable ledger row. `origin` and `actor` are audit metadata only; no
/// invariant depends on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
  pub claim_id:     Uuid,
  pub operation_id: Uuid,
  pub class:        IdentifierClass,
  pub value:        String,
  pub lifetime:     Lifetime,
  /// Meaningful only for renewable claims; a permanent claim conflicts
  /// regardless of this flag.
  pub active:       bool,
  pub origin:       Option<String>,
  pub actor:        Option<String>,
  pub created_at:   DateTime<Utc>,
  /// Set if and only if `active` is `false`.
  pub released_at:  Option<DateTime<Utc>>,
}

// ─── Conflicts ───────────────────────────────────────────────────────────────

/// Why an intended claim cannot be made. The distinction is user-visible: a
/// permanently used value tells the operator to stop, a locked value tells
/// them another operation must close first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
  /// The pair was claimed under the permanent policy; not retryable.
  PermanentlyUsed,
  /// The pair is held by an open operation; retryable once it closes.
  ActivelyLocked,
}

/// A detected violation of the exclusivity invariant for one intended claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
  pub class: IdentifierClass,
  pub value: String,
  pub kind:  ConflictKind,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn class_discriminants_round_trip() {
    for class in IdentifierClass::ALL {
      let s = class.discriminant();
      assert_eq!(IdentifierClass::from_discriminant(s).unwrap(), class);
      // serde tags must agree with the column discriminants
      let json = serde_json::to_value(class).unwrap();
      assert_eq!(json, serde_json::Value::String(s.to_owned()));
    }
  }

  #[test]
  fn lifetime_discriminants_round_trip() {
    for lt in [Lifetime::Permanent, Lifetime::Renewable] {
      assert_eq!(
        Lifetime::from_discriminant(lt.discriminant()).unwrap(),
        lt
      );
    }
    assert!(Lifetime::from_discriminant("forever").is_err());
  }
}
