//! Claim extraction — from one operation's field set to the complete list of
//! claims it would make.
//!
//! The extractor is pure: it never consults the ledger, and the same field
//! set always yields the same intents. Which classes are renewable, the
//! multi-value separator, and the derived-seal template prefix are all
//! configuration so that new identifier classes can be added on either side
//! of the policy without touching ledger logic.

use std::collections::BTreeSet;

use crate::{
  claim::{ClaimIntent, IdentifierClass, Lifetime},
  normalize::{normalize, split_multi},
  operation::OperationFields,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Extraction policy. The default mirrors the production ruleset: `/` as the
/// multi-value separator, `"PS."` as the derived-seal prefix, and the
/// container / AWB reference as the single renewable class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
  pub multi_separator:   char,
  pub derived_prefix:    String,
  pub renewable_classes: BTreeSet<IdentifierClass>,
}

impl Default for ExtractorConfig {
  fn default() -> Self {
    Self {
      multi_separator:   '/',
      derived_prefix:    "PS.".to_owned(),
      renewable_classes: BTreeSet::from([IdentifierClass::Awb]),
    }
  }
}

impl ExtractorConfig {
  /// The lifetime policy for a class. A pure function of the class under one
  /// configuration; claims derive their lifetime from this exactly once, at
  /// extraction.
  pub fn lifetime(&self, class: IdentifierClass) -> Lifetime {
    if self.renewable_classes.contains(&class) {
      Lifetime::Renewable
    } else {
      Lifetime::Permanent
    }
  }

  /// Synthesize the combined sanitary / line-seal identifier:
  /// `"<SANITARY>/<PREFIX><LINE>"` when both fields are present,
  /// `"<PREFIX><LINE>"` when only the line seal is, absent otherwise.
  pub fn derived_seal(
    &self,
    sanitary: Option<&str>,
    line: Option<&str>,
  ) -> Option<String> {
    let sanitary = normalize(sanitary);
    let line = normalize(line)?;

    match sanitary {
      Some(s) => Some(format!("{s}/{}{line}", self.derived_prefix)),
      None => Some(format!("{}{line}", self.derived_prefix)),
    }
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// Derives the full, order-independent claim list for one pending operation.
#[derive(Debug, Clone, Default)]
pub struct ClaimExtractor {
  config: ExtractorConfig,
}

impl ClaimExtractor {
  pub fn new(config: ExtractorConfig) -> Self { Self { config } }

  pub fn config(&self) -> &ExtractorConfig { &self.config }

  /// Extract every claim the operation would make. Empty values never claim;
  /// duplicate `(class, value)` pairs collapse to a single intent.
  pub fn extract(&self, fields: &OperationFields) -> Vec<ClaimIntent> {
    let mut intents: Vec<ClaimIntent> = Vec::new();

    let mut add = |class: IdentifierClass, value: Option<String>| {
      let Some(value) = value else { return };
      let lifetime = self.config.lifetime(class);
      let intent = ClaimIntent { class, value, lifetime };
      if !intents.contains(&intent) {
        intents.push(intent);
      }
    };

    // Single-value classes.
    add(
      IdentifierClass::ShipmentOrder,
      normalize(fields.shipment_order.as_deref()),
    );
    add(IdentifierClass::Booking, normalize(fields.booking.as_deref()));
    add(IdentifierClass::Awb, normalize(fields.awb.as_deref()));

    // Multi-value classes, split on the configured separator.
    for t in split_multi(fields.thermographs.as_deref(), self.config.multi_separator) {
      add(IdentifierClass::Thermograph, Some(t));
    }
    for s in split_multi(fields.security_seals.as_deref(), self.config.multi_separator) {
      add(IdentifierClass::SecuritySeal, Some(s));
    }

    add(
      IdentifierClass::CustomsSeal,
      normalize(fields.customs_seal.as_deref()),
    );
    add(
      IdentifierClass::OperatorSeal,
      normalize(fields.operator_seal.as_deref()),
    );

    // Derived class, synthesized from two source fields.
    add(
      IdentifierClass::SanitaryLineSeal,
      self
        .config
        .derived_seal(fields.sanitary_cert.as_deref(), fields.line_seal.as_deref()),
    );

    intents
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn extractor() -> ClaimExtractor { ClaimExtractor::default() }

  #[test]
  fn empty_fields_yield_no_intents() {
    assert!(extractor().extract(&OperationFields::default()).is_empty());
  }

  #[test]
  fn single_fields_claim_once_each() {
    let fields = OperationFields {
      booking: Some(" abc 123 ".into()),
      awb: Some("awb-1".into()),
      ..Default::default()
    };

    let intents = extractor().extract(&fields);
    assert_eq!(intents.len(), 2);
    assert!(intents.contains(&ClaimIntent::new(
      IdentifierClass::Booking,
      "ABC 123",
      Lifetime::Permanent,
    )));
    assert!(intents.contains(&ClaimIntent::new(
      IdentifierClass::Awb,
      "AWB-1",
      Lifetime::Renewable,
    )));
  }

  #[test]
  fn multi_fields_claim_per_element() {
    let fields = OperationFields {
      thermographs: Some("T1/ T1 /t2".into()),
      security_seals: Some("s9".into()),
      ..Default::default()
    };

    let intents = extractor().extract(&fields);
    let thermos: Vec<_> = intents
      .iter()
      .filter(|i| i.class == IdentifierClass::Thermograph)
      .map(|i| i.value.as_str())
      .collect();
    assert_eq!(thermos, vec!["T1", "T2"]);
    assert!(intents.contains(&ClaimIntent::new(
      IdentifierClass::SecuritySeal,
      "S9",
      Lifetime::Permanent,
    )));
  }

  #[test]
  fn derived_seal_formats_per_template() {
    let cfg = ExtractorConfig::default();
    assert_eq!(
      cfg.derived_seal(Some("SEN1"), Some("LIN9")),
      Some("SEN1/PS.LIN9".to_owned())
    );
    assert_eq!(
      cfg.derived_seal(None, Some("lin9")),
      Some("PS.LIN9".to_owned())
    );
    assert_eq!(cfg.derived_seal(Some("SEN1"), None), None);
    assert_eq!(cfg.derived_seal(None, None), None);
  }

  #[test]
  fn derived_seal_becomes_its_own_claim() {
    let fields = OperationFields {
      sanitary_cert: Some("SEN1".into()),
      line_seal: Some("LIN9".into()),
      ..Default::default()
    };

    let intents = extractor().extract(&fields);
    assert_eq!(
      intents,
      vec![ClaimIntent::new(
        IdentifierClass::SanitaryLineSeal,
        "SEN1/PS.LIN9",
        Lifetime::Permanent,
      )]
    );
  }

  #[test]
  fn same_value_same_class_collapses() {
    let fields = OperationFields {
      thermographs: Some("T1/T1".into()),
      ..Default::default()
    };
    assert_eq!(extractor().extract(&fields).len(), 1);
  }

  #[test]
  fn policy_is_configuration() {
    let config = ExtractorConfig {
      renewable_classes: BTreeSet::from([
        IdentifierClass::Awb,
        IdentifierClass::Thermograph,
      ]),
      ..Default::default()
    };
    let extractor = ClaimExtractor::new(config);

    let fields = OperationFields {
      thermographs: Some("T1".into()),
      booking: Some("B1".into()),
      ..Default::default()
    };

    let intents = extractor.extract(&fields);
    let by_class = |c| {
      intents
        .iter()
        .find(|i| i.class == c)
        .map(|i| i.lifetime)
        .unwrap()
    };
    assert_eq!(by_class(IdentifierClass::Thermograph), Lifetime::Renewable);
    assert_eq!(by_class(IdentifierClass::Booking), Lifetime::Permanent);
  }
}
