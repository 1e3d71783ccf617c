//! [`SqliteLedger`] — the SQLite implementation of [`UniquenessLedger`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use tally_core::{
  claim::{Claim, ClaimIntent, Conflict, ConflictKind, Lifetime},
  ledger::{CommitError, UniquenessLedger},
  operation::{CloseOutcome, NewOperation, Operation, OperationState},
};

use crate::{
  encode::{
    CLAIM_COLUMNS, OPERATION_COLUMNS, RawClaim, RawOperation, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// A Tally uniqueness ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Every public
/// operation runs as one transaction on the connection's worker thread, so
/// callers may interleave `commit`, `release` and `check_conflicts` freely;
/// the partial unique indexes in the schema are the ultimate authority on
/// exclusivity, never any in-process state.
#[derive(Clone)]
pub struct SqliteLedger {
  conn: tokio_rusqlite::Connection,
}

/// Result of a commit attempt, carried out of the connection closure.
enum CommitAttempt {
  Committed,
  Conflicted(Vec<Conflict>),
}

/// Result of a close attempt, carried out of the connection closure.
enum CloseAttempt {
  NotFound,
  AlreadyClosed,
  Closed { released: u64 },
}

impl SqliteLedger {
  /// Open (or create) a ledger at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let ledger = Self { conn };
    ledger.init_schema().await?;
    Ok(ledger)
  }

  /// Open an in-memory ledger — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let ledger = Self { conn };
    ledger.init_schema().await?;
    Ok(ledger)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Conflict scan ───────────────────────────────────────────────────────────

/// Look up every intent against the persisted claims.
///
/// A permanent intent conflicts with any row for its pair, released or not; a
/// renewable intent conflicts only with an active row. Runs on the connection
/// thread so `commit` can re-scan on the same connection immediately after an
/// aborted transaction.
fn scan_conflicts(
  conn: &rusqlite::Connection,
  intents: &[ClaimIntent],
) -> rusqlite::Result<Vec<Conflict>> {
  let mut conflicts = Vec::new();

  for intent in intents {
    let sql = match intent.lifetime {
      Lifetime::Permanent => {
        "SELECT 1 FROM claims WHERE class = ?1 AND value = ?2 LIMIT 1"
      }
      Lifetime::Renewable => {
        "SELECT 1 FROM claims
         WHERE class = ?1 AND value = ?2 AND active = 1 LIMIT 1"
      }
    };

    let hit: Option<i64> = conn
      .query_row(
        sql,
        rusqlite::params![intent.class.discriminant(), intent.value],
        |r| r.get(0),
      )
      .optional()?;

    if hit.is_some() {
      conflicts.push(Conflict {
        class: intent.class,
        value: intent.value.clone(),
        kind:  match intent.lifetime {
          Lifetime::Permanent => ConflictKind::PermanentlyUsed,
          Lifetime::Renewable => ConflictKind::ActivelyLocked,
        },
      });
    }
  }

  Ok(conflicts)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── UniquenessLedger impl ───────────────────────────────────────────────────

impl UniquenessLedger for SqliteLedger {
  type Error = Error;

  // ── Claims ────────────────────────────────────────────────────────────────

  async fn check_conflicts(&self, intents: &[ClaimIntent]) -> Result<Vec<Conflict>> {
    let intents = intents.to_vec();
    let conflicts = self
      .conn
      .call(move |conn| Ok(scan_conflicts(conn, &intents)?))
      .await?;
    Ok(conflicts)
  }

  async fn commit(
    &self,
    draft: NewOperation,
    intents: Vec<ClaimIntent>,
  ) -> Result<Operation, CommitError<Error>> {
    let operation = Operation {
      operation_id: Uuid::new_v4(),
      state:        OperationState::Open,
      fields:       draft.fields,
      created_at:   Utc::now(),
      closed_at:    None,
    };

    // Build the claim rows up front; the closure only moves strings.
    let op_id_str = encode_uuid(operation.operation_id);
    let now_str   = encode_dt(operation.created_at);
    let fields    = operation.fields.clone();
    let origin    = draft.origin;
    let actor     = draft.actor;

    let claim_rows: Vec<(String, String, String, String)> = intents
      .iter()
      .map(|i| {
        (
          encode_uuid(Uuid::new_v4()),
          i.class.discriminant().to_owned(),
          i.value.clone(),
          i.lifetime.discriminant().to_owned(),
        )
      })
      .collect();

    let attempt = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          &format!(
            "INSERT INTO operations ({OPERATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17, ?18)"
          ),
          rusqlite::params![
            op_id_str,
            OperationState::Open.discriminant(),
            now_str,
            Option::<String>::None,
            fields.shipment_order,
            fields.booking,
            fields.awb,
            fields.thermographs,
            fields.security_seals,
            fields.customs_seal,
            fields.operator_seal,
            fields.sanitary_cert,
            fields.line_seal,
            fields.sanitary_line_seal,
            fields.customs_ref,
            fields.driver_ref,
            fields.vehicle_ref,
            fields.carrier_ref,
          ],
        )?;

        let mut violated = false;
        for (claim_id, class, value, lifetime) in &claim_rows {
          let inserted = tx.execute(
            "INSERT INTO claims (claim_id, operation_id, class, value,
                                 lifetime, active, origin, actor, created_at,
                                 released_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8, NULL)",
            rusqlite::params![
              claim_id, op_id_str, class, value, lifetime, origin, actor,
              now_str,
            ],
          );
          match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
              violated = true;
              break;
            }
            Err(e) => return Err(e.into()),
          }
        }

        if violated {
          // Abort the whole unit, then re-scan on the same connection to
          // name every colliding pair — a multi-key commit can violate more
          // than one constraint at once, and the raw SQLite error does not
          // say which.
          tx.rollback()?;
          let conflicts = scan_conflicts(conn, &intents)?;
          return Ok(CommitAttempt::Conflicted(conflicts));
        }

        tx.commit()?;
        Ok(CommitAttempt::Committed)
      })
      .await
      .map_err(|e| CommitError::Storage(Error::Database(e)))?;

    match attempt {
      CommitAttempt::Committed => Ok(operation),
      CommitAttempt::Conflicted(conflicts) => Err(CommitError::Conflict(conflicts)),
    }
  }

  async fn release(&self, operation_id: Uuid) -> Result<Option<u64>> {
    let op_id_str = encode_uuid(operation_id);
    let now_str   = encode_dt(Utc::now());

    let released = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM operations WHERE operation_id = ?1",
            rusqlite::params![op_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }

        let released = tx.execute(
          "UPDATE claims SET active = 0, released_at = ?2
           WHERE operation_id = ?1 AND lifetime = 'renewable' AND active = 1",
          rusqlite::params![op_id_str, now_str],
        )? as u64;

        tx.commit()?;
        Ok(Some(released))
      })
      .await?;

    Ok(released)
  }

  // ── Operations ────────────────────────────────────────────────────────────

  async fn close(&self, operation_id: Uuid) -> Result<Option<CloseOutcome>> {
    let op_id_str = encode_uuid(operation_id);
    let now_str   = encode_dt(Utc::now());

    let attempt = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let state: Option<String> = tx
          .query_row(
            "SELECT state FROM operations WHERE operation_id = ?1",
            rusqlite::params![op_id_str],
            |r| r.get(0),
          )
          .optional()?;

        let Some(state) = state else {
          return Ok(CloseAttempt::NotFound);
        };
        if state == OperationState::Closed.discriminant() {
          return Ok(CloseAttempt::AlreadyClosed);
        }

        // State flip and claim release are one unit: a crash can never leave
        // the operation closed with its locks still held, nor the reverse.
        tx.execute(
          "UPDATE operations SET state = ?2, closed_at = ?3
           WHERE operation_id = ?1",
          rusqlite::params![
            op_id_str,
            OperationState::Closed.discriminant(),
            now_str,
          ],
        )?;

        let released = tx.execute(
          "UPDATE claims SET active = 0, released_at = ?2
           WHERE operation_id = ?1 AND lifetime = 'renewable' AND active = 1",
          rusqlite::params![op_id_str, now_str],
        )? as u64;

        tx.commit()?;
        Ok(CloseAttempt::Closed { released })
      })
      .await?;

    match attempt {
      CloseAttempt::NotFound => Ok(None),
      CloseAttempt::AlreadyClosed => Ok(Some(CloseOutcome {
        state:          OperationState::Closed,
        already_closed: true,
        released:       0,
      })),
      CloseAttempt::Closed { released } => Ok(Some(CloseOutcome {
        state: OperationState::Closed,
        already_closed: false,
        released,
      })),
    }
  }

  async fn get_operation(&self, operation_id: Uuid) -> Result<Option<Operation>> {
    let op_id_str = encode_uuid(operation_id);

    let raw: Option<RawOperation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {OPERATION_COLUMNS} FROM operations
                 WHERE operation_id = ?1"
              ),
              rusqlite::params![op_id_str],
              RawOperation::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawOperation::into_operation).transpose()
  }

  async fn list_operations(
    &self,
    state: Option<OperationState>,
  ) -> Result<Vec<Operation>> {
    let state_str = state.map(|s| s.discriminant().to_owned());

    let raws: Vec<RawOperation> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = state_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE state = ?1
             ORDER BY created_at"
          ))?;
          stmt
            .query_map(rusqlite::params![s], RawOperation::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations ORDER BY created_at"
          ))?;
          stmt
            .query_map([], RawOperation::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOperation::into_operation).collect()
  }

  async fn claims_for(&self, operation_id: Uuid) -> Result<Vec<Claim>> {
    let op_id_str = encode_uuid(operation_id);

    let raws: Vec<RawClaim> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CLAIM_COLUMNS} FROM claims WHERE operation_id = ?1
           ORDER BY created_at, class, value"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![op_id_str], RawClaim::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClaim::into_claim).collect()
  }
}
