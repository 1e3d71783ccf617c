//! SQLite backend for the Tally uniqueness ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The database file is the single
//! source of truth: both exclusivity invariants are enforced by partial
//! unique indexes, never by in-process state.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteLedger;
