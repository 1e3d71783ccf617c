//! Core types and trait definitions for the Tally uniqueness ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod claim;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod normalize;
pub mod operation;

pub use error::{Error, Result};
