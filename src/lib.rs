//! boonbot — wager resolution engine and b00n ledger.
//!
//! Library crate exposing all modules for use by integration tests,
//! the transport layer, and the binary entry point.

pub mod config;
pub mod curve;
pub mod engine;
pub mod ledger;
pub mod types;
