//! `airlookup` - Resolve aircraft identity metadata from ICAO24 addresses
//!
//! This library provides lookups against a public aircraft metadata service
//! and a key-value aircraft table whose connection string is kept in a key
//! vault, plus bulk import of aircraft database CSV files into that table.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod online;
pub mod output;
pub mod record;
pub mod router;
pub mod secrets;
pub mod sync;
pub mod table;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use online::{OnlineLookupClient, OnlineMetadata};
pub use record::{AircraftEntity, AircraftRecord, Icao24, RecordPatch};
pub use router::{Outcome, Router};
pub use secrets::SecretResolver;
pub use table::{TableBackend, TableStore};
