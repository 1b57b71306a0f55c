//! OSRM Pipeline - route tables and TSP sequencing on top of OSRM
//!
//! Turns stop tables into OSRM table, route and trip requests and normalizes
//! the responses into per-leg, per-stop and per-route tables.

pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod io;
pub mod services;
pub mod types;

pub use error::{OsrmError, OsrmResult};
