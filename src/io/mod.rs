//! Input/output helpers.
//!
//! - CSV ingest of ride files and the station map (`ingest`)
//! - result exports (CSV/JSON) (`export`)
//! - JSON run configuration (`config`)

pub mod config;
pub mod export;
pub mod ingest;

pub use config::*;
pub use export::*;
pub use ingest::*;
