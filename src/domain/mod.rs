//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw records and the daily / enriched series (`types`)
//! - the typed station summary (`summary`)
//! - forecast and backtest outputs (`forecast`)
//! - run configuration (`config`)

pub mod config;
pub mod forecast;
pub mod summary;
pub mod types;

pub use config::*;
pub use forecast::*;
pub use summary::*;
pub use types::*;
