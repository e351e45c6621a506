//! `ridership-curves` library crate.
//!
//! The binary (`ridership`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the statistics and forecast stages can be driven from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod stats;
