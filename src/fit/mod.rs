//! Forecast fitting orchestration.
//!
//! Responsibilities:
//!
//! - generate the candidate layout grid (changepoints × yearly order)
//! - fit each candidate layout (parallel)
//! - select the best layout using BIC + guardrails
//! - project the horizon and backtest the selected layout

pub mod backtest;
pub mod fitter;
pub mod forecast;
pub mod grid;
pub mod selection;

pub use backtest::*;
pub use fitter::*;
pub use forecast::*;
pub use grid::*;
pub use selection::*;
