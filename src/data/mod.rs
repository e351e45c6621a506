//! Turning raw records into analysis-ready series.
//!
//! - `normalize`: station filter, keep-max dedup, daily resampling
//! - `calendar`: season / day-type / year and the missing-row policy
//! - `location`: optional station coordinates
//! - `synthetic`: seeded demo ride files

pub mod calendar;
pub mod location;
pub mod normalize;
pub mod synthetic;

pub use calendar::enrich;
pub use location::{Coordinate, LocationLookup, LocationSource, ResolvedLocation};
pub use normalize::{filter_station, normalize};
pub use synthetic::{SyntheticSpec, generate_records};
