//! Bounded logistic growth model.
//!
//! Evaluation is kept to small, pure functions so that fitting/search code can
//! stay generic over the candidate layouts.

pub mod model;

pub use model::*;
