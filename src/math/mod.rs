//! Numeric helpers shared across the engine.

pub mod corr;
pub mod stats;
