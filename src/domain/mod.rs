//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - immutable reference data (`GeoUnit`, `Provider`)
//! - per-run computed rows (`TravelTimeEntry`, `AccessStats`, `SourceScore`,
//!   `EnsembleRecord`, `UdiRecord`)
//! - the persistent calibration state (`Weights`, `CalibrationState`)
//! - the run configuration (`EngineConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
