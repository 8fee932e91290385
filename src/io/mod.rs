//! Input/output: CSV ingest, artifact export, and calibration-state
//! persistence.

pub mod export;
pub mod ingest;
pub mod state;
