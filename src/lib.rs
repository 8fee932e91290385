//! `access-engine` library crate.
//!
//! The binary (`access`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., scheduled batch runners, notebooks)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod ensemble;
pub mod error;
pub mod geo;
pub mod io;
pub mod math;
pub mod matrix;
pub mod report;
pub mod score;
pub mod udi;
pub mod validate;
