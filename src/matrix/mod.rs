//! Travel matrix construction and per-area access statistics.

pub mod access;
pub mod builder;

pub use access::{access_stats, derive_threshold, DerivedThreshold};
pub use builder::{build, CancelToken, MatrixBuild};
