//! Geographic primitives: coordinate resolution and travel-time estimation.

pub mod estimator;
pub mod resolver;

pub use estimator::{estimate, haversine_miles};
pub use resolver::CoordinateIndex;
