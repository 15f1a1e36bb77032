//! # pivotmesh Algorithms
//!
//! Point-cloud utilities consumed by the reconstruction engine: a spatial
//! index for radius and k-nearest queries, average spacing estimation used to
//! pick a default ball radius, and the exact orientation predicate.

pub mod nearest_neighbor;
pub mod predicates;
pub mod spacing;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use predicates::*;
pub use spacing::*;
