//! Error types for pivotmesh

use thiserror::Error;

/// Main error type for pivotmesh operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Insufficient points: found {found}, at least {required} required")]
    InsufficientPoints { found: usize, required: usize },

    #[error("Length mismatch: {points} points but {normals} normals")]
    LengthMismatch { points: usize, normals: usize },

    #[error("Topology error: {0}")]
    Topology(String),
}

/// Result type alias for pivotmesh operations
pub type Result<T> = std::result::Result<T, Error>;
