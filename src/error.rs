use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KDTreeError {
    /// A point did not have as many coordinates as the tree has dimensions.
    #[error("Wrong number of coordinates. Passed: {found} Expected: {expected}")]
    InvalidArity { expected: usize, found: usize },

    /// A point operation was attempted on a tree constructed with zero dimensions.
    #[error("Tree was constructed with zero dimensions")]
    ZeroDimension,

    /// Node storage could not grow to hold another point.
    #[error("Failed to allocate a new tree node")]
    AllocationFailure,
}

pub type Result<T> = std::result::Result<T, KDTreeError>;
