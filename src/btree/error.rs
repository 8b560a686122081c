use thiserror::Error;

/// Errors that can occur when building or checking a B+ tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BPlusTreeError {
    #[error("Invalid order: {0} (must be >= 3)")]
    InvalidOrder(usize),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

pub type BPlusTreeResult<T> = Result<T, BPlusTreeError>;
