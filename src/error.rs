//! Error types for sparsestore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::store::DType;

/// Result type alias using SparseError
pub type Result<T> = std::result::Result<T, SparseError>;

/// Unified error type for sparsestore operations
#[derive(Debug, Error)]
pub enum SparseError {
    // -------------------------------------------------------------------------
    // Caller Contract Errors (never retryable)
    // -------------------------------------------------------------------------
    #[error("Unsupported sparse format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported index: {0}")]
    UnsupportedIndex(String),

    #[error("Empty range: start={start:?}, stop={stop:?} selects no outer index")]
    EmptyRange { start: Option<i64>, stop: Option<i64> },

    #[error("Format mismatch: destination is {expected}, incoming is {found}")]
    FormatMismatch { expected: String, found: String },

    #[error("Invalid sparse matrix: {0}")]
    InvalidMatrix(String),

    #[error("Unsupported layout version: {0}")]
    UnsupportedLayout(u64),

    // -------------------------------------------------------------------------
    // Array Store Errors
    // -------------------------------------------------------------------------
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Node already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a group: {0}")]
    NotAGroup(String),

    #[error("Not an array: {0}")]
    NotAnArray(String),

    #[error("Not a sparse matrix group: {0}")]
    NotASparseMatrix(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Value {value} does not fit in {dtype}")]
    ValueOutOfRange { dtype: DType, value: String },

    #[error("Array {path} cannot grow to {requested} elements (max {max})")]
    CapacityExceeded { path: String, requested: u64, max: u64 },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
