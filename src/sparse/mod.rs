//! Sparse Module
//!
//! In-memory compressed sparse matrices.
//!
//! ## Layout
//! ```text
//! dense (CSR)         values   = [1, 1, 1, 1]
//! [0 1 0]             indices  = [1, 2, 0, 1]     (column of each entry)
//! [0 0 1]             indptr   = [0, 1, 2, 2, 4]  (row i = values[indptr[i]..indptr[i+1]])
//! [0 0 0]
//! [1 1 0]
//! ```
//!
//! CSC is the same layout with the roles of rows and columns swapped.

mod format;
mod matrix;

pub use format::SparseFormat;
pub use matrix::SparseMatrix;
