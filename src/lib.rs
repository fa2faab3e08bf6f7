//! # sparsestore
//!
//! Persist CSR/CSC sparse matrices inside a hierarchical array store:
//! - Three flat arrays (`data`, `indices`, `indptr`) plus `format`/`shape`
//!   attributes per matrix group
//! - Ranged reads of a contiguous block of rows (CSR) or columns (CSC)
//!   that fetch only the needed part of each array
//! - In-place append that grows the arrays and keeps `indptr` consistent
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Group / Entry / SparseDataset                   │
//! │           (open dispatch, dataset creation)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼────────────┐
//!          │            │            │
//!          ▼            ▼            ▼
//!   ┌────────────┐ ┌──────────┐ ┌──────────┐
//!   │   Codec    │ │ Resolver │ │ Appender │
//!   │ (encode /  │ │ (ranged  │ │ (grow in │
//!   │  decode)   │ │  reads)  │ │  place)  │
//!   └─────┬──────┘ └────┬─────┘ └────┬─────┘
//!         └─────────────┼────────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │  ArrayStore   │
//!               │ (trait; e.g.  │
//!               │  MemoryStore) │
//!               └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use sparsestore::{Group, MemoryStore, SparseFormat, SparseMatrix};
//!
//! # fn main() -> sparsestore::Result<()> {
//! let store = MemoryStore::new();
//! let root = Group::root(&store);
//!
//! let m = SparseMatrix::from_dense(
//!     SparseFormat::RowCompressed,
//!     &[vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0], vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 0.0]],
//! )?;
//! let dataset = root.create_dataset("sparse/matrix", &m)?;
//!
//! let rows = dataset.get(1i64..3)?;
//! assert_eq!(rows.shape(), (2, 3));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod sparse;
pub mod codec;
pub mod resolver;
pub mod appender;
pub mod dataset;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SparseError, Result};
pub use config::Config;
pub use dataset::{Entry, Group, PlainArray, SparseDataset};
pub use resolver::{OuterRange, Selection};
pub use sparse::{SparseFormat, SparseMatrix};
pub use store::{ArrayData, ArrayStore, DType, MemoryStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sparsestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
