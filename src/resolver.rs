//! Range Resolver
//!
//! Reads a contiguous block of outer indices (rows for CSR, columns for CSC)
//! out of a stored matrix without loading the rest of it.
//!
//! ## How a range is resolved
//! ```text
//! request rows [1:3] of a 4-row CSR matrix
//!
//!   indptr  = [0, 1, 2, 2, 4]
//!                 └──┬──┘          indptr[1:4] (stop widened by one)
//!   ip      = [1, 2, 2]
//!   data    = data[ip[0]..ip[last]]    = data[1..2]
//!   indices = indices[ip[0]..ip[last]] = indices[1..2]
//!   indptr  = ip - ip[0]               = [0, 1, 1]
//! ```
//!
//! Only the selected `indptr` window and the matching entry window are read.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::codec::{self, read_header, DATA, INDICES, INDPTR};
use crate::config::Config;
use crate::error::{Result, SparseError};
use crate::sparse::SparseMatrix;
use crate::store::{join_path, ArrayStore};

/// A slice along the outer dimension
///
/// Bounds follow sequence slicing: half-open, absent means open-ended,
/// negative counts from the end. A step is representable only so that it can
/// be rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OuterRange {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl OuterRange {
    pub fn new(start: Option<i64>, stop: Option<i64>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    /// `[:]`
    pub fn full() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Bounds to apply to the `indptr` array.
    ///
    /// `indptr` has one more element than there are outer indices, so a
    /// positive stop and a negative start each reach one element further.
    pub fn indptr_bounds(&self) -> (Option<i64>, Option<i64>) {
        let start = self.start.map(|s| if s < 0 { s.saturating_sub(1) } else { s });
        let stop = self.stop.map(|s| if s > 0 { s.saturating_add(1) } else { s });
        (start, stop)
    }
}

impl From<Range<i64>> for OuterRange {
    fn from(r: Range<i64>) -> Self {
        Self::new(Some(r.start), Some(r.end))
    }
}

impl From<RangeFrom<i64>> for OuterRange {
    fn from(r: RangeFrom<i64>) -> Self {
        Self::new(Some(r.start), None)
    }
}

impl From<RangeTo<i64>> for OuterRange {
    fn from(r: RangeTo<i64>) -> Self {
        Self::new(None, Some(r.end))
    }
}

impl From<RangeFull> for OuterRange {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

/// What to read from a stored matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Everything, read as three whole arrays
    All,
    /// A contiguous block of outer indices
    Range(OuterRange),
}

impl From<OuterRange> for Selection {
    fn from(range: OuterRange) -> Self {
        Selection::Range(range)
    }
}

/// Read outer indices `range` of the matrix stored at `path`.
///
/// Fails with `UnsupportedIndex` for a stepped range, `UnsupportedFormat` for
/// a format tag other than csr/csc, and `EmptyRange` when the range selects
/// no outer index. Bounds past the end are clamped by the store's slice read.
pub fn resolve<S: ArrayStore + ?Sized>(
    store: &S,
    path: &str,
    range: impl Into<OuterRange>,
) -> Result<SparseMatrix> {
    let range = range.into();
    if let Some(step) = range.step {
        return Err(SparseError::UnsupportedIndex(format!(
            "index step is not supported (got step {})",
            step
        )));
    }

    let header = read_header(store, path)?;
    let format = header.format()?;

    let (start, stop) = range.indptr_bounds();
    let ip = store
        .read_slice(&join_path(path, INDPTR), start, stop)?
        .to_u64_vec()?;

    if ip.len() < 2 {
        return Err(SparseError::EmptyRange {
            start: range.start,
            stop: range.stop,
        });
    }

    let (lo, hi) = (ip[0], ip[ip.len() - 1]);
    if hi < lo {
        return Err(SparseError::InvalidMatrix(format!(
            "indptr window of {} decreases ({} > {})",
            path, lo, hi
        )));
    }
    tracing::trace!(path, lo, hi, outer = ip.len() - 1, "resolved entry window");

    let values = store.read_range(&join_path(path, DATA), lo..hi)?;
    let indices = store
        .read_range(&join_path(path, INDICES), lo..hi)?
        .to_u64_vec()?;

    let indptr = ip
        .iter()
        .map(|&p| {
            p.checked_sub(lo).ok_or_else(|| {
                SparseError::InvalidMatrix(format!("indptr of {} is not non-decreasing", path))
            })
        })
        .collect::<Result<Vec<u64>>>()?;

    let outer = (indptr.len() - 1) as u64;
    let shape = format.shape_from(outer, format.inner_len(header.shape));

    tracing::debug!(
        path,
        start = ?range.start,
        stop = ?range.stop,
        rows = shape.0,
        cols = shape.1,
        nnz = hi - lo,
        "resolved outer range"
    );

    SparseMatrix::from_parts(format, shape, values, indices, indptr)
}

/// Read the whole matrix at `path` (three whole-array reads)
pub fn resolve_all<S: ArrayStore + ?Sized>(store: &S, path: &str, config: &Config) -> Result<SparseMatrix> {
    codec::decode(store, path, config)
}

/// Dispatch a [`Selection`]
pub fn resolve_selection<S: ArrayStore + ?Sized>(
    store: &S,
    path: &str,
    selection: Selection,
    config: &Config,
) -> Result<SparseMatrix> {
    match selection {
        Selection::All => resolve_all(store, path, config),
        Selection::Range(range) => resolve(store, path, range),
    }
}
