//! In-memory compressed sparse matrix

use std::ops::Range;

use crate::error::{Result, SparseError};
use crate::store::{ArrayData, DType};

use super::SparseFormat;

/// A CSR or CSC matrix held in memory
///
/// Fields are private so that every instance satisfies the layout
/// invariants checked by [`SparseMatrix::from_parts`]:
/// - `indptr.len() == outer + 1`, `indptr[0] == 0`, non-decreasing
/// - `indptr[last] == values.len() == indices.len()`
/// - every index is `< inner`
///
/// A matrix decoded with `validate_on_decode` off has skipped only the last
/// (per-entry) check.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    format: SparseFormat,
    shape: (u64, u64),
    values: ArrayData,
    indices: Vec<u64>,
    indptr: Vec<u64>,
}

impl SparseMatrix {
    /// Assemble a matrix from its three arrays, validating the layout
    pub fn from_parts(
        format: SparseFormat,
        shape: (u64, u64),
        values: impl Into<ArrayData>,
        indices: Vec<u64>,
        indptr: Vec<u64>,
    ) -> Result<Self> {
        let values = values.into();
        validate(format, shape, &values, &indices, &indptr)?;
        Ok(Self {
            format,
            shape,
            values,
            indices,
            indptr,
        })
    }

    /// Like `from_parts`, but skip the O(nnz) scan of inner indices
    pub(crate) fn from_parts_unbounded(
        format: SparseFormat,
        shape: (u64, u64),
        values: ArrayData,
        indices: Vec<u64>,
        indptr: Vec<u64>,
    ) -> Result<Self> {
        validate_structure(format, shape, &values, &indices, &indptr)?;
        Ok(Self {
            format,
            shape,
            values,
            indices,
            indptr,
        })
    }

    /// A matrix with no stored entries
    pub fn empty(format: SparseFormat, shape: (u64, u64), dtype: DType) -> Result<Self> {
        let len = indptr_len(format.outer_len(shape))?;
        let len = usize::try_from(len).map_err(|_| {
            SparseError::InvalidMatrix(format!("outer size {} does not fit in memory", len - 1))
        })?;
        Ok(Self {
            format,
            shape,
            values: ArrayData::empty(dtype),
            indices: Vec::new(),
            indptr: vec![0; len],
        })
    }

    /// Compress a dense row-major matrix, storing every non-zero entry
    pub fn from_dense(format: SparseFormat, rows: &[Vec<f64>]) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != ncols) {
            return Err(SparseError::InvalidMatrix(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                ncols
            )));
        }

        let (outer, inner) = match format {
            SparseFormat::RowCompressed => (nrows, ncols),
            SparseFormat::ColumnCompressed => (ncols, nrows),
        };
        let at = |o: usize, i: usize| match format {
            SparseFormat::RowCompressed => rows[o][i],
            SparseFormat::ColumnCompressed => rows[i][o],
        };

        let mut values = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = Vec::with_capacity(outer + 1);
        indptr.push(0);
        for o in 0..outer {
            for i in 0..inner {
                let v = at(o, i);
                if v != 0.0 {
                    values.push(v);
                    indices.push(i as u64);
                }
            }
            indptr.push(values.len() as u64);
        }

        Self::from_parts(format, (nrows as u64, ncols as u64), values, indices, indptr)
    }

    /// Expand into a dense row-major matrix of f64
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let (nrows, ncols) = (self.shape.0 as usize, self.shape.1 as usize);
        let mut dense = vec![vec![0.0; ncols]; nrows];
        let values = self.values.to_f64_vec();

        for (o, bounds) in self.indptr.windows(2).enumerate() {
            for k in bounds[0] as usize..bounds[1] as usize {
                let i = self.indices[k] as usize;
                let (r, c) = match self.format {
                    SparseFormat::RowCompressed => (o, i),
                    SparseFormat::ColumnCompressed => (i, o),
                };
                // entries outside the shape only survive an unbounded decode
                if let Some(cell) = dense.get_mut(r).and_then(|row| row.get_mut(c)) {
                    *cell += values[k];
                }
            }
        }
        dense
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn format(&self) -> SparseFormat {
        self.format
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (u64, u64) {
        self.shape
    }

    pub fn rows(&self) -> u64 {
        self.shape.0
    }

    pub fn cols(&self) -> u64 {
        self.shape.1
    }

    pub fn values(&self) -> &ArrayData {
        &self.values
    }

    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    pub fn indptr(&self) -> &[u64] {
        &self.indptr
    }

    /// Number of stored entries
    pub fn nnz(&self) -> u64 {
        self.indices.len() as u64
    }

    /// Size of the compressed dimension
    pub fn outer_len(&self) -> u64 {
        self.format.outer_len(self.shape)
    }

    /// Size of the uncompressed dimension
    pub fn inner_len(&self) -> u64 {
        self.format.inner_len(self.shape)
    }

    /// Split into `(format, shape, values, indices, indptr)`
    pub fn into_parts(self) -> (SparseFormat, (u64, u64), ArrayData, Vec<u64>, Vec<u64>) {
        (self.format, self.shape, self.values, self.indices, self.indptr)
    }

    // =========================================================================
    // Outer-dimension Operations
    // =========================================================================

    /// Copy out outer indices `range` (rows for CSR, columns for CSC)
    pub fn outer_slice(&self, range: Range<u64>) -> Result<Self> {
        if range.start > range.end || range.end > self.outer_len() {
            return Err(SparseError::UnsupportedIndex(format!(
                "outer range {:?} out of bounds for outer size {}",
                range,
                self.outer_len()
            )));
        }

        let window = &self.indptr[range.start as usize..=range.end as usize];
        let (lo, hi) = (window[0], window[window.len() - 1]);
        let indptr = window.iter().map(|p| p - lo).collect();
        let shape = self
            .format
            .shape_from(range.end - range.start, self.inner_len());

        Self::from_parts(
            self.format,
            shape,
            self.values.slice(lo as usize..hi as usize),
            self.indices[lo as usize..hi as usize].to_vec(),
            indptr,
        )
    }

    /// Stack `other` after `self` along the outer dimension.
    ///
    /// The inner size becomes the larger of the two; `other`'s values are
    /// cast into `self`'s dtype.
    pub fn concat_outer(&self, other: &SparseMatrix) -> Result<Self> {
        if self.format != other.format {
            return Err(SparseError::FormatMismatch {
                expected: self.format.tag().to_string(),
                found: other.format.tag().to_string(),
            });
        }

        let offset = self.nnz();
        let mut values = self.values.clone();
        values.resize(self.values.len() + other.values.len());
        values.write_at(self.values.len(), &other.values)?;

        let mut indices = self.indices.clone();
        indices.extend_from_slice(&other.indices);

        let mut indptr = self.indptr.clone();
        indptr.extend(other.indptr[1..].iter().map(|p| p + offset));

        let shape = self.format.shape_from(
            self.outer_len() + other.outer_len(),
            self.inner_len().max(other.inner_len()),
        );

        Self::from_parts(self.format, shape, values, indices, indptr)
    }
}

/// Check the compressed layout invariants
fn validate(
    format: SparseFormat,
    shape: (u64, u64),
    values: &ArrayData,
    indices: &[u64],
    indptr: &[u64],
) -> Result<()> {
    validate_structure(format, shape, values, indices, indptr)?;

    let inner = format.inner_len(shape);
    if let Some(&bad) = indices.iter().find(|&&i| i >= inner) {
        return Err(SparseError::InvalidMatrix(format!(
            "index {} out of bounds for inner size {}",
            bad, inner
        )));
    }
    Ok(())
}

/// `outer + 1`, or `InvalidMatrix` when that overflows
fn indptr_len(outer: u64) -> Result<u64> {
    outer.checked_add(1).ok_or_else(|| {
        SparseError::InvalidMatrix(format!("outer size {} has no valid indptr length", outer))
    })
}

/// The checks that cost at most O(outer): indptr shape and its agreement
/// with the entry arrays
fn validate_structure(
    format: SparseFormat,
    shape: (u64, u64),
    values: &ArrayData,
    indices: &[u64],
    indptr: &[u64],
) -> Result<()> {
    let expected = indptr_len(format.outer_len(shape))?;
    if indptr.len() as u64 != expected {
        return Err(SparseError::InvalidMatrix(format!(
            "indptr length {} must be outer size + 1 = {}",
            indptr.len(),
            expected
        )));
    }
    if indptr[0] != 0 {
        return Err(SparseError::InvalidMatrix(format!(
            "indptr first element must be 0, got {}",
            indptr[0]
        )));
    }
    if let Some(pos) = indptr.windows(2).position(|w| w[0] > w[1]) {
        return Err(SparseError::InvalidMatrix(format!(
            "indptr must be non-decreasing (indptr[{}] = {} > indptr[{}] = {})",
            pos,
            indptr[pos],
            pos + 1,
            indptr[pos + 1]
        )));
    }

    let nnz = indptr[indptr.len() - 1];
    if indices.len() as u64 != nnz || values.len() as u64 != nnz {
        return Err(SparseError::InvalidMatrix(format!(
            "indptr last element {} must equal nnz (indices: {}, values: {})",
            nnz,
            indices.len(),
            values.len()
        )));
    }
    Ok(())
}
