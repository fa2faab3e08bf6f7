//! Codec
//!
//! Maps an in-memory [`SparseMatrix`] onto a group in an [`ArrayStore`] and
//! back.
//!
//! ## On-disk Layout (layout_version = 1)
//! ```text
//! <group>                          attrs:
//! ├── data     [nnz]               format         = "csr" | "csc"
//! ├── indices  [nnz]               shape          = [rows, cols]
//! └── indptr   [outer + 1]         layout_version = 1
//! ```
//!
//! A group is a sparse matrix exactly when it carries a `format` attribute.
//! `shape` is always an attribute, never a child array.

use crate::config::Config;
use crate::error::{Result, SparseError};
use crate::sparse::{SparseFormat, SparseMatrix};
use crate::store::{join_path, ArrayData, ArrayStore, AttrValue, DType};

// =============================================================================
// Layout Constants
// =============================================================================

/// Array holding the stored values
pub const DATA: &str = "data";

/// Array holding the inner position of each value
pub const INDICES: &str = "indices";

/// Array holding the outer offsets
pub const INDPTR: &str = "indptr";

/// Attribute holding the format tag
pub const ATTR_FORMAT: &str = "format";

/// Attribute holding `[rows, cols]`
pub const ATTR_SHAPE: &str = "shape";

/// Attribute holding the layout version
pub const ATTR_LAYOUT_VERSION: &str = "layout_version";

/// Current on-disk layout version
pub const LAYOUT_VERSION: u64 = 1;

/// Shape used by [`encode_empty`] when none is given
pub const DEFAULT_EMPTY_SHAPE: (u64, u64) = (0, 0);

/// Format and shape attributes of a stored matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixHeader {
    /// Raw format tag. May name a format this crate cannot slice.
    pub format_tag: String,
    /// `(rows, cols)`
    pub shape: (u64, u64),
}

impl MatrixHeader {
    /// Parse the format tag
    pub fn format(&self) -> Result<SparseFormat> {
        SparseFormat::from_tag(&self.format_tag)
    }
}

// =============================================================================
// Encode
// =============================================================================

/// Write `matrix` as a new sparse matrix group at `path`.
///
/// `indices`/`indptr` are stored with the configured dtypes; `data` keeps the
/// matrix's own dtype. Fails with `AlreadyExists` if `path` is taken.
pub fn encode<S: ArrayStore + ?Sized>(
    store: &S,
    path: &str,
    matrix: &SparseMatrix,
    config: &Config,
) -> Result<()> {
    config.validate()?;

    // Cast up front: an index that does not fit fails before anything is created
    let values = matrix.values().clone();
    let indices = ArrayData::from(matrix.indices().to_vec()).cast(config.index_dtype)?;
    let indptr = ArrayData::from(matrix.indptr().to_vec()).cast(config.indptr_dtype)?;

    tracing::debug!(
        path,
        format = matrix.format().tag(),
        rows = matrix.rows(),
        cols = matrix.cols(),
        nnz = matrix.nnz(),
        "encoding sparse matrix"
    );

    let attrs = [
        (ATTR_FORMAT, AttrValue::from(matrix.format().tag())),
        (ATTR_SHAPE, AttrValue::from(matrix.shape())),
        (ATTR_LAYOUT_VERSION, AttrValue::from(LAYOUT_VERSION)),
    ];
    write_group(store, path, [values, indices, indptr], attrs, config)
}

/// Write a matrix with no stored entries.
///
/// `indptr` is `outer + 1` zeros; `shape` defaults to `(0, 0)`.
pub fn encode_empty<S: ArrayStore + ?Sized>(
    store: &S,
    path: &str,
    format: SparseFormat,
    shape: Option<(u64, u64)>,
    dtype: DType,
    config: &Config,
) -> Result<()> {
    let matrix = SparseMatrix::empty(format, shape.unwrap_or(DEFAULT_EMPTY_SHAPE), dtype)?;
    encode(store, path, &matrix, config)
}

/// Duplicate a stored matrix verbatim, possibly into another store.
///
/// Arrays keep their stored dtypes and every attribute is copied as-is, so a
/// format tag this crate cannot slice is carried over unchanged.
pub fn copy<S, D>(src: &S, src_path: &str, dst: &D, dst_path: &str, config: &Config) -> Result<()>
where
    S: ArrayStore + ?Sized,
    D: ArrayStore + ?Sized,
{
    if !is_sparse_group(src, src_path)? {
        return Err(SparseError::NotASparseMatrix(src_path.to_string()));
    }

    let arrays = [
        src.read_array(&join_path(src_path, DATA))?,
        src.read_array(&join_path(src_path, INDICES))?,
        src.read_array(&join_path(src_path, INDPTR))?,
    ];

    let mut attrs = Vec::new();
    for name in src.attr_names(src_path)? {
        if let Some(value) = src.get_attr(src_path, &name)? {
            attrs.push((name, value));
        }
    }

    tracing::debug!(src_path, dst_path, nnz = arrays[0].len(), "copying sparse matrix");

    write_group(dst, dst_path, arrays, attrs, config)
}

/// Create the group, its three arrays and its attributes.
///
/// On failure the half-built group is deleted again before the error is
/// returned.
fn write_group<S, K>(
    store: &S,
    path: &str,
    arrays: [ArrayData; 3],
    attrs: impl IntoIterator<Item = (K, AttrValue)>,
    config: &Config,
) -> Result<()>
where
    S: ArrayStore + ?Sized,
    K: AsRef<str>,
{
    if store.kind(path)?.is_some() {
        return Err(SparseError::AlreadyExists(path.to_string()));
    }
    store.create_group(path)?;

    let build = || -> Result<()> {
        for (name, data) in [DATA, INDICES, INDPTR].into_iter().zip(arrays) {
            let options = config.array_options(data.len() as u64);
            store.create_array(&join_path(path, name), data, options)?;
        }
        for (name, value) in attrs {
            store.set_attr(path, name.as_ref(), value)?;
        }
        Ok(())
    };

    if let Err(e) = build() {
        tracing::warn!(path, error = %e, "matrix creation failed, removing partial group");
        if let Err(cleanup) = store.delete(path) {
            tracing::warn!(path, error = %cleanup, "failed to remove partial group");
        }
        return Err(e);
    }
    Ok(())
}

// =============================================================================
// Decode
// =============================================================================

/// Whether the group at `path` is a sparse matrix (has a `format` attribute)
pub fn is_sparse_group<S: ArrayStore + ?Sized>(store: &S, path: &str) -> Result<bool> {
    Ok(store.get_attr(path, ATTR_FORMAT)?.is_some())
}

/// Read and check the `format`, `shape` and `layout_version` attributes
pub fn read_header<S: ArrayStore + ?Sized>(store: &S, path: &str) -> Result<MatrixHeader> {
    let format_tag = match store.get_attr(path, ATTR_FORMAT)? {
        Some(AttrValue::Str(tag)) => tag,
        Some(other) => {
            return Err(SparseError::InvalidMatrix(format!(
                "format attribute of {} is not a string: {:?}",
                path, other
            )))
        }
        None => return Err(SparseError::NotASparseMatrix(path.to_string())),
    };

    match store.get_attr(path, ATTR_LAYOUT_VERSION)?.and_then(|v| v.as_uint()) {
        Some(LAYOUT_VERSION) => {}
        Some(other) => return Err(SparseError::UnsupportedLayout(other)),
        None => return Err(SparseError::UnsupportedLayout(0)),
    }

    let shape = match store.get_attr(path, ATTR_SHAPE)? {
        Some(AttrValue::Uints(dims)) if dims.len() == 2 => (dims[0], dims[1]),
        other => {
            return Err(SparseError::InvalidMatrix(format!(
                "shape attribute of {} must be two unsigned integers, got {:?}",
                path, other
            )))
        }
    };

    Ok(MatrixHeader { format_tag, shape })
}

/// Read a whole stored matrix into memory
pub fn decode<S: ArrayStore + ?Sized>(store: &S, path: &str, config: &Config) -> Result<SparseMatrix> {
    let header = read_header(store, path)?;
    let format = header.format()?;

    let values = store.read_array(&join_path(path, DATA))?;
    let indices = store.read_array(&join_path(path, INDICES))?.to_u64_vec()?;
    let indptr = store.read_array(&join_path(path, INDPTR))?.to_u64_vec()?;

    tracing::debug!(
        path,
        format = format.tag(),
        rows = header.shape.0,
        cols = header.shape.1,
        nnz = indices.len(),
        "decoded sparse matrix"
    );

    if config.validate_on_decode {
        SparseMatrix::from_parts(format, header.shape, values, indices, indptr)
    } else {
        SparseMatrix::from_parts_unbounded(format, header.shape, values, indices, indptr)
    }
}
