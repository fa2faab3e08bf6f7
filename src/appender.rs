//! Appender
//!
//! Grows a stored matrix in place by another matrix of the same format.
//!
//! ## CSR append (rows are stacked)
//! ```text
//! stored:   indptr = [0, 1, 2, 2, 4]            offset = 4
//! incoming: indptr = [0, 2, 3]
//!                       └──┬─┘  drop leading 0, add offset
//! result:   indptr = [0, 1, 2, 2, 4, 6, 7]
//!           data, indices: incoming entries appended unchanged
//!           shape: rows += incoming rows, cols = max(cols, incoming cols)
//! ```
//!
//! CSC matrices are appended the same way along columns.
//!
//! Every check (format, dtype casts, offset overflow, capacity) runs before
//! the first write. The writes themselves (data → indptr → indices → shape)
//! are separate store calls: a reader running concurrently with an append
//! can observe them half-applied, and a store failure part-way through is
//! not rolled back.

use crate::codec::{read_header, ATTR_SHAPE, DATA, INDICES, INDPTR};
use crate::error::{Result, SparseError};
use crate::sparse::{SparseFormat, SparseMatrix};
use crate::store::{join_path, ArrayData, ArrayStore, AttrValue, DType};

/// Append `incoming` to the matrix stored at `path`.
///
/// Fails with `FormatMismatch` (without touching the stored arrays) if the
/// formats differ.
pub fn append<S: ArrayStore + ?Sized>(store: &S, path: &str, incoming: &SparseMatrix) -> Result<()> {
    let header = read_header(store, path)?;
    if header.format_tag != incoming.format().tag() {
        return Err(SparseError::FormatMismatch {
            expected: header.format_tag,
            found: incoming.format().tag().to_string(),
        });
    }
    let format = header.format()?;

    let data_path = join_path(path, DATA);
    let indices_path = join_path(path, INDICES);
    let indptr_path = join_path(path, INDPTR);

    // -------------------------------------------------------------------------
    // Prepare: nothing below may fail after the first write
    // -------------------------------------------------------------------------
    let offset = current_nnz(store, path, &indptr_path)?;
    for entry_path in [&data_path, &indices_path] {
        let len = store.array_len(entry_path)?;
        if len != offset {
            return Err(SparseError::InvalidMatrix(format!(
                "{} has {} elements but indptr ends at {}",
                entry_path, len, offset
            )));
        }
    }

    let values = incoming.values().cast(store.array_dtype(&data_path)?)?;
    let indices = ArrayData::from(incoming.indices().to_vec()).cast(store.array_dtype(&indices_path)?)?;
    let indptr_tail = shifted_tail(incoming.indptr(), offset, store.array_dtype(&indptr_path)?)?;

    check_capacity(store, &data_path, values.len() as u64)?;
    check_capacity(store, &indices_path, indices.len() as u64)?;
    check_capacity(store, &indptr_path, indptr_tail.len() as u64)?;

    let (rows, cols) = header.shape;
    let grown = |stored: u64, added: u64| {
        stored.checked_add(added).ok_or_else(|| {
            SparseError::InvalidMatrix(format!("outer size {} + {} overflows", stored, added))
        })
    };
    let shape = match format {
        SparseFormat::RowCompressed => (grown(rows, incoming.rows())?, cols.max(incoming.cols())),
        SparseFormat::ColumnCompressed => (rows.max(incoming.rows()), grown(cols, incoming.cols())?),
    };

    tracing::debug!(
        path,
        format = format.tag(),
        offset,
        added_nnz = incoming.nnz(),
        rows = shape.0,
        cols = shape.1,
        "appending sparse matrix"
    );

    // -------------------------------------------------------------------------
    // Write
    // -------------------------------------------------------------------------
    store.extend_array(&data_path, &values)?;
    store.extend_array(&indptr_path, &indptr_tail)?;
    store.extend_array(&indices_path, &indices)?;
    store.set_attr(path, ATTR_SHAPE, AttrValue::from(shape))?;

    Ok(())
}

/// Last element of the stored `indptr` (the current nnz)
fn current_nnz<S: ArrayStore + ?Sized>(store: &S, path: &str, indptr_path: &str) -> Result<u64> {
    let len = store.array_len(indptr_path)?;
    if len == 0 {
        return Err(SparseError::InvalidMatrix(format!("indptr of {} is empty", path)));
    }
    let last = store.read_range(indptr_path, len - 1..len)?.to_u64_vec()?;
    last.first()
        .copied()
        .ok_or_else(|| SparseError::InvalidMatrix(format!("indptr of {} could not be read", path)))
}

/// `incoming[1..] + offset`, cast into the stored indptr dtype
fn shifted_tail(incoming: &[u64], offset: u64, dtype: DType) -> Result<ArrayData> {
    let tail = incoming
        .get(1..)
        .ok_or_else(|| SparseError::InvalidMatrix("incoming indptr is empty".to_string()))?
        .iter()
        .map(|&p| {
            p.checked_add(offset).ok_or_else(|| SparseError::ValueOutOfRange {
                dtype,
                value: format!("{} + {}", p, offset),
            })
        })
        .collect::<Result<Vec<u64>>>()?;
    ArrayData::from(tail).cast(dtype)
}

fn check_capacity<S: ArrayStore + ?Sized>(store: &S, path: &str, added: u64) -> Result<()> {
    let requested = store.array_len(path)?.saturating_add(added);
    match store.array_options(path)?.max_len {
        Some(max) if requested > max => Err(SparseError::CapacityExceeded {
            path: path.to_string(),
            requested,
            max,
        }),
        _ => Ok(()),
    }
}
