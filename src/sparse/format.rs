//! Compressed sparse layouts

use std::fmt;
use std::str::FromStr;

use crate::error::SparseError;

/// Which dimension is compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseFormat {
    /// CSR: outer = rows, inner = columns
    RowCompressed,
    /// CSC: outer = columns, inner = rows
    ColumnCompressed,
}

impl SparseFormat {
    /// On-disk tag stored in the `format` attribute
    pub fn tag(self) -> &'static str {
        match self {
            SparseFormat::RowCompressed => "csr",
            SparseFormat::ColumnCompressed => "csc",
        }
    }

    /// Parse an on-disk tag; anything but `"csr"`/`"csc"` is unsupported
    pub fn from_tag(tag: &str) -> Result<Self, SparseError> {
        match tag {
            "csr" => Ok(SparseFormat::RowCompressed),
            "csc" => Ok(SparseFormat::ColumnCompressed),
            other => Err(SparseError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Size of the compressed dimension for a `(rows, cols)` shape
    pub fn outer_len(self, shape: (u64, u64)) -> u64 {
        match self {
            SparseFormat::RowCompressed => shape.0,
            SparseFormat::ColumnCompressed => shape.1,
        }
    }

    /// Size of the uncompressed dimension for a `(rows, cols)` shape
    pub fn inner_len(self, shape: (u64, u64)) -> u64 {
        match self {
            SparseFormat::RowCompressed => shape.1,
            SparseFormat::ColumnCompressed => shape.0,
        }
    }

    /// Build a `(rows, cols)` shape from outer/inner sizes
    pub fn shape_from(self, outer: u64, inner: u64) -> (u64, u64) {
        match self {
            SparseFormat::RowCompressed => (outer, inner),
            SparseFormat::ColumnCompressed => (inner, outer),
        }
    }
}

impl fmt::Display for SparseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SparseFormat {
    type Err = SparseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}
