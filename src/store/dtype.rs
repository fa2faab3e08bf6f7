//! Typed array payloads
//!
//! `ArrayData` carries one flat numeric array together with its element type.
//! Casting between element types is checked: integer values must fit the
//! target, and floats are never silently truncated to integers.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SparseError};

/// Element type of a stored array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    U32,
    U64,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    /// Whether this dtype holds integers
    pub fn is_integer(self) -> bool {
        !matches!(self, DType::F32 | DType::F64)
    }

    /// Short lowercase name ("u32", "f64", ...)
    pub fn name(self) -> &'static str {
        match self {
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A flat, typed numeric array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    U32(Vec<u32>),
    U64(Vec<u64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Apply the same expression to the inner Vec of every variant.
macro_rules! with_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::U32($v) => $body,
            ArrayData::U64($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
        }
    };
}

/// Same as `with_vec!`, but rewraps the result in the source variant.
macro_rules! map_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::U32($v) => ArrayData::U32($body),
            ArrayData::U64($v) => ArrayData::U64($body),
            ArrayData::I32($v) => ArrayData::I32($body),
            ArrayData::I64($v) => ArrayData::I64($body),
            ArrayData::F32($v) => ArrayData::F32($body),
            ArrayData::F64($v) => ArrayData::F64($body),
        }
    };
}

impl ArrayData {
    /// An empty array of the given dtype
    pub fn empty(dtype: DType) -> Self {
        Self::zeros(dtype, 0)
    }

    /// An array of `len` zeros of the given dtype
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::U32 => ArrayData::U32(vec![0; len]),
            DType::U64 => ArrayData::U64(vec![0; len]),
            DType::I32 => ArrayData::I32(vec![0; len]),
            DType::I64 => ArrayData::I64(vec![0; len]),
            DType::F32 => ArrayData::F32(vec![0.0; len]),
            DType::F64 => ArrayData::F64(vec![0.0; len]),
        }
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::U32(_) => DType::U32,
            ArrayData::U64(_) => DType::U64,
            ArrayData::I32(_) => DType::I32,
            ArrayData::I64(_) => DType::I64,
            ArrayData::F32(_) => DType::F32,
            ArrayData::F64(_) => DType::F64,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out a sub-range. The range is clamped to the array length.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let len = self.len();
        let end = range.end.min(len);
        let start = range.start.min(end);
        map_vec!(self, v => v[start..end].to_vec())
    }

    /// Grow or shrink to `len` elements, zero-filling new slots
    pub fn resize(&mut self, len: usize) {
        match self {
            ArrayData::U32(v) => v.resize(len, 0),
            ArrayData::U64(v) => v.resize(len, 0),
            ArrayData::I32(v) => v.resize(len, 0),
            ArrayData::I64(v) => v.resize(len, 0),
            ArrayData::F32(v) => v.resize(len, 0.0),
            ArrayData::F64(v) => v.resize(len, 0.0),
        }
    }

    /// Overwrite elements starting at `offset` with `src`.
    ///
    /// `src` is cast into this array's dtype first; the write must fit within
    /// the current length.
    pub fn write_at(&mut self, offset: usize, src: &ArrayData) -> Result<()> {
        let src = src.cast(self.dtype())?;
        let end = offset
            .checked_add(src.len())
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                SparseError::InvalidMatrix(format!(
                    "write of {} elements at offset {} exceeds array length {}",
                    src.len(),
                    offset,
                    self.len()
                ))
            })?;

        match (self, &src) {
            (ArrayData::U32(dst), ArrayData::U32(s)) => dst[offset..end].copy_from_slice(s),
            (ArrayData::U64(dst), ArrayData::U64(s)) => dst[offset..end].copy_from_slice(s),
            (ArrayData::I32(dst), ArrayData::I32(s)) => dst[offset..end].copy_from_slice(s),
            (ArrayData::I64(dst), ArrayData::I64(s)) => dst[offset..end].copy_from_slice(s),
            (ArrayData::F32(dst), ArrayData::F32(s)) => dst[offset..end].copy_from_slice(s),
            (ArrayData::F64(dst), ArrayData::F64(s)) => dst[offset..end].copy_from_slice(s),
            // cast() above guarantees matching variants
            _ => unreachable!("cast produced a mismatched dtype"),
        }
        Ok(())
    }

    /// Convert into another dtype.
    ///
    /// Integer targets reject float sources and values that do not fit.
    /// Float targets accept everything.
    pub fn cast(&self, target: DType) -> Result<ArrayData> {
        if self.dtype() == target {
            return Ok(self.clone());
        }

        if !target.is_integer() {
            let floats = self.to_f64_vec();
            return Ok(match target {
                DType::F32 => ArrayData::F32(floats.into_iter().map(|x| x as f32).collect()),
                _ => ArrayData::F64(floats),
            });
        }

        let ints = self.to_i128_vec().ok_or_else(|| SparseError::TypeMismatch {
            expected: target.to_string(),
            found: self.dtype().to_string(),
        })?;

        fn narrow<T: TryFrom<i128>>(ints: Vec<i128>, dtype: DType) -> Result<Vec<T>> {
            ints.into_iter()
                .map(|x| {
                    T::try_from(x).map_err(|_| SparseError::ValueOutOfRange {
                        dtype,
                        value: x.to_string(),
                    })
                })
                .collect()
        }

        Ok(match target {
            DType::U32 => ArrayData::U32(narrow(ints, target)?),
            DType::U64 => ArrayData::U64(narrow(ints, target)?),
            DType::I32 => ArrayData::I32(narrow(ints, target)?),
            DType::I64 => ArrayData::I64(narrow(ints, target)?),
            DType::F32 | DType::F64 => unreachable!("float targets handled above"),
        })
    }

    /// Read as unsigned offsets/indices.
    pub fn to_u64_vec(&self) -> Result<Vec<u64>> {
        match self {
            ArrayData::U64(v) => Ok(v.clone()),
            other => match other.cast(DType::U64)? {
                ArrayData::U64(v) => Ok(v),
                _ => unreachable!("cast to u64 yields u64"),
            },
        }
    }

    /// Every element widened to f64 (lossy for very large 64-bit integers)
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_vec!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    fn to_i128_vec(&self) -> Option<Vec<i128>> {
        match self {
            ArrayData::U32(v) => Some(v.iter().map(|&x| i128::from(x)).collect()),
            ArrayData::U64(v) => Some(v.iter().map(|&x| i128::from(x)).collect()),
            ArrayData::I32(v) => Some(v.iter().map(|&x| i128::from(x)).collect()),
            ArrayData::I64(v) => Some(v.iter().map(|&x| i128::from(x)).collect()),
            ArrayData::F32(_) | ArrayData::F64(_) => None,
        }
    }
}

macro_rules! impl_from_vec {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<Vec<$t>> for ArrayData {
                fn from(v: Vec<$t>) -> Self {
                    ArrayData::$variant(v)
                }
            }
        )*
    };
}

impl_from_vec!(u32 => U32, u64 => U64, i32 => I32, i64 => I64, f32 => F32, f64 => F64);

/// Attribute value attached to a group or array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Str(String),
    Uint(u64),
    Uints(Vec<u64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            AttrValue::Uint(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_uints(&self) -> Option<&[u64]> {
        match self {
            AttrValue::Uints(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<u64> for AttrValue {
    fn from(n: u64) -> Self {
        AttrValue::Uint(n)
    }
}

impl From<(u64, u64)> for AttrValue {
    fn from((a, b): (u64, u64)) -> Self {
        AttrValue::Uints(vec![a, b])
    }
}
