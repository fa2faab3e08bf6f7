//! Array Store Module
//!
//! The hierarchical container sparse matrices are persisted into.
//!
//! ## Responsibilities
//! - Named groups nested into namespaces (`"sparse/matrix"`)
//! - Named, typed, resizable arrays inside groups
//! - Key/value attributes on groups and arrays
//! - Half-open slice reads with negative-from-end bounds
//!
//! ## Model
//! ```text
//! /                       (group)
//! └── sparse              (group)
//!     └── matrix          (group, attrs: format, shape, layout_version)
//!         ├── data        (array, caller dtype, len = nnz)
//!         ├── indices     (array, u32 by default, len = nnz)
//!         └── indptr      (array, u64 by default, len = outer + 1)
//! ```
//!
//! Durability, chunk layout and compression belong to the implementation
//! behind [`ArrayStore`]. The bundled [`MemoryStore`] keeps the whole tree in
//! memory and can persist it as a checksummed snapshot file.

mod dtype;
mod memory;
mod slice;

use std::ops::Range;

pub use dtype::{ArrayData, AttrValue, DType};
pub use memory::MemoryStore;
pub use slice::normalize_slice;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What lives at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Array,
}

/// Creation hints for a new array
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayOptions {
    /// Chunk length hint (elements); `None` leaves the choice to the store
    pub chunk_len: Option<u64>,

    /// Maximum length the array may be resized to; `None` means unlimited
    pub max_len: Option<u64>,
}

impl ArrayOptions {
    /// Options for an array that can grow without bound
    pub fn resizable() -> Self {
        Self::default()
    }

    /// Options for an array fixed at `len` elements
    pub fn fixed(len: u64) -> Self {
        Self {
            chunk_len: None,
            max_len: Some(len),
        }
    }

    pub fn with_chunk_len(mut self, chunk_len: Option<u64>) -> Self {
        self.chunk_len = chunk_len;
        self
    }
}

/// Generic hierarchical array store.
///
/// Paths are `/`-separated and relative to the store root; a leading `/` is
/// accepted. All methods take `&self`: implementations provide their own
/// interior mutability and are responsible for any concurrent-access safety.
pub trait ArrayStore {
    /// Kind of node at `path`, or `None` if nothing is there
    fn kind(&self, path: &str) -> Result<Option<NodeKind>>;

    /// Names of the direct children of the group at `path`, sorted
    fn list(&self, path: &str) -> Result<Vec<String>>;

    /// Create a group, creating missing parents. Fails if `path` exists.
    fn create_group(&self, path: &str) -> Result<()>;

    /// Create a new array with initial contents, creating missing parents
    fn create_array(&self, path: &str, data: ArrayData, options: ArrayOptions) -> Result<()>;

    /// Remove a node (and everything below it)
    fn delete(&self, path: &str) -> Result<()>;

    fn array_len(&self, path: &str) -> Result<u64>;

    fn array_dtype(&self, path: &str) -> Result<DType>;

    fn array_options(&self, path: &str) -> Result<ArrayOptions>;

    /// Read `range` of an array. The range is clamped to the array length.
    fn read_range(&self, path: &str, range: Range<u64>) -> Result<ArrayData>;

    /// Change the length of an array, zero-filling new elements
    fn resize_array(&self, path: &str, len: u64) -> Result<()>;

    /// Overwrite elements starting at `offset`, casting into the array's dtype
    fn write_range(&self, path: &str, offset: u64, data: &ArrayData) -> Result<()>;

    fn get_attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>>;

    fn set_attr(&self, path: &str, name: &str, value: AttrValue) -> Result<()>;

    /// Names of all attributes on the node at `path`, sorted
    fn attr_names(&self, path: &str) -> Result<Vec<String>>;

    /// Create the group if it is missing; succeed if a group already exists
    fn require_group(&self, path: &str) -> Result<()> {
        match self.kind(path)? {
            Some(NodeKind::Group) => Ok(()),
            Some(NodeKind::Array) => Err(crate::SparseError::NotAGroup(path.to_string())),
            None => self.create_group(path),
        }
    }

    /// Slice read with standard half-open semantics.
    ///
    /// Absent bounds mean "from the start" / "to the end"; negative bounds
    /// count from the end. Out-of-range bounds are clamped.
    fn read_slice(&self, path: &str, start: Option<i64>, stop: Option<i64>) -> Result<ArrayData> {
        let len = self.array_len(path)?;
        self.read_range(path, normalize_slice(len, start, stop))
    }

    /// Read a whole array
    fn read_array(&self, path: &str) -> Result<ArrayData> {
        let len = self.array_len(path)?;
        self.read_range(path, 0..len)
    }

    /// Append `data` after the current end of an array
    fn extend_array(&self, path: &str, data: &ArrayData) -> Result<()> {
        // Cast before resizing so a type error leaves the array untouched
        let data = data.cast(self.array_dtype(path)?)?;
        let len = self.array_len(path)?;
        self.resize_array(path, len + data.len() as u64)?;
        self.write_range(path, len, &data)
    }
}

/// Join two store paths with a single `/`
pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if base.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}
