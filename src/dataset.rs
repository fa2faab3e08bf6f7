//! Dataset Module
//!
//! Typed handles over an [`ArrayStore`]: groups, plain arrays and sparse
//! matrix groups.
//!
//! ## Responsibilities
//! - Decide once, when a path is opened, what lives there ([`Entry`])
//! - Create sparse datasets from in-memory matrices, empty shapes, or other
//!   stored datasets
//! - Expose ranged reads and append on a stored matrix

use crate::appender;
use crate::codec::{self, MatrixHeader, DATA};
use crate::config::Config;
use crate::error::{Result, SparseError};
use crate::resolver::{self, OuterRange, Selection};
use crate::sparse::{SparseFormat, SparseMatrix};
use crate::store::{join_path, ArrayData, ArrayStore, DType, NodeKind};

/// What was found at a path
pub enum Entry<'s, S: ArrayStore + ?Sized> {
    /// An array that is not part of a sparse matrix group
    PlainArray(PlainArray<'s, S>),
    /// A group carrying a `format` attribute
    SparseMatrix(SparseDataset<'s, S>),
    /// Any other group
    PlainGroup(Group<'s, S>),
}

impl<'s, S: ArrayStore + ?Sized> Entry<'s, S> {
    /// Path of the opened node
    pub fn path(&self) -> &str {
        match self {
            Entry::PlainArray(a) => a.path(),
            Entry::SparseMatrix(d) => d.path(),
            Entry::PlainGroup(g) => g.path(),
        }
    }

    pub fn into_sparse(self) -> Result<SparseDataset<'s, S>> {
        match self {
            Entry::SparseMatrix(d) => Ok(d),
            other => Err(SparseError::NotASparseMatrix(other.path().to_string())),
        }
    }

    pub fn into_group(self) -> Result<Group<'s, S>> {
        match self {
            Entry::PlainGroup(g) => Ok(g),
            other => Err(SparseError::NotAGroup(other.path().to_string())),
        }
    }

    pub fn into_array(self) -> Result<PlainArray<'s, S>> {
        match self {
            Entry::PlainArray(a) => Ok(a),
            other => Err(SparseError::NotAnArray(other.path().to_string())),
        }
    }
}

// =============================================================================
// Group
// =============================================================================

/// A namespace inside the store
pub struct Group<'s, S: ArrayStore + ?Sized> {
    store: &'s S,
    path: String,
    config: Config,
}

impl<'s, S: ArrayStore + ?Sized> Group<'s, S> {
    /// The root group of `store`, using the default config
    pub fn root(store: &'s S) -> Self {
        Self {
            store,
            path: String::new(),
            config: Config::default(),
        }
    }

    /// Use `config` for datasets created or opened through this group
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of direct children
    pub fn keys(&self) -> Result<Vec<String>> {
        self.store.list(&self.path)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.store.kind(&self.child(name))?.is_some())
    }

    /// Open `name` (may be a nested path such as `"sparse/matrix"`)
    pub fn get(&self, name: &str) -> Result<Entry<'s, S>> {
        let path = self.child(name);
        match self.store.kind(&path)? {
            None => Err(SparseError::NotFound(path)),
            Some(NodeKind::Array) => Ok(Entry::PlainArray(PlainArray {
                store: self.store,
                path,
            })),
            Some(NodeKind::Group) => {
                if codec::is_sparse_group(self.store, &path)? {
                    Ok(Entry::SparseMatrix(self.dataset_at(path)))
                } else {
                    Ok(Entry::PlainGroup(self.group_at(path)))
                }
            }
        }
    }

    pub fn create_group(&self, name: &str) -> Result<Group<'s, S>> {
        let path = self.child(name);
        self.store.create_group(&path)?;
        Ok(self.group_at(path))
    }

    /// Open `name` as a plain group, creating it if missing
    pub fn require_group(&self, name: &str) -> Result<Group<'s, S>> {
        let path = self.child(name);
        self.store.require_group(&path)?;
        if codec::is_sparse_group(self.store, &path)? {
            return Err(SparseError::NotAGroup(path));
        }
        Ok(self.group_at(path))
    }

    /// Store `matrix` under `name` using this group's config
    pub fn create_dataset(&self, name: &str, matrix: &SparseMatrix) -> Result<SparseDataset<'s, S>> {
        let config = self.config.clone();
        self.create_dataset_with(name, matrix, &config)
    }

    /// Store `matrix` under `name` with an explicit config
    pub fn create_dataset_with(
        &self,
        name: &str,
        matrix: &SparseMatrix,
        config: &Config,
    ) -> Result<SparseDataset<'s, S>> {
        let path = self.child(name);
        codec::encode(self.store, &path, matrix, config)?;
        Ok(self.dataset_at(path))
    }

    /// Store a matrix with no entries; `shape` defaults to `(0, 0)`
    pub fn create_empty_dataset(
        &self,
        name: &str,
        format: SparseFormat,
        shape: Option<(u64, u64)>,
        dtype: DType,
    ) -> Result<SparseDataset<'s, S>> {
        let path = self.child(name);
        codec::encode_empty(self.store, &path, format, shape, dtype, &self.config)?;
        Ok(self.dataset_at(path))
    }

    /// Copy a stored dataset (from any store) verbatim under `name`
    pub fn copy_dataset<T: ArrayStore + ?Sized>(
        &self,
        name: &str,
        source: &SparseDataset<'_, T>,
    ) -> Result<SparseDataset<'s, S>> {
        let path = self.child(name);
        codec::copy(source.store, &source.path, self.store, &path, &self.config)?;
        Ok(self.dataset_at(path))
    }

    fn child(&self, name: &str) -> String {
        join_path(&self.path, name)
    }

    fn group_at(&self, path: String) -> Group<'s, S> {
        Group {
            store: self.store,
            path,
            config: self.config.clone(),
        }
    }

    fn dataset_at(&self, path: String) -> SparseDataset<'s, S> {
        SparseDataset {
            store: self.store,
            path,
            config: self.config.clone(),
        }
    }
}

// =============================================================================
// PlainArray
// =============================================================================

/// An ordinary array stored next to sparse matrices
pub struct PlainArray<'s, S: ArrayStore + ?Sized> {
    store: &'s S,
    path: String,
}

impl<'s, S: ArrayStore + ?Sized> PlainArray<'s, S> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> Result<u64> {
        self.store.array_len(&self.path)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn dtype(&self) -> Result<DType> {
        self.store.array_dtype(&self.path)
    }

    pub fn read(&self) -> Result<ArrayData> {
        self.store.read_array(&self.path)
    }

    pub fn read_slice(&self, start: Option<i64>, stop: Option<i64>) -> Result<ArrayData> {
        self.store.read_slice(&self.path, start, stop)
    }
}

// =============================================================================
// SparseDataset
// =============================================================================

/// A sparse matrix stored as a group of three arrays
pub struct SparseDataset<'s, S: ArrayStore + ?Sized> {
    store: &'s S,
    path: String,
    config: Config,
}

impl<'s, S: ArrayStore + ?Sized> SparseDataset<'s, S> {
    /// Open the matrix group at `path`
    pub fn open(store: &'s S, path: &str) -> Result<Self> {
        if store.kind(path)? != Some(NodeKind::Group) || !codec::is_sparse_group(store, path)? {
            return Err(SparseError::NotASparseMatrix(path.to_string()));
        }
        Ok(Self {
            store,
            path: path.to_string(),
            config: Config::default(),
        })
    }

    /// Use `config` for full decodes
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Format tag and shape
    pub fn header(&self) -> Result<MatrixHeader> {
        codec::read_header(self.store, &self.path)
    }

    /// Raw `format` attribute
    pub fn format_tag(&self) -> Result<String> {
        Ok(self.header()?.format_tag)
    }

    pub fn format(&self) -> Result<SparseFormat> {
        self.header()?.format()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> Result<(u64, u64)> {
        Ok(self.header()?.shape)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> Result<u64> {
        self.store.array_len(&join_path(&self.path, DATA))
    }

    /// The whole matrix
    pub fn value(&self) -> Result<SparseMatrix> {
        resolver::resolve_all(self.store, &self.path, &self.config)
    }

    /// A contiguous block of outer indices, e.g. `dataset.get(1i64..3)`
    pub fn get(&self, range: impl Into<OuterRange>) -> Result<SparseMatrix> {
        resolver::resolve(self.store, &self.path, range)
    }

    pub fn get_selection(&self, selection: Selection) -> Result<SparseMatrix> {
        resolver::resolve_selection(self.store, &self.path, selection, &self.config)
    }

    /// Grow the stored matrix by `incoming`
    pub fn append(&self, incoming: &SparseMatrix) -> Result<()> {
        appender::append(self.store, &self.path, incoming)
    }
}
