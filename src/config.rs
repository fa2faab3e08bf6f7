//! Configuration for sparsestore
//!
//! Storage policy applied when sparse matrices are written to an array store.

use crate::error::{Result, SparseError};
use crate::store::{ArrayOptions, DType};

/// Storage policy for encoded matrices
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Array Types
    // -------------------------------------------------------------------------
    /// Element type of the `indices` array (inner positions)
    pub index_dtype: DType,

    /// Element type of the `indptr` array (outer offsets)
    pub indptr_dtype: DType,

    // -------------------------------------------------------------------------
    // Array Store Hints
    // -------------------------------------------------------------------------
    /// Chunk length hint passed to the store for all three arrays
    pub chunk_len: Option<u64>,

    /// Create arrays without a maximum length so they can be appended to
    pub resizable: bool,

    // -------------------------------------------------------------------------
    // Read Path
    // -------------------------------------------------------------------------
    /// Check every inner index on full decode. When off, only the O(outer)
    /// indptr checks run.
    pub validate_on_decode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dtype: DType::U32,
            indptr_dtype: DType::U64,
            chunk_len: None,
            resizable: true,
            validate_on_decode: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings that cannot hold index data
    pub fn validate(&self) -> Result<()> {
        if !self.index_dtype.is_integer() {
            return Err(SparseError::Config(format!(
                "index dtype must be an integer type, got {}",
                self.index_dtype
            )));
        }
        if !self.indptr_dtype.is_integer() {
            return Err(SparseError::Config(format!(
                "indptr dtype must be an integer type, got {}",
                self.indptr_dtype
            )));
        }
        if self.chunk_len == Some(0) {
            return Err(SparseError::Config("chunk length must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Store options for an array created with `len` initial elements
    pub fn array_options(&self, len: u64) -> ArrayOptions {
        let options = if self.resizable {
            ArrayOptions::resizable()
        } else {
            ArrayOptions::fixed(len)
        };
        options.with_chunk_len(self.chunk_len)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the element type of the `indices` array
    pub fn index_dtype(mut self, dtype: DType) -> Self {
        self.config.index_dtype = dtype;
        self
    }

    /// Set the element type of the `indptr` array
    pub fn indptr_dtype(mut self, dtype: DType) -> Self {
        self.config.indptr_dtype = dtype;
        self
    }

    /// Set the chunk length hint (elements)
    pub fn chunk_len(mut self, len: u64) -> Self {
        self.config.chunk_len = Some(len);
        self
    }

    /// Allow or forbid growing the arrays after creation
    pub fn resizable(mut self, resizable: bool) -> Self {
        self.config.resizable = resizable;
        self
    }

    /// Enable or disable the inner index scan on full decode
    pub fn validate_on_decode(mut self, validate: bool) -> Self {
        self.config.validate_on_decode = validate;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
