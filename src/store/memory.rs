//! In-memory array store
//!
//! A tree of groups and arrays held behind a single `RwLock`, with optional
//! persistence to a checksummed snapshot file.
//!
//! ## Snapshot Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                       │
//! │   Magic: "SPST" (4) | Version: u16 (2)                  │
//! │   CRC32 of payload: u32 (4) | Payload length: u64 (8)   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Payload (variable)                                      │
//! │   bincode-encoded node tree                             │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SparseError};

use super::{ArrayData, ArrayOptions, ArrayStore, AttrValue, DType, NodeKind};

/// Magic bytes identifying a snapshot file
const MAGIC: &[u8; 4] = b"SPST";

/// Current snapshot format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + CRC (4) + Length (8) = 18 bytes
const HEADER_SIZE: usize = 18;

// =============================================================================
// Node Tree
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GroupNode {
    children: BTreeMap<String, Node>,
    attrs: BTreeMap<String, AttrValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArrayNode {
    data: ArrayData,
    options: ArrayOptions,
    attrs: BTreeMap<String, AttrValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Group(GroupNode),
    Array(ArrayNode),
}

impl Node {
    fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        match self {
            Node::Group(g) => &g.attrs,
            Node::Array(a) => &a.attrs,
        }
    }

    fn attrs_mut(&mut self) -> &mut BTreeMap<String, AttrValue> {
        match self {
            Node::Group(g) => &mut g.attrs,
            Node::Array(a) => &mut a.attrs,
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn find<'a>(mut node: &'a Node, segs: &[&str]) -> Option<&'a Node> {
    for seg in segs {
        node = match node {
            Node::Group(g) => g.children.get(*seg)?,
            Node::Array(_) => return None,
        };
    }
    Some(node)
}

fn find_mut<'a>(mut node: &'a mut Node, segs: &[&str]) -> Option<&'a mut Node> {
    for seg in segs {
        node = match node {
            Node::Group(g) => g.children.get_mut(*seg)?,
            Node::Array(_) => return None,
        };
    }
    Some(node)
}

/// Walk `segs` from `node`, creating missing groups on the way
fn ensure_group<'a>(node: &'a mut Node, segs: &[&str], full_path: &str) -> Result<&'a mut GroupNode> {
    let mut group = match node {
        Node::Group(g) => g,
        Node::Array(_) => return Err(SparseError::NotAGroup(full_path.to_string())),
    };
    for seg in segs {
        let child = group
            .children
            .entry(seg.to_string())
            .or_insert_with(|| Node::Group(GroupNode::default()));
        group = match child {
            Node::Group(g) => g,
            Node::Array(_) => return Err(SparseError::NotAGroup(full_path.to_string())),
        };
    }
    Ok(group)
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Array store that keeps everything in memory
///
/// ## Concurrency:
/// - The whole tree sits behind one `RwLock`: reads share, writes exclude
/// - Each trait call takes the lock once; multi-call sequences (such as an
///   append) are not atomic with respect to other callers
pub struct MemoryStore {
    root: RwLock<Node>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store (root group only)
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Node::Group(GroupNode::default())),
        }
    }

    /// Load a snapshot if `path` exists, otherwise start empty
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Read a snapshot file written by [`MemoryStore::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_SIZE {
            return Err(SparseError::SnapshotCorruption(format!(
                "file is {} bytes, shorter than the {} byte header",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let (header, payload) = bytes.split_at(HEADER_SIZE);
        if &header[0..4] != MAGIC {
            return Err(SparseError::SnapshotCorruption(format!(
                "invalid magic: expected SPST, got {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(SparseError::SnapshotCorruption(format!(
                "unsupported snapshot version: {}",
                version
            )));
        }

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&header[6..10]);
        let expected_crc = u32::from_le_bytes(crc_bytes);

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[10..18]);
        let payload_len = u64::from_le_bytes(len_bytes);

        if payload.len() as u64 != payload_len {
            return Err(SparseError::SnapshotCorruption(format!(
                "payload length mismatch: header says {}, file has {}",
                payload_len,
                payload.len()
            )));
        }

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(SparseError::SnapshotCorruption(format!(
                "CRC mismatch: expected {:#010x}, got {:#010x}",
                expected_crc, actual_crc
            )));
        }

        let root: Node = bincode::deserialize(payload)
            .map_err(|e| SparseError::Serialization(e.to_string()))?;
        if !matches!(root, Node::Group(_)) {
            return Err(SparseError::SnapshotCorruption(
                "snapshot root is not a group".to_string(),
            ));
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "loaded snapshot");

        Ok(Self {
            root: RwLock::new(root),
        })
    }

    /// Write the whole tree to `path`.
    ///
    /// The snapshot is written to a sibling temp file, synced, then renamed
    /// over `path`, so readers never see a half-written snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = {
            let root = self.root.read();
            bincode::serialize(&*root).map_err(|e| SparseError::Serialization(e.to_string()))?
        };

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(MAGIC)?;
            file.write_all(&VERSION.to_le_bytes())?;
            file.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
            file.write_all(&(payload.len() as u64).to_le_bytes())?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        tracing::debug!(path = %path.display(), bytes = HEADER_SIZE + payload.len(), "saved snapshot");
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn with_array<T>(&self, path: &str, f: impl FnOnce(&ArrayNode) -> Result<T>) -> Result<T> {
        let root = self.root.read();
        match find(&root, &segments(path)) {
            Some(Node::Array(a)) => f(a),
            Some(Node::Group(_)) => Err(SparseError::NotAnArray(path.to_string())),
            None => Err(SparseError::NotFound(path.to_string())),
        }
    }

    fn with_array_mut<T>(&self, path: &str, f: impl FnOnce(&mut ArrayNode) -> Result<T>) -> Result<T> {
        let mut root = self.root.write();
        match find_mut(&mut root, &segments(path)) {
            Some(Node::Array(a)) => f(a),
            Some(Node::Group(_)) => Err(SparseError::NotAnArray(path.to_string())),
            None => Err(SparseError::NotFound(path.to_string())),
        }
    }

    /// Insert a fresh node at `path`, creating parents; fails if occupied
    fn insert(&self, path: &str, node: Node) -> Result<()> {
        let segs = segments(path);
        let (name, parents) = segs
            .split_last()
            .ok_or_else(|| SparseError::AlreadyExists("/".to_string()))?;

        let mut root = self.root.write();
        let parent = ensure_group(&mut root, parents, path)?;
        if parent.children.contains_key(*name) {
            return Err(SparseError::AlreadyExists(path.to_string()));
        }
        parent.children.insert(name.to_string(), node);
        Ok(())
    }
}

impl ArrayStore for MemoryStore {
    fn kind(&self, path: &str) -> Result<Option<NodeKind>> {
        let root = self.root.read();
        Ok(find(&root, &segments(path)).map(|node| match node {
            Node::Group(_) => NodeKind::Group,
            Node::Array(_) => NodeKind::Array,
        }))
    }

    fn list(&self, path: &str) -> Result<Vec<String>> {
        let root = self.root.read();
        match find(&root, &segments(path)) {
            Some(Node::Group(g)) => Ok(g.children.keys().cloned().collect()),
            Some(Node::Array(_)) => Err(SparseError::NotAGroup(path.to_string())),
            None => Err(SparseError::NotFound(path.to_string())),
        }
    }

    fn create_group(&self, path: &str) -> Result<()> {
        self.insert(path, Node::Group(GroupNode::default()))
    }

    fn create_array(&self, path: &str, data: ArrayData, options: ArrayOptions) -> Result<()> {
        if let Some(max) = options.max_len {
            if data.len() as u64 > max {
                return Err(SparseError::CapacityExceeded {
                    path: path.to_string(),
                    requested: data.len() as u64,
                    max,
                });
            }
        }
        self.insert(
            path,
            Node::Array(ArrayNode {
                data,
                options,
                attrs: BTreeMap::new(),
            }),
        )
    }

    fn delete(&self, path: &str) -> Result<()> {
        let segs = segments(path);
        let (name, parents) = segs
            .split_last()
            .ok_or_else(|| SparseError::Config("cannot delete the root group".to_string()))?;

        let mut root = self.root.write();
        match find_mut(&mut root, parents) {
            Some(Node::Group(g)) => g
                .children
                .remove(*name)
                .map(|_| ())
                .ok_or_else(|| SparseError::NotFound(path.to_string())),
            _ => Err(SparseError::NotFound(path.to_string())),
        }
    }

    fn array_len(&self, path: &str) -> Result<u64> {
        self.with_array(path, |a| Ok(a.data.len() as u64))
    }

    fn array_dtype(&self, path: &str) -> Result<DType> {
        self.with_array(path, |a| Ok(a.data.dtype()))
    }

    fn array_options(&self, path: &str) -> Result<ArrayOptions> {
        self.with_array(path, |a| Ok(a.options))
    }

    fn read_range(&self, path: &str, range: Range<u64>) -> Result<ArrayData> {
        self.with_array(path, |a| Ok(a.data.slice(range.start as usize..range.end as usize)))
    }

    fn resize_array(&self, path: &str, len: u64) -> Result<()> {
        self.with_array_mut(path, |a| {
            if let Some(max) = a.options.max_len {
                if len > max {
                    return Err(SparseError::CapacityExceeded {
                        path: path.to_string(),
                        requested: len,
                        max,
                    });
                }
            }
            a.data.resize(len as usize);
            Ok(())
        })
    }

    fn write_range(&self, path: &str, offset: u64, data: &ArrayData) -> Result<()> {
        self.with_array_mut(path, |a| a.data.write_at(offset as usize, data))
    }

    fn get_attr(&self, path: &str, name: &str) -> Result<Option<AttrValue>> {
        let root = self.root.read();
        find(&root, &segments(path))
            .map(|node| node.attrs().get(name).cloned())
            .ok_or_else(|| SparseError::NotFound(path.to_string()))
    }

    fn set_attr(&self, path: &str, name: &str, value: AttrValue) -> Result<()> {
        let mut root = self.root.write();
        let node = find_mut(&mut root, &segments(path))
            .ok_or_else(|| SparseError::NotFound(path.to_string()))?;
        node.attrs_mut().insert(name.to_string(), value);
        Ok(())
    }

    fn attr_names(&self, path: &str) -> Result<Vec<String>> {
        let root = self.root.read();
        find(&root, &segments(path))
            .map(|node| node.attrs().keys().cloned().collect())
            .ok_or_else(|| SparseError::NotFound(path.to_string()))
    }
}
