//! Tests for the array store
//!
//! These tests verify:
//! - Slice bound normalization
//! - Checked dtype casting
//! - MemoryStore groups, arrays, attributes and resizing
//! - Snapshot save/load and corruption detection

use std::fs;
use std::path::PathBuf;

use sparsestore::store::{normalize_slice, ArrayOptions, AttrValue, NodeKind};
use sparsestore::{ArrayData, ArrayStore, DType, MemoryStore, SparseError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_snapshot() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.snap");
    (temp_dir, path)
}

fn store_with_array(values: Vec<u64>) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .create_array("g/a", ArrayData::U64(values), ArrayOptions::resizable())
        .unwrap();
    store
}

// =============================================================================
// Slice Normalization Tests
// =============================================================================

#[test]
fn test_normalize_slice_positive_bounds() {
    assert_eq!(normalize_slice(5, Some(1), Some(3)), 1..3);
    assert_eq!(normalize_slice(5, None, None), 0..5);
    assert_eq!(normalize_slice(5, Some(2), None), 2..5);
    assert_eq!(normalize_slice(5, None, Some(2)), 0..2);
}

#[test]
fn test_normalize_slice_negative_bounds() {
    assert_eq!(normalize_slice(5, Some(-2), None), 3..5);
    assert_eq!(normalize_slice(5, None, Some(-2)), 0..3);
    assert_eq!(normalize_slice(5, Some(-9), None), 0..5);
}

#[test]
fn test_normalize_slice_clamps_and_never_reverses() {
    assert_eq!(normalize_slice(5, Some(7), None), 5..5);
    assert_eq!(normalize_slice(5, Some(3), Some(1)), 3..3);
    assert_eq!(normalize_slice(5, Some(0), Some(100)), 0..5);
    assert_eq!(normalize_slice(0, None, None), 0..0);
}

// =============================================================================
// Casting Tests
// =============================================================================

#[test]
fn test_cast_widening_and_to_float() {
    let data = ArrayData::U32(vec![1, 2, 3]);

    assert_eq!(data.cast(DType::U64).unwrap(), ArrayData::U64(vec![1, 2, 3]));
    assert_eq!(data.cast(DType::F32).unwrap(), ArrayData::F32(vec![1.0, 2.0, 3.0]));
    assert_eq!(data.cast(DType::U32).unwrap(), data);
}

#[test]
fn test_cast_narrowing_overflow() {
    let data = ArrayData::U64(vec![1, u64::from(u32::MAX) + 1]);

    match data.cast(DType::U32) {
        Err(SparseError::ValueOutOfRange { dtype, value }) => {
            assert_eq!(dtype, DType::U32);
            assert_eq!(value, "4294967296");
        }
        other => panic!("expected ValueOutOfRange, got {:?}", other),
    }
}

#[test]
fn test_cast_negative_to_unsigned_fails() {
    let data = ArrayData::I64(vec![0, -1]);
    assert!(matches!(data.cast(DType::U64), Err(SparseError::ValueOutOfRange { .. })));
    assert!(data.to_u64_vec().is_err());
}

#[test]
fn test_cast_float_to_integer_fails() {
    let data = ArrayData::F64(vec![1.0]);
    assert!(matches!(data.cast(DType::I64), Err(SparseError::TypeMismatch { .. })));
}

// =============================================================================
// MemoryStore Tests
// =============================================================================

#[test]
fn test_create_array_creates_parent_groups() {
    let store = store_with_array(vec![1, 2, 3]);

    assert_eq!(store.kind("g").unwrap(), Some(NodeKind::Group));
    assert_eq!(store.kind("/g/a").unwrap(), Some(NodeKind::Array));
    assert_eq!(store.kind("g/missing").unwrap(), None);
    assert_eq!(store.list("").unwrap(), vec!["g".to_string()]);
    assert_eq!(store.list("g").unwrap(), vec!["a".to_string()]);
}

#[test]
fn test_create_existing_path_fails() {
    let store = store_with_array(vec![1]);

    assert!(matches!(store.create_group("g"), Err(SparseError::AlreadyExists(_))));
    assert!(matches!(
        store.create_array("g/a", ArrayData::U32(vec![]), ArrayOptions::default()),
        Err(SparseError::AlreadyExists(_))
    ));
}

#[test]
fn test_create_below_array_fails() {
    let store = store_with_array(vec![1]);

    assert!(matches!(store.create_group("g/a/b"), Err(SparseError::NotAGroup(_))));
    assert!(matches!(store.list("g/a"), Err(SparseError::NotAGroup(_))));
}

#[test]
fn test_require_group_is_idempotent() {
    let store = MemoryStore::new();

    store.require_group("x/y").unwrap();
    store.require_group("x/y").unwrap();

    assert_eq!(store.kind("x/y").unwrap(), Some(NodeKind::Group));
}

#[test]
fn test_read_slice_semantics() {
    let store = store_with_array(vec![10, 11, 12, 13, 14]);

    assert_eq!(store.read_slice("g/a", Some(1), Some(3)).unwrap(), ArrayData::U64(vec![11, 12]));
    assert_eq!(store.read_slice("g/a", Some(-2), None).unwrap(), ArrayData::U64(vec![13, 14]));
    assert_eq!(store.read_slice("g/a", Some(9), None).unwrap(), ArrayData::U64(vec![]));
    assert_eq!(store.read_array("g/a").unwrap().len(), 5);
}

#[test]
fn test_read_missing_array() {
    let store = MemoryStore::new();
    assert!(matches!(store.read_array("nope"), Err(SparseError::NotFound(_))));

    store.create_group("grp").unwrap();
    assert!(matches!(store.array_len("grp"), Err(SparseError::NotAnArray(_))));
}

#[test]
fn test_extend_array_casts_into_stored_dtype() {
    let store = store_with_array(vec![1, 2]);

    store.extend_array("g/a", &ArrayData::U32(vec![3])).unwrap();

    assert_eq!(store.read_array("g/a").unwrap(), ArrayData::U64(vec![1, 2, 3]));
    assert_eq!(store.array_dtype("g/a").unwrap(), DType::U64);
}

#[test]
fn test_extend_array_type_error_leaves_array_untouched() {
    let store = store_with_array(vec![1, 2]);

    let result = store.extend_array("g/a", &ArrayData::F64(vec![0.5]));

    assert!(matches!(result, Err(SparseError::TypeMismatch { .. })));
    assert_eq!(store.array_len("g/a").unwrap(), 2);
}

#[test]
fn test_resize_respects_max_len() {
    let store = MemoryStore::new();
    store
        .create_array("fixed", ArrayData::F32(vec![1.0, 2.0]), ArrayOptions::fixed(2))
        .unwrap();

    match store.resize_array("fixed", 3) {
        Err(SparseError::CapacityExceeded { requested, max, .. }) => {
            assert_eq!(requested, 3);
            assert_eq!(max, 2);
        }
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }

    store.resize_array("fixed", 1).unwrap();
    assert_eq!(store.read_array("fixed").unwrap(), ArrayData::F32(vec![1.0]));
}

#[test]
fn test_write_range_past_end_fails() {
    let store = store_with_array(vec![1, 2]);
    assert!(store.write_range("g/a", 1, &ArrayData::U64(vec![5, 6])).is_err());
    assert_eq!(store.read_array("g/a").unwrap(), ArrayData::U64(vec![1, 2]));
}

#[test]
fn test_attributes() {
    let store = store_with_array(vec![1]);

    store.set_attr("g", "format", AttrValue::from("csr")).unwrap();
    store.set_attr("g", "shape", AttrValue::from((4u64, 3u64))).unwrap();
    store.set_attr("g/a", "note", AttrValue::from(7u64)).unwrap();

    assert_eq!(store.get_attr("g", "format").unwrap(), Some(AttrValue::Str("csr".into())));
    assert_eq!(store.get_attr("g", "shape").unwrap(), Some(AttrValue::Uints(vec![4, 3])));
    assert_eq!(store.get_attr("g", "missing").unwrap(), None);
    assert_eq!(store.attr_names("g").unwrap(), vec!["format".to_string(), "shape".to_string()]);
    assert_eq!(store.get_attr("g/a", "note").unwrap().and_then(|v| v.as_uint()), Some(7));
    assert!(matches!(store.get_attr("nope", "x"), Err(SparseError::NotFound(_))));
}

#[test]
fn test_delete_removes_subtree() {
    let store = store_with_array(vec![1]);

    store.delete("g").unwrap();

    assert_eq!(store.kind("g").unwrap(), None);
    assert_eq!(store.kind("g/a").unwrap(), None);
    assert!(matches!(store.delete("g"), Err(SparseError::NotFound(_))));
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_round_trip() {
    let (_temp, path) = setup_temp_snapshot();

    {
        let store = store_with_array(vec![1, 2, 3]);
        store.set_attr("g", "format", AttrValue::from("csc")).unwrap();
        store
            .create_array("h/f", ArrayData::F64(vec![0.5]), ArrayOptions::fixed(1).with_chunk_len(Some(64)))
            .unwrap();
        store.save(&path).unwrap();
    }

    let store = MemoryStore::load(&path).unwrap();

    assert_eq!(store.read_array("g/a").unwrap(), ArrayData::U64(vec![1, 2, 3]));
    assert_eq!(store.read_array("h/f").unwrap(), ArrayData::F64(vec![0.5]));
    assert_eq!(store.array_options("h/f").unwrap().max_len, Some(1));
    assert_eq!(store.array_options("h/f").unwrap().chunk_len, Some(64));
    assert_eq!(store.get_attr("g", "format").unwrap(), Some(AttrValue::from("csc")));
}

#[test]
fn test_open_missing_snapshot_starts_empty() {
    let (_temp, path) = setup_temp_snapshot();

    let store = MemoryStore::open(&path).unwrap();

    assert!(store.list("").unwrap().is_empty());
}

#[test]
fn test_snapshot_crc_mismatch_detected() {
    let (_temp, path) = setup_temp_snapshot();
    store_with_array(vec![1, 2, 3]).save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(MemoryStore::load(&path), Err(SparseError::SnapshotCorruption(_))));
}

#[test]
fn test_snapshot_bad_magic_detected() {
    let (_temp, path) = setup_temp_snapshot();
    store_with_array(vec![1]).save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(b"NOPE");
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(MemoryStore::load(&path), Err(SparseError::SnapshotCorruption(_))));
}

#[test]
fn test_snapshot_truncated_detected() {
    let (_temp, path) = setup_temp_snapshot();
    store_with_array(vec![1, 2, 3]).save(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
    assert!(matches!(MemoryStore::load(&path), Err(SparseError::SnapshotCorruption(_))));

    fs::write(&path, &bytes[..5]).unwrap();
    assert!(matches!(MemoryStore::load(&path), Err(SparseError::SnapshotCorruption(_))));
}
