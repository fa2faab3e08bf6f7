//! Tests for Group / Entry / SparseDataset
//!
//! These tests verify:
//! - Open dispatch into plain arrays, sparse matrices and plain groups
//! - Dataset creation (from a matrix, empty, copied from another store)
//! - Ranged reads and append through the dataset handle
//! - Persistence of datasets through a snapshot

use sparsestore::store::{ArrayOptions, AttrValue};
use sparsestore::{
    ArrayData, ArrayStore, Config, DType, Entry, Group, MemoryStore, OuterRange, Selection,
    SparseDataset, SparseError, SparseFormat, SparseMatrix,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn example() -> SparseMatrix {
    SparseMatrix::from_dense(
        SparseFormat::RowCompressed,
        &[
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0],
            vec![1.0, 1.0, 0.0],
        ],
    )
    .unwrap()
}

/// `sparse/` holding a matrix and a plain array side by side
fn populated() -> MemoryStore {
    let store = MemoryStore::new();
    Group::root(&store).create_dataset("sparse/matrix", &example()).unwrap();
    store
        .create_array("sparse/labels", ArrayData::I32(vec![3, 1, 4, 1]), ArrayOptions::resizable())
        .unwrap();
    store
}

// =============================================================================
// Open Dispatch Tests
// =============================================================================

#[test]
fn test_get_dispatches_by_node_kind() {
    let store = populated();
    let root = Group::root(&store);

    assert!(matches!(root.get("sparse").unwrap(), Entry::PlainGroup(_)));
    assert!(matches!(root.get("sparse/matrix").unwrap(), Entry::SparseMatrix(_)));
    assert!(matches!(root.get("sparse/labels").unwrap(), Entry::PlainArray(_)));
    assert!(matches!(root.get("sparse/matrix/indptr").unwrap(), Entry::PlainArray(_)));
}

#[test]
fn test_get_through_nested_group() {
    let store = populated();
    let sparse = Group::root(&store).get("sparse").unwrap().into_group().unwrap();

    let dataset = sparse.get("matrix").unwrap().into_sparse().unwrap();

    assert_eq!(sparse.path(), "sparse");
    assert_eq!(dataset.path(), "sparse/matrix");
    assert_eq!(dataset.value().unwrap(), example());
}

#[test]
fn test_get_missing_path() {
    let store = populated();

    assert!(matches!(
        Group::root(&store).get("sparse/nope"),
        Err(SparseError::NotFound(path)) if path == "sparse/nope"
    ));
}

#[test]
fn test_into_wrong_variant_fails() {
    let store = populated();
    let root = Group::root(&store);

    assert!(matches!(
        root.get("sparse/matrix").unwrap().into_group(),
        Err(SparseError::NotAGroup(_))
    ));
    assert!(matches!(
        root.get("sparse/labels").unwrap().into_sparse(),
        Err(SparseError::NotASparseMatrix(_))
    ));
    assert!(matches!(
        root.get("sparse").unwrap().into_array(),
        Err(SparseError::NotAnArray(_))
    ));
}

#[test]
fn test_plain_array_entry() {
    let store = populated();
    let labels = Group::root(&store).get("sparse/labels").unwrap().into_array().unwrap();

    assert_eq!(labels.len().unwrap(), 4);
    assert!(!labels.is_empty().unwrap());
    assert_eq!(labels.dtype().unwrap(), DType::I32);
    assert_eq!(labels.read().unwrap(), ArrayData::I32(vec![3, 1, 4, 1]));
    assert_eq!(labels.read_slice(Some(-2), None).unwrap(), ArrayData::I32(vec![4, 1]));
}

#[test]
fn test_keys_and_contains() {
    let store = populated();
    let sparse = Group::root(&store).get("sparse").unwrap().into_group().unwrap();

    assert_eq!(sparse.keys().unwrap(), vec!["labels".to_string(), "matrix".to_string()]);
    assert!(sparse.contains("matrix").unwrap());
    assert!(!sparse.contains("other").unwrap());
}

#[test]
fn test_require_group() {
    let store = populated();
    let root = Group::root(&store);

    let fresh = root.require_group("a/b").unwrap();
    assert_eq!(fresh.path(), "a/b");
    assert!(matches!(root.get("a/b").unwrap(), Entry::PlainGroup(_)));

    assert!(root.require_group("sparse").is_ok());
    assert!(matches!(root.require_group("sparse/matrix"), Err(SparseError::NotAGroup(_))));
}

#[test]
fn test_open_requires_sparse_group() {
    let store = populated();

    assert!(SparseDataset::open(&store, "sparse/matrix").is_ok());
    assert!(matches!(
        SparseDataset::open(&store, "sparse"),
        Err(SparseError::NotASparseMatrix(_))
    ));
    assert!(matches!(
        SparseDataset::open(&store, "sparse/labels"),
        Err(SparseError::NotASparseMatrix(_))
    ));
    assert!(matches!(
        SparseDataset::open(&store, "missing"),
        Err(SparseError::NotASparseMatrix(_))
    ));
}

// =============================================================================
// Dataset Creation Tests
// =============================================================================

#[test]
fn test_dataset_metadata() {
    let store = populated();
    let dataset = SparseDataset::open(&store, "sparse/matrix").unwrap();

    assert_eq!(dataset.format_tag().unwrap(), "csr");
    assert_eq!(dataset.format().unwrap(), SparseFormat::RowCompressed);
    assert_eq!(dataset.shape().unwrap(), (4, 3));
    assert_eq!(dataset.nnz().unwrap(), 4);
    assert_eq!(dataset.header().unwrap().shape, (4, 3));
}

#[test]
fn test_group_config_applies_to_created_datasets() {
    let store = MemoryStore::new();
    let root = Group::root(&store).with_config(Config::builder().index_dtype(DType::U64).build());

    root.create_dataset("m", &example()).unwrap();

    assert_eq!(root.config().index_dtype, DType::U64);
    assert_eq!(store.array_dtype("m/indices").unwrap(), DType::U64);
}

#[test]
fn test_create_dataset_with_explicit_config() {
    let store = MemoryStore::new();
    let config = Config::builder().indptr_dtype(DType::U32).build();

    Group::root(&store).create_dataset_with("m", &example(), &config).unwrap();

    assert_eq!(store.array_dtype("m/indptr").unwrap(), DType::U32);
}

#[test]
fn test_create_dataset_on_existing_name_fails() {
    let store = populated();

    assert!(matches!(
        Group::root(&store).create_dataset("sparse/matrix", &example()),
        Err(SparseError::AlreadyExists(_))
    ));
}

#[test]
fn test_create_empty_dataset() {
    let store = MemoryStore::new();
    let root = Group::root(&store);

    let dataset = root
        .create_empty_dataset("e", SparseFormat::ColumnCompressed, Some((5, 2)), DType::F32)
        .unwrap();

    assert_eq!(dataset.shape().unwrap(), (5, 2));
    assert_eq!(dataset.nnz().unwrap(), 0);
    let value = dataset.value().unwrap();
    assert_eq!(value.indptr(), &[0, 0, 0]);
    assert_eq!(value.values().dtype(), DType::F32);
}

#[test]
fn test_copy_dataset_across_stores() {
    let src = populated();
    src.set_attr("sparse/matrix", "note", AttrValue::from("keep")).unwrap();
    let source = SparseDataset::open(&src, "sparse/matrix").unwrap();

    let dst = MemoryStore::new();
    let copy = Group::root(&dst).copy_dataset("backup/matrix", &source).unwrap();

    assert_eq!(copy.value().unwrap(), example());
    assert_eq!(dst.get_attr("backup/matrix", "note").unwrap(), Some(AttrValue::from("keep")));
}

// =============================================================================
// Read / Append Through Handle Tests
// =============================================================================

#[test]
fn test_get_and_selection() {
    let store = populated();
    let dataset = SparseDataset::open(&store, "sparse/matrix").unwrap();

    assert_eq!(dataset.get(1i64..3).unwrap().shape(), (2, 3));
    assert_eq!(dataset.get_selection(Selection::All).unwrap(), example());
    assert_eq!(
        dataset
            .get_selection(Selection::Range(OuterRange::new(Some(-1), None)))
            .unwrap()
            .to_dense(),
        vec![vec![1.0, 1.0, 0.0]]
    );
}

#[test]
fn test_append_through_handle() {
    let store = populated();
    let dataset = Group::root(&store).get("sparse/matrix").unwrap().into_sparse().unwrap();
    let incoming = SparseMatrix::from_dense(SparseFormat::RowCompressed, &[vec![0.0, 4.0, 0.0]]).unwrap();

    dataset.append(&incoming).unwrap();

    assert_eq!(dataset.shape().unwrap(), (5, 3));
    assert_eq!(dataset.nnz().unwrap(), 5);
    assert_eq!(dataset.get(-1i64..).unwrap(), incoming);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_dataset_survives_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.snap");

    {
        let store = populated();
        store.save(&path).unwrap();
    }

    let store = MemoryStore::open(&path).unwrap();
    let dataset = Group::root(&store).get("sparse/matrix").unwrap().into_sparse().unwrap();

    assert_eq!(dataset.value().unwrap(), example());
    assert_eq!(dataset.get(-2i64..).unwrap().to_dense(), example().to_dense()[2..].to_vec());
}
