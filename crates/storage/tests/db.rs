//! Integration tests for the RocksDB backend

use dualvm_storage::{
    partitions, ChangeSet, Database, DatabaseConfig, MultiStore, SnapshotSource, StorageError,
    Whitelist, WhitelistedStore,
};
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: temp_dir.path().to_string_lossy().to_string(),
        ..Default::default()
    };
    let db = Database::open(config).unwrap();
    (db, temp_dir)
}

#[test]
fn test_open_database() {
    let (db, _temp_dir) = create_test_db();
    for name in partitions::ALL {
        assert!(db.has_partition(name));
    }
    assert!(!db.has_partition("blocks"));
}

#[test]
fn test_put_get_delete() {
    let (mut db, _temp_dir) = create_test_db();

    db.kv_store(partitions::BANK)
        .unwrap()
        .set(b"balances/a", b"1".to_vec())
        .unwrap();
    assert_eq!(
        db.get(partitions::BANK, b"balances/a").unwrap(),
        Some(b"1".to_vec())
    );

    db.kv_store(partitions::BANK)
        .unwrap()
        .delete(b"balances/a")
        .unwrap();
    assert_eq!(db.get(partitions::BANK, b"balances/a").unwrap(), None);
}

#[test]
fn test_prefix_scan_is_bounded() {
    let (mut db, _temp_dir) = create_test_db();
    let mut changes = ChangeSet::new();
    changes.set(partitions::BANK, b"balances/a", vec![1]);
    changes.set(partitions::BANK, b"balances/b", vec![2]);
    changes.set(partitions::BANK, b"supply/udual", vec![3]);
    db.apply(changes).unwrap();

    let pairs = db.prefix_scan(partitions::BANK, b"balances/").unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].0, b"balances/a".to_vec());
}

#[test]
fn test_cache_layer_flushes_in_one_batch() {
    let (mut db, _temp_dir) = create_test_db();
    let mut cache = db.cache_multi_store();
    cache
        .kv_store(partitions::EVM)
        .unwrap()
        .set(b"k1", vec![1])
        .unwrap();
    cache
        .kv_store(partitions::ACC)
        .unwrap()
        .set(b"k2", vec![2])
        .unwrap();
    cache.write().unwrap();

    assert_eq!(db.get(partitions::EVM, b"k1").unwrap(), Some(vec![1]));
    assert_eq!(db.get(partitions::ACC, b"k2").unwrap(), Some(vec![2]));
}

#[test]
fn test_unknown_partition_leaves_db_untouched() {
    let (mut db, _temp_dir) = create_test_db();
    let mut changes = ChangeSet::new();
    changes.set(partitions::EVM, b"k", vec![1]);
    changes.set("blocks", b"k", vec![1]);
    assert!(matches!(
        db.apply(changes),
        Err(StorageError::PartitionNotFound(_))
    ));
    assert_eq!(db.get(partitions::EVM, b"k").unwrap(), None);
}

#[test]
fn test_snapshot_is_pinned_and_read_only() {
    let (mut db, _temp_dir) = create_test_db();
    db.kv_store(partitions::EVM)
        .unwrap()
        .set(b"k", vec![1])
        .unwrap();

    let snapshot_value = {
        let store = db.latest_store().unwrap();
        store.get(partitions::EVM, b"k").unwrap()
    };
    assert_eq!(snapshot_value, Some(vec![1]));

    let mut snapshot = db.snapshot();
    let err = snapshot
        .kv_store(partitions::EVM)
        .unwrap()
        .set(b"k", vec![2])
        .unwrap_err();
    assert!(matches!(err, StorageError::ReadOnly));
}

#[test]
fn test_whitelisted_db_rejects_outside_prefix() {
    let (mut db, _temp_dir) = create_test_db();
    let whitelist = Arc::new(Whitelist::new().allow(partitions::BANK, ["balances/"]));
    let mut restricted = WhitelistedStore::new(&mut db, whitelist);

    let mut cache = restricted.cache_multi_store();
    cache
        .kv_store(partitions::BANK)
        .unwrap()
        .set(b"balances/x", vec![1])
        .unwrap();
    let err = cache
        .kv_store(partitions::GOV)
        .unwrap()
        .set(b"votes/1", vec![1])
        .unwrap_err();
    assert!(err.is_access_violation());
    drop(cache);
    drop(restricted);

    assert_eq!(db.get(partitions::BANK, b"balances/x").unwrap(), None);
}
