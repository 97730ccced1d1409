use coordd_storage::memory::MemoryStore;
use coordd_storage::{Column, KeyValueStore, Scan, WriteBatch};

#[test]
fn memory_roundtrip_and_delete() {
    let store = MemoryStore::new();
    store.put(Column::AssetIndex, b"key", b"value").expect("put");
    assert_eq!(
        store.get(Column::AssetIndex, b"key").expect("get"),
        Some(b"value".to_vec())
    );
    store.delete(Column::AssetIndex, b"key").expect("delete");
    assert!(store.get(Column::AssetIndex, b"key").expect("get").is_none());
}

#[test]
fn scan_prefix_does_not_cross_columns() {
    let store = MemoryStore::new();
    store.put(Column::AssetIndex, b"aa:1", b"x").expect("put");
    store.put(Column::AssetUndo, b"aa:2", b"y").expect("put");

    let entries = store.scan_prefix(Column::AssetIndex, b"aa:").expect("scan");
    assert_eq!(entries, vec![(b"aa:1".to_vec(), b"x".to_vec())]);
}

#[test]
fn for_each_range_is_inclusive_and_ordered() {
    let store = MemoryStore::new();
    for key in [b"k1", b"k2", b"k3", b"k4"] {
        store.put(Column::AssetIndex, key, b"v").expect("put");
    }

    let mut seen = Vec::new();
    store
        .for_each_range(Column::AssetIndex, b"k2", b"k3", &mut |key, _| {
            seen.push(key.to_vec());
            Ok(Scan::Continue)
        })
        .expect("range");
    assert_eq!(seen, vec![b"k2".to_vec(), b"k3".to_vec()]);
}

#[test]
fn visitor_stop_halts_iteration() {
    let store = MemoryStore::new();
    for key in [b"p1", b"p2", b"p3"] {
        store.put(Column::AssetIndex, key, b"v").expect("put");
    }

    let mut count = 0;
    store
        .for_each_prefix(Column::AssetIndex, b"p", &mut |_, _| {
            count += 1;
            Ok(if count == 2 { Scan::Stop } else { Scan::Continue })
        })
        .expect("prefix");
    assert_eq!(count, 2);
}

#[test]
fn write_batch_applies_all_ops() {
    let store = MemoryStore::new();
    store.put(Column::AssetIndex, b"stale", b"old").expect("put");

    let mut batch = WriteBatch::new();
    batch.put(Column::AssetIndex, b"fresh".as_slice(), b"new".as_slice());
    batch.delete(Column::AssetIndex, b"stale".as_slice());
    store.write_batch(&batch).expect("commit");

    assert!(store.get(Column::AssetIndex, b"stale").expect("get").is_none());
    assert_eq!(
        store.get(Column::AssetIndex, b"fresh").expect("get"),
        Some(b"new".to_vec())
    );
}
