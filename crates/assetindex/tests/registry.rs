use std::sync::Arc;

use coordd_assetindex::{pack_controller_outpoint, AssetRegistry, AssetRegistryEntry};
use coordd_storage::memory::MemoryStore;
use coordd_storage::{KeyValueStore, WriteBatch};
use primitive_types::U256;

const TXID_1: &str = "aabbccdd00112233445566778899aabbccddeeff00112233445566778899aabb";
const TXID_2: &str = "1111111111111111111111111111111111111111111111111111111111111111";
const TXID_3: &str = "2222222222222222222222222222222222222222222222222222222222222222";

fn controller(txid: &str) -> Vec<u8> {
    pack_controller_outpoint(txid, 0).expect("pack controller")
}

fn gold_entry(current: Vec<u8>, supply: u64) -> AssetRegistryEntry {
    AssetRegistryEntry {
        ticker: "GOLD".to_string(),
        headline: "Gold Token".to_string(),
        precision: 4,
        asset_type: 0,
        total_supply: U256::from(supply),
        current_controller: current,
        is_redirect: false,
    }
}

#[test]
fn write_read_and_resolve_redirect() {
    let store = Arc::new(MemoryStore::new());
    let registry = AssetRegistry::new(Arc::clone(&store));
    let ctrl_a = controller(TXID_1);
    let ctrl_b = controller(TXID_2);

    let mut batch = WriteBatch::new();
    registry.put(&mut batch, &ctrl_a, &gold_entry(ctrl_a.clone(), 1_000_000));
    registry.put(
        &mut batch,
        &ctrl_a,
        &AssetRegistryEntry::redirect_to(ctrl_b.clone()),
    );
    registry.put(&mut batch, &ctrl_b, &gold_entry(ctrl_b.clone(), 2_000_000));
    store.write_batch(&batch).expect("commit");

    let got_a = registry.get(&ctrl_a).expect("get a").expect("entry a");
    assert!(got_a.is_redirect);
    assert_eq!(got_a.current_controller, ctrl_b);

    let got_b = registry.get(&ctrl_b).expect("get b").expect("entry b");
    assert!(!got_b.is_redirect);
    assert_eq!(got_b.ticker, "GOLD");
    assert_eq!(got_b.total_supply, U256::from(2_000_000u64));

    assert_eq!(registry.resolve_current(&ctrl_a).expect("resolve a"), ctrl_b);
    assert_eq!(registry.resolve_current(&ctrl_b).expect("resolve b"), ctrl_b);
}

#[test]
fn resolve_unknown_returns_itself() {
    let store = Arc::new(MemoryStore::new());
    let registry = AssetRegistry::new(Arc::clone(&store));

    let unknown = vec![0xff, 0xff];
    assert_eq!(
        registry.resolve_current(&unknown).expect("resolve"),
        unknown
    );
}

#[test]
fn resolve_missing_entry_mid_chain_stops_there() {
    let store = Arc::new(MemoryStore::new());
    let registry = AssetRegistry::new(Arc::clone(&store));
    let ctrl_a = controller(TXID_1);
    let ctrl_b = controller(TXID_2);

    let mut batch = WriteBatch::new();
    registry.put(
        &mut batch,
        &ctrl_a,
        &AssetRegistryEntry::redirect_to(ctrl_b.clone()),
    );
    store.write_batch(&batch).expect("commit");

    assert_eq!(registry.resolve_current(&ctrl_a).expect("resolve"), ctrl_b);
}

#[test]
fn resolve_terminates_on_two_node_cycle() {
    let store = Arc::new(MemoryStore::new());
    let registry = AssetRegistry::new(Arc::clone(&store));
    let ctrl_a = controller(TXID_1);
    let ctrl_b = controller(TXID_2);

    let mut batch = WriteBatch::new();
    registry.put(
        &mut batch,
        &ctrl_a,
        &AssetRegistryEntry::redirect_to(ctrl_b.clone()),
    );
    registry.put(
        &mut batch,
        &ctrl_b,
        &AssetRegistryEntry::redirect_to(ctrl_a.clone()),
    );
    store.write_batch(&batch).expect("commit");

    let resolved = registry.resolve_current(&ctrl_a).expect("resolve");
    assert!(resolved == ctrl_a || resolved == ctrl_b);
}

#[test]
fn resolve_terminates_on_self_redirect() {
    let store = Arc::new(MemoryStore::new());
    let registry = AssetRegistry::new(Arc::clone(&store));
    let ctrl_a = controller(TXID_1);

    let mut batch = WriteBatch::new();
    registry.put(
        &mut batch,
        &ctrl_a,
        &AssetRegistryEntry::redirect_to(ctrl_a.clone()),
    );
    store.write_batch(&batch).expect("commit");

    assert_eq!(registry.resolve_current(&ctrl_a).expect("resolve"), ctrl_a);
}

#[test]
fn resolve_follows_multi_hop_chain() {
    let store = Arc::new(MemoryStore::new());
    let registry = AssetRegistry::new(Arc::clone(&store));
    let ctrl_a = controller(TXID_1);
    let ctrl_b = controller(TXID_2);
    let ctrl_c = controller(TXID_3);

    let mut batch = WriteBatch::new();
    registry.put(
        &mut batch,
        &ctrl_a,
        &AssetRegistryEntry::redirect_to(ctrl_b.clone()),
    );
    registry.put(
        &mut batch,
        &ctrl_b,
        &AssetRegistryEntry::redirect_to(ctrl_c.clone()),
    );
    registry.put(&mut batch, &ctrl_c, &gold_entry(ctrl_c.clone(), 5));
    store.write_batch(&batch).expect("commit");

    assert_eq!(registry.resolve_current(&ctrl_a).expect("resolve"), ctrl_c);
}

#[test]
fn overlay_is_consulted_before_disk() {
    let store = Arc::new(MemoryStore::new());
    let registry = AssetRegistry::new(Arc::clone(&store));
    let ctrl_a = controller(TXID_1);
    let ctrl_b = controller(TXID_2);

    // Nothing on disk; the staged overlay alone carries the redirect.
    let staged_redirect = AssetRegistryEntry::redirect_to(ctrl_b.clone());
    let staged_entry = gold_entry(ctrl_b.clone(), 10);
    let resolved = registry
        .resolve_current_with_overlay(&ctrl_a, |current| {
            if current == ctrl_a.as_slice() {
                Some(staged_redirect.clone())
            } else if current == ctrl_b.as_slice() {
                Some(staged_entry.clone())
            } else {
                None
            }
        })
        .expect("resolve");
    assert_eq!(resolved, ctrl_b);
}
