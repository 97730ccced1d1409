use std::sync::Arc;

use coordd_assetindex::{pack_controller_outpoint, AddrAssetBalance, AssetBalanceIndex};
use coordd_storage::memory::MemoryStore;
use coordd_storage::{KeyValueStore, WriteBatch};
use primitive_types::U256;

const TXID_1: &str = "aabbccdd00112233445566778899aabbccddeeff00112233445566778899aabb";
const TXID_2: &str = "1111111111111111111111111111111111111111111111111111111111111111";

fn controller(txid: &str) -> Vec<u8> {
    pack_controller_outpoint(txid, 0).expect("pack controller")
}

#[test]
fn write_then_read() {
    let store = Arc::new(MemoryStore::new());
    let index = AssetBalanceIndex::new(Arc::clone(&store));
    let ctrl = controller(TXID_1);
    let addr_desc = vec![0x00, 0x14, 0x75, 0x1e, 0x76];

    assert!(index.get(&addr_desc, &ctrl).expect("get").is_none());

    let balance = AddrAssetBalance {
        txs: 5,
        balance_sat: U256::from(12_345_678u64),
        sent_sat: U256::from(87_654_321u64),
    };
    let mut batch = WriteBatch::new();
    index.put(&mut batch, &addr_desc, &ctrl, &balance);
    store.write_batch(&batch).expect("commit");

    let got = index.get(&addr_desc, &ctrl).expect("get").expect("balance");
    assert_eq!(got, balance);
}

#[test]
fn assets_lists_every_controller_for_address() {
    let store = Arc::new(MemoryStore::new());
    let index = AssetBalanceIndex::new(Arc::clone(&store));
    let addr_desc = vec![0x00, 0x14, 0xaa, 0xaa];
    let ctrl_a = controller(TXID_1);
    let ctrl_b = controller(TXID_2);

    let mut batch = WriteBatch::new();
    index.put(
        &mut batch,
        &addr_desc,
        &ctrl_a,
        &AddrAssetBalance {
            txs: 3,
            balance_sat: U256::from(100u64),
            ..Default::default()
        },
    );
    index.put(
        &mut batch,
        &addr_desc,
        &ctrl_b,
        &AddrAssetBalance {
            txs: 7,
            balance_sat: U256::from(200u64),
            ..Default::default()
        },
    );
    store.write_batch(&batch).expect("commit");

    let assets = index.assets(&addr_desc).expect("assets");
    assert_eq!(assets.len(), 2);

    let mut found_a = false;
    let mut found_b = false;
    for info in &assets {
        if info.controller == ctrl_a {
            found_a = true;
            assert_eq!(info.balance.txs, 3);
        }
        if info.controller == ctrl_b {
            found_b = true;
            assert_eq!(info.balance.txs, 7);
        }
    }
    assert!(found_a, "controller A missing");
    assert!(found_b, "controller B missing");
}

#[test]
fn assets_do_not_leak_between_addresses() {
    let store = Arc::new(MemoryStore::new());
    let index = AssetBalanceIndex::new(Arc::clone(&store));
    let addr_1 = vec![0x00, 0x14, 0xaa, 0xaa];
    let addr_2 = vec![0x00, 0x14, 0xbb, 0xbb];
    let ctrl = controller(TXID_1);

    let mut batch = WriteBatch::new();
    index.put(
        &mut batch,
        &addr_1,
        &ctrl,
        &AddrAssetBalance {
            txs: 1,
            balance_sat: U256::from(100u64),
            ..Default::default()
        },
    );
    index.put(
        &mut batch,
        &addr_2,
        &ctrl,
        &AddrAssetBalance {
            txs: 2,
            balance_sat: U256::from(200u64),
            ..Default::default()
        },
    );
    store.write_batch(&batch).expect("commit");

    let assets_1 = index.assets(&addr_1).expect("assets 1");
    assert_eq!(assets_1.len(), 1);
    assert_eq!(assets_1[0].balance.txs, 1);
    assert_eq!(assets_1[0].balance.balance_sat, U256::from(100u64));

    let assets_2 = index.assets(&addr_2).expect("assets 2");
    assert_eq!(assets_2.len(), 1);
    assert_eq!(assets_2[0].balance.txs, 2);
    assert_eq!(assets_2[0].balance.balance_sat, U256::from(200u64));
}
