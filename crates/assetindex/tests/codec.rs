use coordd_assetindex::history::{pack_desc_height, pack_history_record, unpack_desc_height};
use coordd_assetindex::types::{pack_addr_balance, unpack_addr_balance, AddrBalance, Utxo};
use coordd_assetindex::{
    format_controller_outpoint, pack_controller_outpoint, parse_controller_string,
    unpack_controller_outpoint, AssetRegistryEntry,
};
use coordd_primitives::pack_txid;
use primitive_types::U256;

const TXID_1: &str = "aabbccdd00112233445566778899aabbccddeeff00112233445566778899aabb";
const TXID_2: &str = "1111111111111111111111111111111111111111111111111111111111111111";

#[test]
fn controller_outpoint_roundtrip() {
    for (txid, vout) in [(TXID_1, 0), (TXID_1, 1), (TXID_2, 255), (TXID_2, 65_535)] {
        let packed = pack_controller_outpoint(txid, vout).expect("pack");
        let (got_txid, got_vout) = unpack_controller_outpoint(&packed).expect("unpack");
        assert_eq!(got_txid, txid);
        assert_eq!(got_vout, vout);
    }
}

#[test]
fn format_controller_outpoint_strings() {
    let packed = pack_controller_outpoint(TXID_1, 0).expect("pack");
    assert_eq!(format_controller_outpoint(&packed), format!("{TXID_1}:0"));
    assert_eq!(format_controller_outpoint(&[]), "");
    // Too short to carry a txid: hex fallback.
    assert_eq!(format_controller_outpoint(&[0xab, 0xcd]), "abcd");
}

#[test]
fn parse_controller_string_roundtrip() {
    let original = pack_controller_outpoint(TXID_1, 7).expect("pack");
    let formatted = format_controller_outpoint(&original);
    let parsed = parse_controller_string(&formatted)
        .expect("parse")
        .expect("some");
    assert_eq!(parsed, original);

    assert_eq!(parse_controller_string("no colon here").expect("parse"), None);
    assert_eq!(parse_controller_string(":0").expect("parse"), None);
    assert!(parse_controller_string("zz:0").is_err());
}

#[test]
fn desc_height_roundtrip_and_order() {
    for height in [0u32, 1, 100, 500_000, u32::MAX - 1, u32::MAX] {
        let packed = pack_desc_height(height);
        assert_eq!(unpack_desc_height(&packed), height);
    }
    // Lower height packs to the lexicographically larger key.
    assert!(pack_desc_height(100) > pack_desc_height(200));
}

#[test]
fn registry_entry_normal_roundtrip() {
    let ctrl = pack_controller_outpoint(TXID_1, 0).expect("pack");
    let entry = AssetRegistryEntry {
        ticker: "GOLD".to_string(),
        headline: "Digital Gold Token".to_string(),
        precision: 4,
        asset_type: 0,
        total_supply: U256::from(100_000_000u64),
        current_controller: ctrl,
        is_redirect: false,
    };

    let packed = entry.encode();
    assert_eq!(packed[0], 0, "normal entries carry tag 0");
    assert_eq!(AssetRegistryEntry::decode(&packed).expect("decode"), entry);
}

#[test]
fn registry_entry_redirect_roundtrip() {
    let new_ctrl = pack_controller_outpoint(TXID_2, 0).expect("pack");
    let redirect = AssetRegistryEntry::redirect_to(new_ctrl.clone());

    let packed = redirect.encode();
    assert_eq!(packed[0], 1, "redirects carry tag 1");
    let decoded = AssetRegistryEntry::decode(&packed).expect("decode");
    assert!(decoded.is_redirect);
    assert_eq!(decoded.current_controller, new_ctrl);
}

#[test]
fn registry_entry_rejects_garbage() {
    assert!(AssetRegistryEntry::decode(&[]).is_err());
    assert!(AssetRegistryEntry::decode(&[7]).is_err());
    // Normal tag with a truncated payload.
    assert!(AssetRegistryEntry::decode(&[0, 4, b'G']).is_err());
}

#[test]
fn history_record_tail_markers() {
    let btx_id = pack_txid(TXID_1).expect("pack");
    let record = pack_history_record(&btx_id, &[0, 1]);
    assert!(record.starts_with(&btx_id));
    // 0 << 1 continues, 1 << 1 | 1 terminates.
    assert_eq!(&record[32..], [0x00, 0x03]);

    let record = pack_history_record(&btx_id, &[5]);
    assert_eq!(&record[32..], [0x0b]);
}

#[test]
fn addr_balance_asset_aware_roundtrip() {
    let btx_id_1 = pack_txid(TXID_1).expect("pack");
    let btx_id_2 = pack_txid(TXID_2).expect("pack");
    let ctrl = pack_controller_outpoint(TXID_1, 0).expect("pack");

    let balance = AddrBalance {
        txs: 3,
        sent_sat: U256::from(50_000u64),
        balance_sat: U256::from(150_000u64),
        utxos: vec![
            Utxo {
                btx_id: btx_id_1,
                vout: 0,
                height: 100,
                value_sat: U256::from(50_000u64),
                ..Default::default()
            },
            Utxo {
                btx_id: btx_id_1,
                vout: 1,
                height: 100,
                value_sat: U256::from(100_000u64),
                controller: ctrl.clone(),
                is_controller: false,
            },
            Utxo {
                btx_id: btx_id_2,
                vout: 0,
                height: 100,
                value_sat: U256::zero(),
                controller: ctrl.clone(),
                is_controller: true,
            },
        ],
    };

    let packed = pack_addr_balance(&balance, true);
    let got = unpack_addr_balance(&packed, true).expect("unpack");
    assert_eq!(got, balance);
    assert!(got.utxos[0].controller.is_empty());
    assert!(!got.utxos[1].is_controller);
    assert!(got.utxos[2].is_controller);
}

#[test]
fn addr_balance_not_asset_aware_drops_tags() {
    let btx_id = pack_txid(TXID_1).expect("pack");
    let ctrl = pack_controller_outpoint(TXID_1, 0).expect("pack");

    let balance = AddrBalance {
        txs: 1,
        sent_sat: U256::zero(),
        balance_sat: U256::from(100u64),
        utxos: vec![Utxo {
            btx_id,
            vout: 0,
            height: 1,
            value_sat: U256::from(100u64),
            controller: ctrl,
            is_controller: false,
        }],
    };

    let packed = pack_addr_balance(&balance, false);
    let got = unpack_addr_balance(&packed, false).expect("unpack");
    assert!(got.utxos[0].controller.is_empty());
}

#[test]
fn addr_balance_skips_spent_utxos() {
    let btx_id = pack_txid(TXID_1).expect("pack");
    let balance = AddrBalance {
        txs: 1,
        sent_sat: U256::zero(),
        balance_sat: U256::zero(),
        utxos: vec![Utxo {
            btx_id,
            vout: -1,
            height: 10,
            value_sat: U256::from(5u64),
            ..Default::default()
        }],
    };

    let packed = pack_addr_balance(&balance, true);
    let got = unpack_addr_balance(&packed, true).expect("unpack");
    assert!(got.utxos.is_empty());
}

#[test]
fn addr_asset_balance_roundtrip() {
    use coordd_assetindex::AddrAssetBalance;

    let cases = [
        AddrAssetBalance {
            txs: 5,
            balance_sat: U256::from(100_000_000u64),
            sent_sat: U256::from(50_000_000u64),
        },
        AddrAssetBalance::default(),
        AddrAssetBalance {
            txs: 999_999,
            balance_sat: U256::from(9_000_000_000_000_000u64),
            sent_sat: U256::from(1u64) << 50,
        },
    ];
    for balance in cases {
        let packed = balance.encode();
        assert_eq!(AddrAssetBalance::decode(&packed).expect("decode"), balance);
    }
}
