//! Transaction shapes as delivered by the daemon RPC layer.
//!
//! The RPC provider resolves amounts to satoshi integers and carries the
//! v10 asset metadata as an opaque JSON blob in `coin_specific_data`; the
//! indexer decodes that blob lazily with [`AssetMetadata`].

use primitive_types::U256;
use serde::Deserialize;

#[derive(Clone, Debug, Default)]
pub struct Block {
    pub height: u32,
    pub txs: Vec<Tx>,
}

#[derive(Clone, Debug, Default)]
pub struct Tx {
    pub txid: String,
    pub version: i32,
    pub lock_time: u32,
    pub vin: Vec<Vin>,
    pub vout: Vec<Vout>,
    pub block_height: u32,
    pub time: i64,
    /// Raw JSON metadata attached to v10 transactions, absent otherwise.
    pub coin_specific_data: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default)]
pub struct Vin {
    pub coinbase: Option<String>,
    pub txid: String,
    pub vout: u32,
    pub script_sig: String,
    pub sequence: u32,
    pub addresses: Vec<String>,
    /// Present on asset inputs only.
    pub asset_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Vout {
    pub value_sat: U256,
    pub n: u32,
    pub script_pub_key: ScriptPubKey,
}

#[derive(Clone, Debug, Default)]
pub struct ScriptPubKey {
    pub hex: String,
    pub addresses: Vec<String>,
}

/// The four optional metadata fields a v10 transaction may carry.
///
/// Unknown fields are ignored; a blob that does not parse as this shape
/// leaves every field at its default.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AssetMetadata {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub precision: i32,
    #[serde(default, rename = "assettype")]
    pub asset_type: i32,
}

impl AssetMetadata {
    pub fn from_coin_specific_data(raw: &[u8]) -> Option<Self> {
        serde_json::from_slice(raw).ok()
    }
}
