//! Core types, byte codec, and chain parameters for the Coordinate indexer.

pub mod encoding;
pub mod hash;
pub mod params;
pub mod tx;

pub use hash::{pack_txid, unpack_txid, Hash256, PACKED_TXID_LEN};
pub use params::{chain_params, ChainParams, Network};
pub use tx::{AssetMetadata, Block, ScriptPubKey, Tx, Vin, Vout};
