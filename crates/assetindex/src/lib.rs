//! Asset indexing for the Coordinate chain.
//!
//! Sits on top of the base address/UTXO indexer: recognises the asset
//! transaction versions, propagates controller identities through the live
//! UTXO set, and maintains the asset registry, per-address balances, and
//! newest-first transaction history.

pub mod balance;
pub mod connect;
pub mod controller;
pub mod history;
pub mod registry;
pub mod router;
pub mod types;
pub mod undo;

pub use balance::{AddrAssetBalance, AddrAssetInfo, AssetBalanceIndex};
pub use connect::{AssetIndex, ControllerInfo};
pub use controller::{
    controller_from_parts, format_controller_outpoint, pack_controller_outpoint,
    parse_controller_string, unpack_controller_outpoint,
};
pub use history::{AssetHistory, HistoryAppendBuffer};
pub use registry::{AssetRegistry, AssetRegistryEntry, MAX_REDIRECT_HOPS};
pub use router::{
    block_passes, classify, AssetPasses, AssetTxClass, TX_VERSION_ASSET_CREATE,
    TX_VERSION_ASSET_XFER, TX_VERSION_PEGIN, TX_VERSION_PRECONF,
};
pub use types::{AddrBalance, AddrDesc, BaseIndex, TxAddressIo, TxAddresses, Utxo};
pub use undo::AssetBlockUndo;
