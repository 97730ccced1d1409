//! Transaction version routing.
//!
//! Coordinate reserves a band of transaction versions for special
//! semantics; only asset creation and transfer concern this subsystem.

use coordd_primitives::tx::Block;

pub const TX_VERSION_PRECONF: i32 = 9;
pub const TX_VERSION_ASSET_CREATE: i32 = 10;
pub const TX_VERSION_ASSET_XFER: i32 = 11;
pub const TX_VERSION_PEGIN: i32 = 12;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssetTxClass {
    Create,
    Transfer,
    /// Everything else, including preconf and pegin.
    Ordinary,
}

pub fn classify(version: i32) -> AssetTxClass {
    match version {
        TX_VERSION_ASSET_CREATE => AssetTxClass::Create,
        TX_VERSION_ASSET_XFER => AssetTxClass::Transfer,
        _ => AssetTxClass::Ordinary,
    }
}

/// Block positions of the asset transactions, per pass. Creates run before
/// transfers so a v11 can spend a v10 from the same block; each pass keeps
/// block order.
#[derive(Clone, Debug, Default)]
pub struct AssetPasses {
    pub creates: Vec<usize>,
    pub transfers: Vec<usize>,
}

pub fn block_passes(block: &Block) -> AssetPasses {
    let mut passes = AssetPasses::default();
    for (position, tx) in block.txs.iter().enumerate() {
        match classify(tx.version) {
            AssetTxClass::Create => passes.creates.push(position),
            AssetTxClass::Transfer => passes.transfers.push(position),
            AssetTxClass::Ordinary => {}
        }
    }
    passes
}
