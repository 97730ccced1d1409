//! Asset transaction history, global per asset and per (address, asset).
//!
//! Keys end in a descending-encoded height so forward iteration is
//! newest-first. Values are concatenated records of
//! `packed_txid || varint(index << 1 | last)*`; the low bit terminates a
//! record, letting several transactions at one height share a key.

use std::collections::BTreeMap;

use coordd_primitives::encoding::{Decoder, Encoder};
use coordd_primitives::hash::{unpack_txid, Hash256, PACKED_TXID_LEN};
use coordd_storage::{Column, KeyValueStore, Scan, StoreError};

const ADDR_ASSET_TX_PREFIX: &[u8] = b"ax:";
const GLOBAL_ASSET_TX_PREFIX: &[u8] = b"gt:";

const DESC_HEIGHT_LEN: usize = 4;

/// Big-endian complement: lexicographic order of encoded heights is
/// descending in numeric height.
pub fn pack_desc_height(height: u32) -> [u8; 4] {
    (!height).to_be_bytes()
}

pub fn unpack_desc_height(bytes: &[u8; 4]) -> u32 {
    !u32::from_be_bytes(*bytes)
}

pub fn global_history_key(controller: &[u8], height: u32) -> Vec<u8> {
    let mut key =
        Vec::with_capacity(GLOBAL_ASSET_TX_PREFIX.len() + controller.len() + DESC_HEIGHT_LEN);
    key.extend_from_slice(GLOBAL_ASSET_TX_PREFIX);
    key.extend_from_slice(controller);
    key.extend_from_slice(&pack_desc_height(height));
    key
}

pub fn addr_history_key(addr_desc: &[u8], controller: &[u8], height: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(
        ADDR_ASSET_TX_PREFIX.len() + addr_desc.len() + controller.len() + DESC_HEIGHT_LEN,
    );
    key.extend_from_slice(ADDR_ASSET_TX_PREFIX);
    key.extend_from_slice(addr_desc);
    key.extend_from_slice(controller);
    key.extend_from_slice(&pack_desc_height(height));
    key
}

/// One history record: the txid and its tail-marked output indexes.
pub fn pack_history_record(btx_id: &Hash256, indexes: &[i32]) -> Vec<u8> {
    let mut encoder = Encoder::with_capacity(PACKED_TXID_LEN + indexes.len() * 2);
    encoder.write_hash(btx_id);
    for (i, index) in indexes.iter().enumerate() {
        let mut value = index << 1;
        if i == indexes.len() - 1 {
            value |= 1;
        }
        encoder.write_varint32(value);
    }
    encoder.into_inner()
}

/// Absorbs every history append within one block so exactly one put per
/// key reaches the write batch at flush time.
#[derive(Debug, Default)]
pub struct HistoryAppendBuffer {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl HistoryAppendBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: Vec<u8>, record: &[u8]) {
        self.entries.entry(key).or_default().extend_from_slice(record);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.entries.iter()
    }
}

pub type HistoryVisitor<'a> = dyn FnMut(&str, u32, &[i32]) -> Result<Scan, StoreError> + 'a;

pub struct AssetHistory<S> {
    store: S,
}

impl<S> AssetHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> AssetHistory<S> {
    /// Global history for one asset, newest first, heights in
    /// `[lower, higher]`.
    pub fn for_each_asset_tx(
        &self,
        controller: &[u8],
        lower: u32,
        higher: u32,
        visitor: &mut HistoryVisitor<'_>,
    ) -> Result<(), StoreError> {
        let mut prefix =
            Vec::with_capacity(GLOBAL_ASSET_TX_PREFIX.len() + controller.len());
        prefix.extend_from_slice(GLOBAL_ASSET_TX_PREFIX);
        prefix.extend_from_slice(controller);
        self.for_each(prefix, lower, higher, visitor)
    }

    /// Per-address history for one asset, newest first.
    pub fn for_each_addr_asset_tx(
        &self,
        addr_desc: &[u8],
        controller: &[u8],
        lower: u32,
        higher: u32,
        visitor: &mut HistoryVisitor<'_>,
    ) -> Result<(), StoreError> {
        let mut prefix = Vec::with_capacity(
            ADDR_ASSET_TX_PREFIX.len() + addr_desc.len() + controller.len(),
        );
        prefix.extend_from_slice(ADDR_ASSET_TX_PREFIX);
        prefix.extend_from_slice(addr_desc);
        prefix.extend_from_slice(controller);
        self.for_each(prefix, lower, higher, visitor)
    }

    fn for_each(
        &self,
        prefix: Vec<u8>,
        lower: u32,
        higher: u32,
        visitor: &mut HistoryVisitor<'_>,
    ) -> Result<(), StoreError> {
        let mut start = prefix.clone();
        start.extend_from_slice(&pack_desc_height(higher));
        let mut end = prefix.clone();
        end.extend_from_slice(&pack_desc_height(lower));

        let mut adapter = |key: &[u8], value: &[u8]| -> Result<Scan, StoreError> {
            if key.len() != prefix.len() + DESC_HEIGHT_LEN || !key.starts_with(&prefix) {
                return Ok(Scan::Continue);
            }
            let mut height_bytes = [0u8; DESC_HEIGHT_LEN];
            height_bytes.copy_from_slice(&key[key.len() - DESC_HEIGHT_LEN..]);
            let height = unpack_desc_height(&height_bytes);
            visit_records(value, height, visitor)
        };
        self.store
            .for_each_range(Column::AssetIndex, &start, &end, &mut adapter)
    }
}

/// Splits a concatenated history value into `(txid, indexes)` records and
/// feeds them to the visitor.
fn visit_records(
    value: &[u8],
    height: u32,
    visitor: &mut HistoryVisitor<'_>,
) -> Result<Scan, StoreError> {
    let mut decoder = Decoder::new(value);
    let mut indexes: Vec<i32> = Vec::with_capacity(16);
    while decoder.remaining() > PACKED_TXID_LEN {
        let btx_id = decoder
            .read_hash()
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let txid = unpack_txid(&btx_id);
        indexes.clear();
        while !decoder.is_empty() {
            let index = decoder
                .read_varint32()
                .map_err(|err| StoreError::Backend(err.to_string()))?;
            indexes.push(index >> 1);
            if index & 1 == 1 {
                break;
            }
        }
        if visitor(&txid, height, &indexes)? == Scan::Stop {
            return Ok(Scan::Stop);
        }
    }
    Ok(Scan::Continue)
}
