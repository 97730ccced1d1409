//! Per-address per-asset balances.

use primitive_types::U256;

use coordd_primitives::encoding::{DecodeError, Decoder, Encoder};
use coordd_storage::{Column, KeyValueStore, StoreError, WriteBatch};

const ADDR_ASSET_PREFIX: &[u8] = b"aa:";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddrAssetBalance {
    pub txs: u32,
    pub balance_sat: U256,
    pub sent_sat: U256,
}

impl AddrAssetBalance {
    pub fn encode(&self) -> Vec<u8> {
        let mut encoder = Encoder::with_capacity(32);
        encoder.write_varuint(u64::from(self.txs));
        encoder.write_bigint(&self.balance_sat);
        encoder.write_bigint(&self.sent_sat);
        encoder.into_inner()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(bytes);
        let txs = decoder.read_varuint()?;
        let balance_sat = decoder.read_bigint()?;
        let sent_sat = decoder.read_bigint()?;
        if !decoder.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(Self {
            txs: u32::try_from(txs).map_err(|_| DecodeError::InvalidData("tx count out of range"))?,
            balance_sat,
            sent_sat,
        })
    }
}

/// A packed controller paired with the balance one address holds in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddrAssetInfo {
    pub controller: Vec<u8>,
    pub balance: AddrAssetBalance,
}

pub fn addr_asset_key(addr_desc: &[u8], controller: &[u8]) -> Vec<u8> {
    let mut key =
        Vec::with_capacity(ADDR_ASSET_PREFIX.len() + addr_desc.len() + controller.len());
    key.extend_from_slice(ADDR_ASSET_PREFIX);
    key.extend_from_slice(addr_desc);
    key.extend_from_slice(controller);
    key
}

pub struct AssetBalanceIndex<S> {
    store: S,
}

impl<S> AssetBalanceIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> AssetBalanceIndex<S> {
    pub fn get(
        &self,
        addr_desc: &[u8],
        controller: &[u8],
    ) -> Result<Option<AddrAssetBalance>, StoreError> {
        let key = addr_asset_key(addr_desc, controller);
        let Some(bytes) = self.store.get(Column::AssetIndex, &key)? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        AddrAssetBalance::decode(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Backend(err.to_string()))
    }

    pub fn put(
        &self,
        batch: &mut WriteBatch,
        addr_desc: &[u8],
        controller: &[u8],
        balance: &AddrAssetBalance,
    ) {
        batch.put(
            Column::AssetIndex,
            addr_asset_key(addr_desc, controller),
            balance.encode(),
        );
    }

    /// Every asset the address holds, with its balance. The controller is
    /// the key suffix after the address prefix; the descriptor length comes
    /// from the caller, not the key.
    pub fn assets(&self, addr_desc: &[u8]) -> Result<Vec<AddrAssetInfo>, StoreError> {
        let mut prefix = Vec::with_capacity(ADDR_ASSET_PREFIX.len() + addr_desc.len());
        prefix.extend_from_slice(ADDR_ASSET_PREFIX);
        prefix.extend_from_slice(addr_desc);

        let mut result = Vec::new();
        for (key, value) in self.store.scan_prefix(Column::AssetIndex, &prefix)? {
            let controller = key[prefix.len()..].to_vec();
            if controller.is_empty() {
                continue;
            }
            let Ok(balance) = AddrAssetBalance::decode(&value) else {
                continue;
            };
            result.push(AddrAssetInfo {
                controller,
                balance,
            });
        }
        Ok(result)
    }
}
