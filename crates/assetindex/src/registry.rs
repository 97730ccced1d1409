//! Asset registry: metadata records keyed by packed controller, with
//! redirect tombstones left behind by re-issuance.

use primitive_types::U256;

use coordd_primitives::encoding::{DecodeError, Decoder, Encoder};
use coordd_storage::{Column, KeyValueStore, StoreError, WriteBatch};

const ASSET_REGISTRY_PREFIX: &[u8] = b"ac:";

/// Redirect chains longer than this resolve to the last visited identity.
pub const MAX_REDIRECT_HOPS: usize = 100;

const TAG_NORMAL: u8 = 0;
const TAG_REDIRECT: u8 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetRegistryEntry {
    pub ticker: String,
    pub headline: String,
    pub precision: i32,
    pub asset_type: i32,
    pub total_supply: U256,
    pub current_controller: Vec<u8>,
    pub is_redirect: bool,
}

impl AssetRegistryEntry {
    pub fn redirect_to(current_controller: Vec<u8>) -> Self {
        Self {
            is_redirect: true,
            current_controller,
            ..Default::default()
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        if self.is_redirect {
            let mut buf = Vec::with_capacity(1 + self.current_controller.len());
            buf.push(TAG_REDIRECT);
            buf.extend_from_slice(&self.current_controller);
            return buf;
        }
        let mut encoder = Encoder::new();
        encoder.write_u8(TAG_NORMAL);
        encoder.write_var_str(&self.ticker);
        encoder.write_var_str(&self.headline);
        encoder.write_varuint(self.precision.max(0) as u64);
        encoder.write_varuint(self.asset_type.max(0) as u64);
        encoder.write_bigint(&self.total_supply);
        encoder.write_var_bytes(&self.current_controller);
        encoder.into_inner()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(bytes);
        let tag = decoder.read_u8()?;
        if tag == TAG_REDIRECT {
            // Redirect payload is the rest of the value.
            return Ok(Self::redirect_to(decoder.read_remaining()));
        }
        if tag != TAG_NORMAL {
            return Err(DecodeError::InvalidData("unknown registry entry tag"));
        }
        let ticker = decoder.read_var_str()?;
        let headline = decoder.read_var_str()?;
        let precision = decoder.read_varuint()?;
        let asset_type = decoder.read_varuint()?;
        let total_supply = decoder.read_bigint()?;
        let current_controller = decoder.read_var_bytes()?;
        if !decoder.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(Self {
            ticker,
            headline,
            precision: i32::try_from(precision)
                .map_err(|_| DecodeError::InvalidData("precision out of range"))?,
            asset_type: i32::try_from(asset_type)
                .map_err(|_| DecodeError::InvalidData("asset type out of range"))?,
            total_supply,
            current_controller,
            is_redirect: false,
        })
    }
}

pub fn registry_key(controller: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(ASSET_REGISTRY_PREFIX.len() + controller.len());
    key.extend_from_slice(ASSET_REGISTRY_PREFIX);
    key.extend_from_slice(controller);
    key
}

pub struct AssetRegistry<S> {
    store: S,
}

impl<S> AssetRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> AssetRegistry<S> {
    pub fn get(&self, controller: &[u8]) -> Result<Option<AssetRegistryEntry>, StoreError> {
        let key = registry_key(controller);
        let Some(bytes) = self.store.get(Column::AssetIndex, &key)? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        AssetRegistryEntry::decode(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Backend(err.to_string()))
    }

    pub fn put(&self, batch: &mut WriteBatch, controller: &[u8], entry: &AssetRegistryEntry) {
        batch.put(Column::AssetIndex, registry_key(controller), entry.encode());
    }

    /// Follows the redirect chain to the current controller identity.
    /// Unregistered identities resolve to themselves; self-redirects and
    /// chains longer than [`MAX_REDIRECT_HOPS`] terminate at the last
    /// visited identity.
    pub fn resolve_current(&self, controller: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.resolve_current_with_overlay(controller, |_| None)
    }

    /// As [`Self::resolve_current`], consulting `staged` before the store
    /// so entries written earlier in the same block are visible.
    pub fn resolve_current_with_overlay<F>(
        &self,
        controller: &[u8],
        mut staged: F,
    ) -> Result<Vec<u8>, StoreError>
    where
        F: FnMut(&[u8]) -> Option<AssetRegistryEntry>,
    {
        let mut current = controller.to_vec();
        for _ in 0..MAX_REDIRECT_HOPS {
            let entry = match staged(&current) {
                Some(entry) => Some(entry),
                None => self.get(&current)?,
            };
            let Some(entry) = entry else {
                return Ok(current);
            };
            if !entry.is_redirect {
                return Ok(entry.current_controller);
            }
            if entry.current_controller == current {
                return Ok(current);
            }
            current = entry.current_controller;
        }
        Ok(current)
    }
}
