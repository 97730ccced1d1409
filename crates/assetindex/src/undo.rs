//! Per-block undo records for the asset indexes.
//!
//! Connect snapshots the prior value of every key it stages and the
//! controller tags of every UTXO the block spends; disconnect replays the
//! snapshot and re-tags the UTXOs the base indexer restores.

use coordd_primitives::encoding::{
    decode, encode, Decodable, DecodeError, Decoder, Encodable, Encoder,
};
use coordd_primitives::hash::Hash256;

use crate::types::AddrDesc;

const ASSET_UNDO_VERSION: u8 = 1;

pub fn asset_undo_key(height: u32) -> [u8; 4] {
    height.to_be_bytes()
}

/// Restores one asset-index key: put the prior value back, or delete the
/// key if it did not exist before the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyUndo {
    pub key: Vec<u8>,
    pub prior: Option<Vec<u8>>,
}

/// The controller tag a spent UTXO carried before the block consumed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UtxoTagUndo {
    pub addr_desc: AddrDesc,
    pub btx_id: Hash256,
    pub vout: u32,
    pub controller: Vec<u8>,
    pub is_controller: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetBlockUndo {
    pub keys: Vec<KeyUndo>,
    pub tags: Vec<UtxoTagUndo>,
}

impl AssetBlockUndo {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.tags.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode(bytes)
    }
}

impl Encodable for AssetBlockUndo {
    fn index_encode(&self, encoder: &mut Encoder) {
        encoder.write_u8(ASSET_UNDO_VERSION);
        encoder.write_u32_le(self.keys.len() as u32);
        for entry in &self.keys {
            encoder.write_var_bytes(&entry.key);
            match &entry.prior {
                Some(value) => {
                    encoder.write_u8(1);
                    encoder.write_var_bytes(value);
                }
                None => encoder.write_u8(0),
            }
        }
        encoder.write_u32_le(self.tags.len() as u32);
        for tag in &self.tags {
            encoder.write_var_bytes(&tag.addr_desc);
            encoder.write_hash(&tag.btx_id);
            encoder.write_varuint(u64::from(tag.vout));
            encoder.write_var_bytes(&tag.controller);
            encoder.write_u8(u8::from(tag.is_controller));
        }
    }
}

impl Decodable for AssetBlockUndo {
    fn index_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let version = decoder.read_u8()?;
        if version != ASSET_UNDO_VERSION {
            return Err(DecodeError::InvalidData("unsupported asset undo version"));
        }
        let key_len = decoder.read_u32_le()? as usize;
        let mut keys = Vec::with_capacity(key_len);
        for _ in 0..key_len {
            let key = decoder.read_var_bytes()?;
            let prior = if decoder.read_u8()? != 0 {
                Some(decoder.read_var_bytes()?)
            } else {
                None
            };
            keys.push(KeyUndo { key, prior });
        }
        let tag_len = decoder.read_u32_le()? as usize;
        let mut tags = Vec::with_capacity(tag_len);
        for _ in 0..tag_len {
            let addr_desc = decoder.read_var_bytes()?;
            let btx_id = decoder.read_hash()?;
            let vout = decoder.read_varuint()?;
            let vout = u32::try_from(vout)
                .map_err(|_| DecodeError::InvalidData("undo vout out of range"))?;
            let controller = decoder.read_var_bytes()?;
            let is_controller = decoder.read_u8()? != 0;
            tags.push(UtxoTagUndo {
                addr_desc,
                btx_id,
                vout,
                controller,
                is_controller,
            });
        }
        Ok(Self { keys, tags })
    }
}
