//! Interfaces to the base address/UTXO indexer.
//!
//! The base indexer resolves input/output addresses and values per
//! transaction and maintains the live UTXO list per address; this
//! subsystem only attaches controller tags to those UTXOs. `BaseIndex`
//! is the seam through which the spent-controller lookup reads the
//! base indexer's committed state.

use primitive_types::U256;

use coordd_primitives::encoding::{DecodeError, Decoder, Encoder};
use coordd_primitives::hash::Hash256;
use coordd_storage::StoreError;

/// Opaque address descriptor; never interpreted here.
pub type AddrDesc = Vec<u8>;

#[derive(Clone, Debug, Default)]
pub struct TxAddressIo {
    /// May be empty when the script is unparseable or has no address.
    pub addr_desc: AddrDesc,
    pub value_sat: U256,
}

#[derive(Clone, Debug, Default)]
pub struct TxAddresses {
    pub inputs: Vec<TxAddressIo>,
    pub outputs: Vec<TxAddressIo>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Utxo {
    pub btx_id: Hash256,
    /// Negative marks an output already spent within the block being built.
    pub vout: i32,
    pub height: u32,
    pub value_sat: U256,
    /// Empty for native-only outputs.
    pub controller: Vec<u8>,
    pub is_controller: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddrBalance {
    pub txs: u32,
    pub sent_sat: U256,
    pub balance_sat: U256,
    pub utxos: Vec<Utxo>,
}

/// Read access to the base indexer's committed per-tx addresses and
/// per-address balances. Both are point lookups against the store the
/// base indexer writes to; within a block the in-memory maps are
/// consulted first and this trait only covers what is already on disk.
pub trait BaseIndex {
    fn tx_addresses(&self, btx_id: &Hash256) -> Result<Option<TxAddresses>, StoreError>;
    fn addr_balance(&self, addr_desc: &[u8]) -> Result<Option<AddrBalance>, StoreError>;
}

/// Packs an address balance with its UTXO list. `asset_aware` gates
/// whether controller tags are serialized; one store must use a single
/// setting for every balance it holds.
pub fn pack_addr_balance(balance: &AddrBalance, asset_aware: bool) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.write_varuint(u64::from(balance.txs));
    encoder.write_bigint(&balance.sent_sat);
    encoder.write_bigint(&balance.balance_sat);
    for utxo in &balance.utxos {
        if utxo.vout < 0 {
            continue;
        }
        encoder.write_hash(&utxo.btx_id);
        encoder.write_varuint(utxo.vout as u64);
        encoder.write_varuint(u64::from(utxo.height));
        encoder.write_bigint(&utxo.value_sat);
        if asset_aware {
            encoder.write_var_bytes(&utxo.controller);
            encoder.write_u8(u8::from(utxo.is_controller));
        }
    }
    encoder.into_inner()
}

pub fn unpack_addr_balance(bytes: &[u8], asset_aware: bool) -> Result<AddrBalance, DecodeError> {
    let mut decoder = Decoder::new(bytes);
    let txs = decoder.read_varuint()?;
    let sent_sat = decoder.read_bigint()?;
    let balance_sat = decoder.read_bigint()?;
    let mut utxos = Vec::new();
    while !decoder.is_empty() {
        let btx_id = decoder.read_hash()?;
        let vout = decoder.read_varuint()?;
        let vout =
            i32::try_from(vout).map_err(|_| DecodeError::InvalidData("utxo vout out of range"))?;
        let height = decoder.read_varuint()?;
        let height =
            u32::try_from(height).map_err(|_| DecodeError::InvalidData("utxo height out of range"))?;
        let value_sat = decoder.read_bigint()?;
        let (controller, is_controller) = if asset_aware {
            let controller = decoder.read_var_bytes()?;
            let is_controller = decoder.read_u8()? != 0;
            (controller, is_controller)
        } else {
            (Vec::new(), false)
        };
        utxos.push(Utxo {
            btx_id,
            vout,
            height,
            value_sat,
            controller,
            is_controller,
        });
    }
    Ok(AddrBalance {
        txs: u32::try_from(txs).map_err(|_| DecodeError::InvalidData("tx count out of range"))?,
        sent_sat,
        balance_sat,
        utxos,
    })
}
