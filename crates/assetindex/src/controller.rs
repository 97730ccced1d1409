//! Controller outpoint codec.
//!
//! A controller outpoint names an asset: the packed txid of the creating
//! transaction followed by a varuint vout. The encoded bytes are an
//! identity, never a sort key.

use coordd_primitives::encoding::{DecodeError, Decoder, Encoder};
use coordd_primitives::hash::{bytes_to_hex, pack_txid, unpack_txid, Hash256, PACKED_TXID_LEN};

pub fn pack_controller_outpoint(txid: &str, vout: u32) -> Result<Vec<u8>, DecodeError> {
    Ok(controller_from_parts(&pack_txid(txid)?, vout))
}

pub fn controller_from_parts(btx_id: &Hash256, vout: u32) -> Vec<u8> {
    let mut encoder = Encoder::with_capacity(PACKED_TXID_LEN + 5);
    encoder.write_hash(btx_id);
    encoder.write_varuint(u64::from(vout));
    encoder.into_inner()
}

pub fn unpack_controller_outpoint(controller: &[u8]) -> Option<(String, u32)> {
    if controller.len() < PACKED_TXID_LEN + 1 {
        return None;
    }
    let mut decoder = Decoder::new(controller);
    let btx_id = decoder.read_hash().ok()?;
    let vout = decoder.read_varuint().ok()?;
    let vout = u32::try_from(vout).ok()?;
    Some((unpack_txid(&btx_id), vout))
}

/// Packed controller to a `"txid:vout"` display string. Empty input stays
/// empty; bytes that do not parse fall back to plain hex.
pub fn format_controller_outpoint(controller: &[u8]) -> String {
    if controller.is_empty() {
        return String::new();
    }
    match unpack_controller_outpoint(controller) {
        Some((txid, vout)) => format!("{txid}:{vout}"),
        None => bytes_to_hex(controller),
    }
}

/// `"txid:vout"` display string back to packed bytes. Strings without a
/// colon (or with nothing before it) yield `None`.
pub fn parse_controller_string(s: &str) -> Result<Option<Vec<u8>>, DecodeError> {
    let Some(idx) = s.rfind(':') else {
        return Ok(None);
    };
    if idx == 0 {
        return Ok(None);
    }
    let txid = &s[..idx];
    let mut vout: u32 = 0;
    for c in s[idx + 1..].bytes() {
        if c.is_ascii_digit() {
            vout = vout.wrapping_mul(10).wrapping_add(u32::from(c - b'0'));
        }
    }
    pack_controller_outpoint(txid, vout).map(Some)
}
