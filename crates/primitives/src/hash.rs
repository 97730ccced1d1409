//! Packed txid handling.
//!
//! Txids travel as display-order hex strings in RPC payloads and as 32-byte
//! packed hashes everywhere else. Packed order is the reverse of display
//! order, so the hex conversions below flip the bytes.

use crate::encoding::DecodeError;

pub type Hash256 = [u8; 32];

/// Width of a packed txid inside controller outpoints and history values.
pub const PACKED_TXID_LEN: usize = 32;

pub fn pack_txid(txid: &str) -> Result<Hash256, DecodeError> {
    if txid.len() != 64 {
        return Err(DecodeError::InvalidData("invalid txid length"));
    }
    let bytes = txid.as_bytes();
    let mut out = [0u8; 32];
    for i in 0..32 {
        let high = hex_nibble(bytes[2 * i])?;
        let low = hex_nibble(bytes[2 * i + 1])?;
        out[31 - i] = high << 4 | low;
    }
    Ok(out)
}

pub fn unpack_txid(hash: &Hash256) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(64);
    for byte in hash.iter().rev() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn hex_nibble(c: u8) -> Result<u8, DecodeError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(DecodeError::InvalidData("invalid hex digit")),
    }
}
