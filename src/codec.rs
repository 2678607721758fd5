//! # Byte Codec
//!
//! Canonical little-endian integer encoding, Bitcoin variable-length
//! integers and the hash functions every commitment and address is built on.
//!
//! Integers go through `bitcoin`'s consensus encoders, so the bytes are
//! exactly what the transaction serializer emits.
//!
//! Hashing goes through the [`HashProvider`] trait. Engines take a provider
//! by value at construction and never look one up from global state.

use bitcoin::consensus::encode::{serialize, Encodable, VarInt};
use bitcoin::hashes::{ripemd160, Hash};
use sha2::{Digest, Sha256};

/// Append the consensus encoding of `value`
pub fn write_encodable<T: Encodable + ?Sized>(buf: &mut Vec<u8>, value: &T) {
    buf.extend_from_slice(&serialize(value));
}

/// Append `value` as 4 little-endian bytes
pub fn write_u32_le(buf: &mut Vec<u8>, value: u32) {
    write_encodable(buf, &value);
}

/// Append `value` as 8 little-endian bytes
pub fn write_i64_le(buf: &mut Vec<u8>, value: i64) {
    write_encodable(buf, &value);
}

/// Append `value` as a Bitcoin compact-size integer.
///
/// | range | encoding |
/// |---|---|
/// | `< 0xFD` | 1 byte |
/// | `≤ 0xFFFF` | `0xFD` + 2 bytes LE |
/// | `≤ 0xFFFF_FFFF` | `0xFE` + 4 bytes LE |
/// | otherwise | `0xFF` + 8 bytes LE |
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    write_encodable(buf, &VarInt(value));
}

/// Hash functions used for commitments, witness programs and addresses
pub trait HashProvider {
    fn sha256(&self, data: &[u8]) -> [u8; 32];

    fn ripemd160(&self, data: &[u8]) -> [u8; 20];

    /// `sha256(sha256(data))`
    fn double_sha256(&self, data: &[u8]) -> [u8; 32] {
        self.sha256(&self.sha256(data))
    }

    /// `ripemd160(sha256(data))`
    fn hash160(&self, data: &[u8]) -> [u8; 20] {
        self.ripemd160(&self.sha256(data))
    }
}

/// SHA-256 from `sha2`, RIPEMD-160 from `bitcoin::hashes`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardHashes;

impl HashProvider for StandardHashes {
    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(data));
        out
    }

    fn ripemd160(&self, data: &[u8]) -> [u8; 20] {
        ripemd160::Hash::hash(data).to_byte_array()
    }
}

/// `sha256(sha256(data))` with the standard provider
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    StandardHashes.double_sha256(data)
}
