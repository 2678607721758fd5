//! # Script Construction
//!
//! Raw script assembly for the covenants. All data pushes use the minimal
//! push opcode, so a 32-byte commitment is always `0x20 <hash>`.
//!
//! ## Scripts
//!
//! ```text
//! CTV lock:        <hash32> OP_CHECKTEMPLATEVERIFY
//! P2WSH wrapper:   OP_0 <sha256(redeem_script)>
//! Unvault redeem:  OP_IF
//!                      <block_delay> OP_CHECKSEQUENCEVERIFY OP_DROP
//!                      <hot_hash32> OP_CHECKTEMPLATEVERIFY
//!                  OP_ELSE
//!                      <cold_hash32> OP_CHECKTEMPLATEVERIFY
//!                  OP_ENDIF
//! ```
//!
//! OP_CHECKTEMPLATEVERIFY is `OP_NOP4` (0xb3).

use bitcoin::{
    opcodes::all::*,
    script::{Builder, PushBytesBuf, Script, ScriptBuf},
};

use crate::codec::HashProvider;
use crate::config::template::HASH_LEN;
use crate::error::{CtvError, CtvResult};

/// The CTV opcode byte
pub const OP_CHECKTEMPLATEVERIFY: u8 = 0xb3;

/// Push `data` onto `builder` with the minimal push opcode
pub fn push_data(builder: Builder, data: &[u8]) -> CtvResult<Builder> {
    let bytes = PushBytesBuf::try_from(data.to_vec())
        .map_err(|e| CtvError::parse(format!("Cannot push {} bytes: {}", data.len(), e)))?;
    Ok(builder.push_slice(bytes))
}

/// `<hash32> OP_CHECKTEMPLATEVERIFY`
pub fn ctv_locking_script(hash: &[u8]) -> CtvResult<ScriptBuf> {
    let hash = hash32(hash)?;

    Ok(Builder::new()
        .push_slice(hash)
        .push_opcode(OP_NOP4) // OP_CTV
        .into_script())
}

/// `OP_0 <sha256(redeem_script)>`, a version 0 witness program
pub fn p2wsh_script<H: HashProvider>(hashes: &H, redeem_script: &Script) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_PUSHBYTES_0)
        .push_slice(hashes.sha256(redeem_script.as_bytes()))
        .into_script()
}

/// Branching redeem script of the unvault output.
///
/// A witness selector of `0x01` takes the delayed hot branch, an empty
/// selector takes the immediate cold branch.
pub fn unvault_redeem_script(
    cold_hash: &[u8],
    hot_hash: &[u8],
    block_delay: u32,
) -> CtvResult<ScriptBuf> {
    let cold_hash = hash32(cold_hash)?;
    let hot_hash = hash32(hot_hash)?;

    Ok(Builder::new()
        .push_opcode(OP_IF)
            .push_int(block_delay as i64)
            .push_opcode(OP_CSV)
            .push_opcode(OP_DROP)
            .push_slice(hot_hash)
            .push_opcode(OP_NOP4) // OP_CTV
        .push_opcode(OP_ELSE)
            .push_slice(cold_hash)
            .push_opcode(OP_NOP4) // OP_CTV
        .push_opcode(OP_ENDIF)
        .into_script())
}

/// `OP_RETURN <data>` carrier output script
pub fn op_return_script(data: &[u8]) -> CtvResult<ScriptBuf> {
    Ok(push_data(Builder::new().push_opcode(OP_RETURN), data)?.into_script())
}

fn hash32(bytes: &[u8]) -> CtvResult<[u8; HASH_LEN]> {
    bytes
        .try_into()
        .map_err(|_| CtvError::InvalidHashLength {
            actual: bytes.len(),
        })
}
