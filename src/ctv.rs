//! # CheckTemplateVerify Engine
//!
//! Computes the 32-byte template commitment, builds the CTV locking script
//! and its address, and constructs transactions that spend a CTV output.
//!
//! ## Template serialization
//!
//! The commitment is `sha256d` over a simplified single-input template:
//!
//! ```text
//! u32le(version)
//! 0x01                      fixed input count
//! 32 × 0x00                 placeholder prevout hash
//! u32le(0)                  placeholder prevout index
//! u32le(sequences[input_index])
//! varint(n_outputs)
//! n × (i64le(amount) ++ varint(len(script)) ++ script)
//! u32le(locktime)
//! ```
//!
//! Outpoints are never committed, so the same template can spend any UTXO
//! locked to the matching script.

use bitcoin::{
    absolute::LockTime, transaction::Version, Address, Amount, Network, OutPoint, ScriptBuf,
    Sequence, Transaction, TxIn, TxOut, Witness,
};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::codec::{write_encodable, write_u32_le, write_varint, HashProvider, StandardHashes};
use crate::config::template;
use crate::error::{CtvError, CtvResult};
use crate::script::ctv_locking_script;
use crate::utils::address::legacy_script_address;

/// A single output committed to by a template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CtvOutput {
    pub script_pubkey: ScriptBuf,
    pub amount: Amount,
}

impl CtvOutput {
    pub fn new(script_pubkey: ScriptBuf, amount: Amount) -> Self {
        Self {
            script_pubkey,
            amount,
        }
    }

    /// Pay `amount` to `address`
    pub fn to_address(address: &Address, amount: Amount) -> Self {
        Self::new(address.script_pubkey(), amount)
    }
}

impl From<&CtvOutput> for TxOut {
    fn from(output: &CtvOutput) -> Self {
        TxOut {
            value: output.amount,
            script_pubkey: output.script_pubkey.clone(),
        }
    }
}

/// Transaction template hashed into a commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxTemplate {
    pub version: i32,
    pub locktime: u32,
    /// Only the entry at `input_index` is committed
    pub sequences: Vec<u32>,
    pub outputs: Vec<CtvOutput>,
    pub input_index: usize,
}

impl TxTemplate {
    /// Single-input template with the default version, locktime and sequence
    pub fn single_input(outputs: Vec<CtvOutput>) -> Self {
        Self::with_sequence(template::VERSION, template::SEQUENCE, outputs)
    }

    pub fn with_sequence(version: i32, sequence: u32, outputs: Vec<CtvOutput>) -> Self {
        Self {
            version,
            locktime: template::LOCKTIME,
            sequences: vec![sequence],
            outputs,
            input_index: template::INPUT_INDEX,
        }
    }

    /// Sequence of the committed input, 0 when absent
    pub fn committed_sequence(&self) -> u32 {
        self.sequences.get(self.input_index).copied().unwrap_or(0)
    }

    /// Canonical byte serialization hashed by [`CtvEngine::calculate_commitment`]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            4 + 1 + 32 + 4 + 4 + 9 + self.outputs.len() * 43 + 4,
        );

        write_u32_le(&mut buf, self.version as u32);
        buf.push(0x01);
        buf.extend_from_slice(&[0u8; 32]);
        write_u32_le(&mut buf, 0);
        write_u32_le(&mut buf, self.committed_sequence());

        // i64le(amount) ++ varint(len(script)) ++ script per output
        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            write_encodable(&mut buf, &TxOut::from(output));
        }

        write_u32_le(&mut buf, self.locktime);
        buf
    }
}

/// A 32-byte CTV commitment hash
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CtvCommitment([u8; 32]);

impl CtvCommitment {
    pub fn from_byte_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fails with [`CtvError::InvalidHashLength`] unless `bytes` is 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> CtvResult<Self> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| CtvError::InvalidHashLength {
                actual: bytes.len(),
            })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_byte_array(self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for CtvCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for CtvCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CtvCommitment({})", self)
    }
}

impl FromStr for CtvCommitment {
    type Err = CtvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&hex::decode(s.trim())?)
    }
}

impl Serialize for CtvCommitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CtvCommitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Commitment, locking script and address engine
#[derive(Debug, Clone, Default)]
pub struct CtvEngine<H: HashProvider = StandardHashes> {
    hashes: H,
}

impl CtvEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: HashProvider> CtvEngine<H> {
    pub fn with_hashes(hashes: H) -> Self {
        Self { hashes }
    }

    pub fn hashes(&self) -> &H {
        &self.hashes
    }

    /// `sha256d(template.serialize())`
    pub fn calculate_commitment(&self, template: &TxTemplate) -> CtvCommitment {
        CtvCommitment(self.hashes.double_sha256(&template.serialize()))
    }

    /// The CTV locking script for `commitment` and its legacy-style address
    pub fn locking_script_and_address(
        &self,
        commitment: &CtvCommitment,
        network: Network,
    ) -> CtvResult<(ScriptBuf, Address)> {
        let script = ctv_locking_script(commitment.as_bytes())?;
        let address = legacy_script_address(&self.hashes, &script, network);
        log::debug!("CTV lock {} -> {}", commitment, address);
        Ok((script, address))
    }

    /// Spend `prevout` (locked to `commitment`) into `outputs`.
    ///
    /// Version 1, locktime 0, a single input with sequence 0 and witness
    /// `[commitment, locking_script]`.
    pub fn build_spending_tx(
        &self,
        commitment: &CtvCommitment,
        prevout: OutPoint,
        outputs: &[CtvOutput],
    ) -> CtvResult<Transaction> {
        let locking_script = ctv_locking_script(commitment.as_bytes())?;
        let witness = Witness::from_slice(&[
            commitment.as_bytes().to_vec(),
            locking_script.into_bytes(),
        ]);

        Ok(Transaction {
            version: Version(template::VERSION),
            lock_time: LockTime::from_consensus(template::LOCKTIME),
            input: vec![TxIn {
                previous_output: prevout,
                script_sig: ScriptBuf::new(),
                sequence: Sequence(template::SEQUENCE),
                witness,
            }],
            output: outputs.iter().map(TxOut::from).collect(),
        })
    }
}
