//! # CTV Vault
//!
//! A two-stage covenant vault. Every artifact is a pure function of the
//! [`VaultSpec`] and is recomputed on each call.
//!
//! ## Vault Flow
//!
//! ```text
//! ┌──────────┐  unvault tx   ┌────────────┐  cold spend (immediate)  ┌───────────┐
//! │  Vault   │ ────────────> │  Unvault   │ ───────────────────────> │   Cold    │
//! │ (CTV)    │  amount-600   │ (P2WSH IF) │  amount-1200             └───────────┘
//! └──────────┘               └────────────┘
//!                                  │        hot spend (after delay)  ┌───────────┐
//!                                  └───────────────────────────────> │    Hot    │
//!                                           amount-1200              └───────────┘
//! ```
//!
//! The vault output commits to the unvault transaction. The unvault output's
//! redeem script commits to both the cold and the hot spend.

use bitcoin::{
    absolute::LockTime, transaction::Version, Address, Amount, Network, OutPoint, Script,
    ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{HashProvider, StandardHashes};
use crate::config::{fees, template};
use crate::ctv::{CtvCommitment, CtvEngine, CtvOutput, TxTemplate};
use crate::error::{CtvError, CtvResult};
use crate::script::{p2wsh_script, unvault_redeem_script};
use crate::utils::{
    address::{legacy_program_address, validate_and_parse},
    amount::{after_fee, positive},
};
use crate::verify::TransactionType;

/// Witness selector for the hot (`OP_IF`) branch
pub const HOT_BRANCH_SELECTOR: [u8; 1] = [0x01];

/// Witness selector for the cold (`OP_ELSE`) branch
pub const COLD_BRANCH_SELECTOR: [u8; 0] = [];

/// Sequence of the hot-spend input: `0xFFFFFFFF - block_delay`.
///
/// This is the encoding existing vaults were created with. It does not
/// follow the BIP68 relative-locktime bit layout.
pub fn hot_sequence(block_delay: u32) -> Sequence {
    Sequence(u32::MAX - block_delay)
}

/// Immutable vault configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSpec {
    cold_address: Address,
    hot_address: Address,
    amount: Amount,
    block_delay: u32,
    network: Network,
}

impl VaultSpec {
    /// Validate addresses against `network` and `amount` against the spend fee
    pub fn new(
        cold_address: &str,
        hot_address: &str,
        amount: Amount,
        block_delay: u32,
        network: Network,
    ) -> CtvResult<Self> {
        let cold_address = validate_and_parse(cold_address, network)?;
        let hot_address = validate_and_parse(hot_address, network)?;
        positive(amount.to_sat())?;
        // The largest fee must leave a positive output
        after_fee(amount, fees::SPEND_FEE_SATS)?;

        Ok(Self {
            cold_address,
            hot_address,
            amount,
            block_delay,
            network,
        })
    }

    pub fn cold_address(&self) -> &Address {
        &self.cold_address
    }

    pub fn hot_address(&self) -> &Address {
        &self.hot_address
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn block_delay(&self) -> u32 {
        self.block_delay
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

/// Every derived artifact of a vault, computed in one pass
#[derive(Debug, Clone)]
pub struct VaultArtifacts {
    pub cold_commitment: CtvCommitment,
    pub hot_commitment: CtvCommitment,
    pub redeem_script: ScriptBuf,
    pub unvault_address: Address,
    pub vault_commitment: CtvCommitment,
    pub vault_address: Address,
}

/// Lifecycle of a vault: `Funded → Unvaulting → {ColdSpent | HotSpent}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStage {
    Funded,
    Unvaulting,
    ColdSpent,
    HotSpent,
}

impl VaultStage {
    /// Advance the lifecycle by a confirmed transaction of type `tx`
    pub fn apply(self, tx: TransactionType) -> CtvResult<Self> {
        match (self, tx) {
            (VaultStage::Funded, TransactionType::Unvaulting) => Ok(VaultStage::Unvaulting),
            (VaultStage::Unvaulting, TransactionType::ColdSpend) => Ok(VaultStage::ColdSpent),
            (VaultStage::Unvaulting, TransactionType::HotSpend) => Ok(VaultStage::HotSpent),
            (current, requested) => Err(CtvError::InvalidStateTransition {
                current: current.to_string(),
                requested: requested.to_string(),
            }),
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, VaultStage::ColdSpent | VaultStage::HotSpent)
    }
}

impl fmt::Display for VaultStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultStage::Funded => write!(f, "Funded"),
            VaultStage::Unvaulting => write!(f, "Unvaulting"),
            VaultStage::ColdSpent => write!(f, "ColdSpent"),
            VaultStage::HotSpent => write!(f, "HotSpent"),
        }
    }
}

/// Derives vault commitments, scripts and addresses and builds the vault transactions
#[derive(Debug, Clone, Default)]
pub struct VaultEngine<H: HashProvider = StandardHashes> {
    ctv: CtvEngine<H>,
}

impl VaultEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: HashProvider> VaultEngine<H> {
    pub fn with_hashes(hashes: H) -> Self {
        Self {
            ctv: CtvEngine::with_hashes(hashes),
        }
    }

    pub fn ctv(&self) -> &CtvEngine<H> {
        &self.ctv
    }

    /// Commitment of the vault → unvault transaction
    pub fn vault_commitment(
        &self,
        unvault_address: &Address,
        amount: Amount,
    ) -> CtvResult<CtvCommitment> {
        let output = CtvOutput::to_address(
            unvault_address,
            after_fee(amount, fees::UNVAULT_FEE_SATS)?,
        );
        Ok(self
            .ctv
            .calculate_commitment(&TxTemplate::single_input(vec![output])))
    }

    /// Commitment of the immediate unvault → cold transaction
    pub fn cold_commitment(&self, cold_address: &Address, amount: Amount) -> CtvResult<CtvCommitment> {
        let output = CtvOutput::to_address(cold_address, after_fee(amount, fees::SPEND_FEE_SATS)?);
        Ok(self
            .ctv
            .calculate_commitment(&TxTemplate::single_input(vec![output])))
    }

    /// Commitment of the delayed unvault → hot transaction
    pub fn hot_commitment(
        &self,
        hot_address: &Address,
        amount: Amount,
        block_delay: u32,
    ) -> CtvResult<CtvCommitment> {
        let output = CtvOutput::to_address(hot_address, after_fee(amount, fees::SPEND_FEE_SATS)?);
        let template = TxTemplate::with_sequence(
            template::HOT_VERSION,
            hot_sequence(block_delay).0,
            vec![output],
        );
        Ok(self.ctv.calculate_commitment(&template))
    }

    pub fn unvault_redeem_script(
        &self,
        cold: &CtvCommitment,
        hot: &CtvCommitment,
        block_delay: u32,
    ) -> CtvResult<ScriptBuf> {
        unvault_redeem_script(cold.as_bytes(), hot.as_bytes(), block_delay)
    }

    /// Legacy-style address of the unvault P2WSH program, the RIPEMD-160 of
    /// its 32-byte witness program
    pub fn unvault_address(
        &self,
        cold: &CtvCommitment,
        hot: &CtvCommitment,
        block_delay: u32,
        network: Network,
    ) -> CtvResult<Address> {
        let redeem_script = self.unvault_redeem_script(cold, hot, block_delay)?;
        let witness_program = p2wsh_script(self.ctv.hashes(), &redeem_script);
        Ok(legacy_program_address(
            self.ctv.hashes(),
            &witness_program,
            network,
        ))
    }

    /// Address the vault is funded at
    pub fn vault_address(&self, spec: &VaultSpec) -> CtvResult<Address> {
        Ok(self.artifacts(spec)?.vault_address)
    }

    /// Recompute every derived artifact of `spec`
    pub fn artifacts(&self, spec: &VaultSpec) -> CtvResult<VaultArtifacts> {
        let cold_commitment = self.cold_commitment(spec.cold_address(), spec.amount())?;
        let hot_commitment =
            self.hot_commitment(spec.hot_address(), spec.amount(), spec.block_delay())?;

        let redeem_script =
            self.unvault_redeem_script(&cold_commitment, &hot_commitment, spec.block_delay())?;
        let unvault_address = self.unvault_address(
            &cold_commitment,
            &hot_commitment,
            spec.block_delay(),
            spec.network(),
        )?;

        let vault_commitment = self.vault_commitment(&unvault_address, spec.amount())?;
        let (_, vault_address) = self
            .ctv
            .locking_script_and_address(&vault_commitment, spec.network())?;

        log::debug!(
            "vault artifacts: cold={} hot={} vault={} unvault_address={} vault_address={}",
            cold_commitment,
            hot_commitment,
            vault_commitment,
            unvault_address,
            vault_address
        );

        Ok(VaultArtifacts {
            cold_commitment,
            hot_commitment,
            redeem_script,
            unvault_address,
            vault_commitment,
            vault_address,
        })
    }

    /// Vault → unvault transaction paying `amount - 600` to the unvault address
    pub fn build_unvault_tx(
        &self,
        vault_commitment: &CtvCommitment,
        prevout: OutPoint,
        unvault_address: &Address,
        amount: Amount,
    ) -> CtvResult<Transaction> {
        let output = CtvOutput::to_address(
            unvault_address,
            after_fee(amount, fees::UNVAULT_FEE_SATS)?,
        );
        self.ctv
            .build_spending_tx(vault_commitment, prevout, &[output])
    }

    /// Unvault → cold transaction through the `OP_ELSE` branch
    pub fn build_cold_spend_tx(
        &self,
        redeem_script: &Script,
        prevout: OutPoint,
        cold_address: &Address,
        amount: Amount,
    ) -> CtvResult<Transaction> {
        let value = after_fee(amount, fees::SPEND_FEE_SATS)?;
        Ok(spend_unvault(
            redeem_script,
            prevout,
            &COLD_BRANCH_SELECTOR,
            Sequence(template::SEQUENCE),
            TxOut {
                value,
                script_pubkey: cold_address.script_pubkey(),
            },
        ))
    }

    /// Unvault → hot transaction through the delayed `OP_IF` branch
    pub fn build_hot_spend_tx(
        &self,
        redeem_script: &Script,
        prevout: OutPoint,
        hot_address: &Address,
        amount: Amount,
        block_delay: u32,
    ) -> CtvResult<Transaction> {
        let value = after_fee(amount, fees::SPEND_FEE_SATS)?;
        Ok(spend_unvault(
            redeem_script,
            prevout,
            &HOT_BRANCH_SELECTOR,
            hot_sequence(block_delay),
            TxOut {
                value,
                script_pubkey: hot_address.script_pubkey(),
            },
        ))
    }
}

fn spend_unvault(
    redeem_script: &Script,
    prevout: OutPoint,
    selector: &[u8],
    sequence: Sequence,
    output: TxOut,
) -> Transaction {
    Transaction {
        version: Version(template::VERSION),
        lock_time: LockTime::from_consensus(template::LOCKTIME),
        input: vec![TxIn {
            previous_output: prevout,
            script_sig: ScriptBuf::new(),
            sequence,
            witness: Witness::from_slice(&[selector, redeem_script.as_bytes()]),
        }],
        output: vec![output],
    }
}
