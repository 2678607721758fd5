//! # Vault Transaction Verification
//!
//! Classifies a serialized transaction by the witness shape of its inputs,
//! rebuilds the transaction the vault engine would emit for that role and
//! compares the two structurally. No script is executed and no signature is
//! checked.
//!
//! | witness | role |
//! |---|---|
//! | `[vault_ctv, …]` | Unvaulting |
//! | `[0x01…, redeem_script]` | HotSpend |
//! | `[other, redeem_script]` | ColdSpend |

use bitcoin::{consensus, Transaction, TxIn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{HashProvider, StandardHashes};
use crate::error::{CtvError, CtvResult};
use crate::vault::{VaultArtifacts, VaultEngine, VaultSpec};

/// Role of a transaction in the vault lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Unvaulting,
    ColdSpend,
    HotSpend,
    Unknown,
}

impl TransactionType {
    fn describe(self) -> &'static str {
        match self {
            TransactionType::Unvaulting => "unvaulting",
            TransactionType::ColdSpend => "cold spend",
            TransactionType::HotSpend => "hot spend",
            TransactionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Unvaulting => write!(f, "Unvaulting"),
            TransactionType::ColdSpend => write!(f, "ColdSpend"),
            TransactionType::HotSpend => write!(f, "HotSpend"),
            TransactionType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One structural difference between the candidate and the expected transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "camelCase")]
pub enum Mismatch {
    Version { expected: i32, actual: i32 },
    Locktime { expected: u32, actual: u32 },
    InputCount { expected: usize, actual: usize },
    OutputCount { expected: usize, actual: usize },
    Sequence { expected: u32, actual: u32 },
    OutputValue { expected: u64, actual: u64 },
    OutputScript,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Version { expected, actual } => {
                write!(f, "Version mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::Locktime { expected, actual } => {
                write!(f, "Locktime mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::InputCount { expected, actual } => {
                write!(f, "Input count mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::OutputCount { expected, actual } => {
                write!(f, "Output count mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::Sequence { expected, actual } => {
                write!(f, "Sequence mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::OutputValue { expected, actual } => {
                write!(f, "Output value mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::OutputScript => write!(f, "Output script mismatch"),
        }
    }
}

/// Outcome of verifying one transaction against a [`VaultSpec`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub transaction_type: TransactionType,
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
}

impl VerificationReport {
    fn unknown(message: impl Into<String>) -> Self {
        let report = Self {
            transaction_type: TransactionType::Unknown,
            valid: false,
            message: message.into(),
            mismatches: Vec::new(),
        };
        log::warn!("{}", report.message);
        report
    }

    /// `Unknown` report for bytes that do not decode to a transaction
    pub fn parse_failure(error: impl fmt::Display) -> Self {
        Self::unknown(format!("Error verifying transaction: parse error: {}", error))
    }

    fn classified(transaction_type: TransactionType, mismatches: Vec<Mismatch>) -> Self {
        let issues = || {
            mismatches
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let message = match (transaction_type, mismatches.is_empty()) {
            (_, true) => format!(
                "Transaction is a valid {} transaction",
                transaction_type.describe()
            ),
            (TransactionType::Unvaulting, false) => {
                format!("Transaction structure issues: {}", issues())
            }
            (_, false) => format!("Transaction verification failed: {}", issues()),
        };

        if !mismatches.is_empty() {
            log::warn!("{} candidate rejected: {}", transaction_type, issues());
        }

        Self {
            transaction_type,
            valid: mismatches.is_empty(),
            message,
            mismatches,
        }
    }

    /// `Ok(type)` for a valid report, otherwise the matching typed error
    pub fn into_result(self) -> CtvResult<TransactionType> {
        match (self.valid, self.transaction_type) {
            (true, ty) => Ok(ty),
            (false, TransactionType::Unknown) => Err(CtvError::UnknownTransactionType),
            (false, _) => Err(CtvError::StructuralMismatch {
                issues: self.mismatches.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

/// Classifies and structurally checks vault transactions
#[derive(Debug, Clone, Default)]
pub struct VerificationEngine<H: HashProvider = StandardHashes> {
    vault: VaultEngine<H>,
}

impl VerificationEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: HashProvider> VerificationEngine<H> {
    pub fn with_hashes(hashes: H) -> Self {
        Self {
            vault: VaultEngine::with_hashes(hashes),
        }
    }

    /// Verify consensus-serialized `tx_bytes` against `spec`.
    ///
    /// Never fails: unparseable bytes produce an `Unknown` report.
    pub fn verify(&self, tx_bytes: &[u8], spec: &VaultSpec) -> VerificationReport {
        match consensus::deserialize::<Transaction>(tx_bytes) {
            Ok(tx) => self.verify_transaction(&tx, spec),
            Err(e) => VerificationReport::parse_failure(e),
        }
    }

    pub fn verify_transaction(&self, tx: &Transaction, spec: &VaultSpec) -> VerificationReport {
        if tx.input.is_empty() {
            return VerificationReport::unknown("Could not verify transaction: no inputs");
        }

        let artifacts = match self.vault.artifacts(spec) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                return VerificationReport::unknown(format!("Error verifying transaction: {}", e))
            }
        };

        for input in &tx.input {
            let (Some(first), Some(second)) = (input.witness.nth(0), input.witness.nth(1)) else {
                continue;
            };

            if first.len() == 32 && first == artifacts.vault_commitment.as_bytes() {
                return self.check_unvault(tx, input, spec, &artifacts);
            }

            if second == artifacts.redeem_script.as_bytes() {
                let hot = first.first() == Some(&0x01);
                return self.check_spend(tx, input, spec, &artifacts, hot);
            }
        }

        VerificationReport::unknown("Could not determine transaction type")
    }

    fn check_unvault(
        &self,
        tx: &Transaction,
        input: &TxIn,
        spec: &VaultSpec,
        artifacts: &VaultArtifacts,
    ) -> VerificationReport {
        let expected = match self.vault.build_unvault_tx(
            &artifacts.vault_commitment,
            input.previous_output,
            &artifacts.unvault_address,
            spec.amount(),
        ) {
            Ok(tx) => tx,
            Err(e) => {
                return VerificationReport::unknown(format!("Error verifying transaction: {}", e))
            }
        };

        let mut mismatches = Vec::new();
        compare_shape(&expected, tx, &mut mismatches);
        VerificationReport::classified(TransactionType::Unvaulting, mismatches)
    }

    fn check_spend(
        &self,
        tx: &Transaction,
        input: &TxIn,
        spec: &VaultSpec,
        artifacts: &VaultArtifacts,
        hot: bool,
    ) -> VerificationReport {
        let (transaction_type, expected) = if hot {
            (
                TransactionType::HotSpend,
                self.vault.build_hot_spend_tx(
                    &artifacts.redeem_script,
                    input.previous_output,
                    spec.hot_address(),
                    spec.amount(),
                    spec.block_delay(),
                ),
            )
        } else {
            (
                TransactionType::ColdSpend,
                self.vault.build_cold_spend_tx(
                    &artifacts.redeem_script,
                    input.previous_output,
                    spec.cold_address(),
                    spec.amount(),
                ),
            )
        };
        let expected = match expected {
            Ok(tx) => tx,
            Err(e) => {
                return VerificationReport::unknown(format!("Error verifying transaction: {}", e))
            }
        };

        let mut mismatches = Vec::new();
        compare_shape(&expected, tx, &mut mismatches);

        if hot && tx.input.len() == expected.input.len() {
            let (want, got) = (expected.input[0].sequence, input.sequence);
            if want != got {
                mismatches.push(Mismatch::Sequence {
                    expected: want.0,
                    actual: got.0,
                });
            }
        }

        if let (Some(want), Some(got)) = (expected.output.first(), tx.output.first()) {
            if tx.output.len() == expected.output.len() {
                if want.value != got.value {
                    mismatches.push(Mismatch::OutputValue {
                        expected: want.value.to_sat(),
                        actual: got.value.to_sat(),
                    });
                }
                if want.script_pubkey != got.script_pubkey {
                    mismatches.push(Mismatch::OutputScript);
                }
            }
        }

        VerificationReport::classified(transaction_type, mismatches)
    }
}

/// Version, locktime and input/output counts
fn compare_shape(expected: &Transaction, actual: &Transaction, mismatches: &mut Vec<Mismatch>) {
    if expected.version != actual.version {
        mismatches.push(Mismatch::Version {
            expected: expected.version.0,
            actual: actual.version.0,
        });
    }
    if expected.lock_time != actual.lock_time {
        mismatches.push(Mismatch::Locktime {
            expected: expected.lock_time.to_consensus_u32(),
            actual: actual.lock_time.to_consensus_u32(),
        });
    }
    if expected.input.len() != actual.input.len() {
        mismatches.push(Mismatch::InputCount {
            expected: expected.input.len(),
            actual: actual.input.len(),
        });
    }
    if expected.output.len() != actual.output.len() {
        mismatches.push(Mismatch::OutputCount {
            expected: expected.output.len(),
            actual: actual.output.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use bitcoin::{
        absolute::LockTime, hashes::Hash, transaction::Version, Address, Amount, Network,
        OutPoint, PubkeyHash, ScriptBuf, Sequence, TxOut, Txid, Witness,
    };

    const ADDR: &str = "mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef";

    fn other_address() -> String {
        Address::p2pkh(PubkeyHash::from_byte_array([7u8; 20]), Network::Testnet).to_string()
    }

    fn spec_with_delay(block_delay: u32) -> VaultSpec {
        VaultSpec::new(
            ADDR,
            &other_address(),
            Amount::from_sat(1_000_000),
            block_delay,
            Network::Testnet,
        )
        .unwrap()
    }

    fn spec() -> VaultSpec {
        spec_with_delay(144)
    }

    fn prevout() -> OutPoint {
        OutPoint::new(Txid::all_zeros(), 0)
    }

    fn unvault_tx(spec: &VaultSpec) -> Transaction {
        let engine = VaultEngine::new();
        let artifacts = engine.artifacts(spec).unwrap();
        engine
            .build_unvault_tx(
                &artifacts.vault_commitment,
                prevout(),
                &artifacts.unvault_address,
                spec.amount(),
            )
            .unwrap()
    }

    fn spend_txs(spec: &VaultSpec) -> (Transaction, Transaction) {
        let engine = VaultEngine::new();
        let artifacts = engine.artifacts(spec).unwrap();
        let cold = engine
            .build_cold_spend_tx(&artifacts.redeem_script, prevout(), spec.cold_address(), spec.amount())
            .unwrap();
        let hot = engine
            .build_hot_spend_tx(
                &artifacts.redeem_script,
                prevout(),
                spec.hot_address(),
                spec.amount(),
                spec.block_delay(),
            )
            .unwrap();
        (cold, hot)
    }

    #[test]
    fn test_valid_unvault() {
        let spec = spec();
        let bytes = consensus::serialize(&unvault_tx(&spec));

        let report = VerificationEngine::new().verify(&bytes, &spec);
        assert_eq!(report.transaction_type, TransactionType::Unvaulting);
        assert!(report.valid);
        assert_eq!(report.message, "Transaction is a valid unvaulting transaction");
        assert_eq!(report.into_result().unwrap(), TransactionType::Unvaulting);
    }

    #[test]
    fn test_valid_cold_and_hot_spends() {
        let spec = spec();
        let (cold, hot) = spend_txs(&spec);
        let engine = VerificationEngine::new();

        let report = engine.verify_transaction(&cold, &spec);
        assert_eq!(report.transaction_type, TransactionType::ColdSpend);
        assert!(report.valid, "{}", report.message);
        assert_eq!(report.message, "Transaction is a valid cold spend transaction");

        let report = engine.verify_transaction(&hot, &spec);
        assert_eq!(report.transaction_type, TransactionType::HotSpend);
        assert!(report.valid, "{}", report.message);
        assert_eq!(report.message, "Transaction is a valid hot spend transaction");
    }

    #[test]
    fn test_unvault_structure_mismatch() {
        let spec = spec();
        let mut tx = unvault_tx(&spec);
        tx.version = Version::TWO;
        tx.output.push(TxOut {
            value: Amount::from_sat(1),
            script_pubkey: ScriptBuf::new(),
        });

        let report = VerificationEngine::new().verify_transaction(&tx, &spec);
        assert_eq!(report.transaction_type, TransactionType::Unvaulting);
        assert!(!report.valid);
        assert!(report.message.starts_with("Transaction structure issues: "));
        assert_eq!(
            report.mismatches,
            vec![
                Mismatch::Version { expected: 1, actual: 2 },
                Mismatch::OutputCount { expected: 1, actual: 2 },
            ]
        );

        let err = report.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralMismatch);
    }

    #[test]
    fn test_hot_spend_sequence_and_output_checked() {
        let spec = spec();
        let (_, mut hot) = spend_txs(&spec);
        hot.input[0].sequence = Sequence(0);
        hot.output[0].value = Amount::from_sat(10);

        let report = VerificationEngine::new().verify_transaction(&hot, &spec);
        assert_eq!(report.transaction_type, TransactionType::HotSpend);
        assert!(!report.valid);
        assert!(report.message.starts_with("Transaction verification failed: "));
        assert!(report.mismatches.contains(&Mismatch::Sequence {
            expected: 0xFFFF_FF6F,
            actual: 0
        }));
        assert!(report.mismatches.contains(&Mismatch::OutputValue {
            expected: 998_800,
            actual: 10
        }));
    }

    #[test]
    fn test_cold_spend_to_wrong_address() {
        let spec = spec();
        let (mut cold, _) = spend_txs(&spec);
        cold.output[0].script_pubkey = spec.hot_address().script_pubkey();

        let report = VerificationEngine::new().verify_transaction(&cold, &spec);
        assert_eq!(report.transaction_type, TransactionType::ColdSpend);
        assert_eq!(report.mismatches, vec![Mismatch::OutputScript]);
    }

    #[test]
    fn test_cold_spend_sequence_not_checked() {
        let spec = spec();
        let (mut cold, _) = spend_txs(&spec);
        cold.input[0].sequence = Sequence::MAX;

        let report = VerificationEngine::new().verify_transaction(&cold, &spec);
        assert!(report.valid);
    }

    #[test]
    fn test_unparseable_bytes() {
        let report = VerificationEngine::new().verify(&[0x00], &spec());
        assert_eq!(report.transaction_type, TransactionType::Unknown);
        assert!(!report.valid);
        assert!(report.message.to_lowercase().contains("error"));
        assert_eq!(
            report.into_result().unwrap_err().kind(),
            ErrorKind::UnknownTransactionType
        );
    }

    #[test]
    fn test_no_inputs() {
        let tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![],
        };
        let report = VerificationEngine::new().verify_transaction(&tx, &spec());
        assert_eq!(report.transaction_type, TransactionType::Unknown);
        assert!(report.message.contains("no inputs"));
    }

    #[test]
    fn test_unrecognized_witness() {
        let spec = spec();
        let mut tx = unvault_tx(&spec);
        tx.input[0].witness = Witness::from_slice(&[vec![0xaa; 32], vec![0x51]]);
        let report = VerificationEngine::new().verify_transaction(&tx, &spec);
        assert_eq!(report.transaction_type, TransactionType::Unknown);
        assert_eq!(report.message, "Could not determine transaction type");

        tx.input[0].witness = Witness::new();
        let report = VerificationEngine::new().verify_transaction(&tx, &spec);
        assert_eq!(report.transaction_type, TransactionType::Unknown);
    }

    #[test]
    fn test_other_vault_is_not_recognized() {
        let spec = spec();
        let report =
            VerificationEngine::new().verify_transaction(&unvault_tx(&spec), &spec_with_delay(145));
        assert_eq!(report.transaction_type, TransactionType::Unknown);
    }

    #[test]
    fn test_matching_input_need_not_be_first() {
        let spec = spec();
        let mut tx = unvault_tx(&spec);
        let decoy = TxIn {
            previous_output: OutPoint::new(Txid::all_zeros(), 7),
            witness: Witness::new(),
            ..tx.input[0].clone()
        };
        tx.input.insert(0, decoy);

        let report = VerificationEngine::new().verify_transaction(&tx, &spec);
        assert_eq!(report.transaction_type, TransactionType::Unvaulting);
        assert_eq!(
            report.mismatches,
            vec![Mismatch::InputCount { expected: 1, actual: 2 }]
        );
    }

    #[test]
    fn test_report_serialization() {
        let spec = spec();
        let bytes = consensus::serialize(&unvault_tx(&spec));
        let report = VerificationEngine::new().verify(&bytes, &spec);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["transactionType"], "Unvaulting");
        assert_eq!(json["valid"], true);
        assert!(json.get("mismatches").is_none());
    }
}
