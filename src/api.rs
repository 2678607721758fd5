//! # External Operations
//!
//! The string-in, JSON-out surface a request layer calls: `create_lock`,
//! `create_spend`, `create_vault`, `create_unvault`, `create_vault_spend`
//! and `verify`.
//!
//! State between calls travels only in opaque context blobs (see
//! [`VaultContext`] and [`CtvContext`]). A blob must be a JSON object; a
//! JSON string that itself contains JSON is rejected instead of unwrapped.

use bitcoin::{consensus::encode::serialize_hex, Amount, Network, OutPoint, ScriptBuf};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{HashProvider, StandardHashes};
use crate::config::{fees, template};
use crate::ctv::{CtvCommitment, CtvOutput, TxTemplate};
use crate::error::{CtvError, CtvResult};
use crate::script::op_return_script;
use crate::utils::{address, amount, network, txid};
use crate::vault::{VaultEngine, VaultSpec};
use crate::verify::{VerificationEngine, VerificationReport};

/// Canonical vault context blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VaultContext {
    #[serde(with = "network::serde_name")]
    pub network: Network,
    pub cold_address: String,
    pub hot_address: String,
    pub amount: u64,
    pub block_delay: u32,
    /// Carried through but not used by any covenant logic
    #[serde(default)]
    pub taproot: bool,
}

impl VaultContext {
    pub fn from_spec(spec: &VaultSpec, taproot: bool) -> Self {
        Self {
            network: spec.network(),
            cold_address: spec.cold_address().to_string(),
            hot_address: spec.hot_address().to_string(),
            amount: spec.amount().to_sat(),
            block_delay: spec.block_delay(),
            taproot,
        }
    }

    pub fn from_json(blob: &str) -> CtvResult<Self> {
        parse_context(blob, "vault")
    }

    pub fn to_json(&self) -> CtvResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Re-validate the blob into a [`VaultSpec`]
    pub fn to_spec(&self) -> CtvResult<VaultSpec> {
        VaultSpec::new(
            &self.cold_address,
            &self.hot_address,
            amount::positive(self.amount)?,
            self.block_delay,
            self.network,
        )
    }
}

/// One output of a [`CtvContext`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContextOutput {
    pub amount: u64,
    /// Hex-encoded output script
    pub script_pub_key: String,
}

/// Canonical CTV template context blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CtvContext {
    #[serde(with = "network::serde_name")]
    pub network: Network,
    pub version: i32,
    pub locktime: u32,
    pub sequences: Vec<u32>,
    pub input_index: usize,
    pub ctv_hash: CtvCommitment,
    pub outputs: Vec<ContextOutput>,
}

impl CtvContext {
    pub fn new(template: &TxTemplate, ctv_hash: CtvCommitment, network: Network) -> Self {
        Self {
            network,
            version: template.version,
            locktime: template.locktime,
            sequences: template.sequences.clone(),
            input_index: template.input_index,
            ctv_hash,
            outputs: template
                .outputs
                .iter()
                .map(|output| ContextOutput {
                    amount: output.amount.to_sat(),
                    script_pub_key: hex::encode(output.script_pubkey.as_bytes()),
                })
                .collect(),
        }
    }

    pub fn from_json(blob: &str) -> CtvResult<Self> {
        parse_context(blob, "CTV")
    }

    pub fn to_json(&self) -> CtvResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild the template this context was created from
    pub fn template(&self) -> CtvResult<TxTemplate> {
        let outputs = self
            .outputs
            .iter()
            .map(|output| {
                Ok(CtvOutput::new(
                    ScriptBuf::from_bytes(hex::decode(&output.script_pub_key)?),
                    amount::within_supply(output.amount)?,
                ))
            })
            .collect::<CtvResult<Vec<_>>>()?;

        Ok(TxTemplate {
            version: self.version,
            locktime: self.locktime,
            sequences: self.sequences.clone(),
            outputs,
            input_index: self.input_index,
        })
    }
}

fn parse_context<T: DeserializeOwned>(blob: &str, what: &str) -> CtvResult<T> {
    let value: Value = serde_json::from_str(blob.trim())?;
    match value {
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        Value::String(_) => Err(CtvError::parse(format!(
            "{} context is a JSON-encoded string; expected a JSON object",
            what
        ))),
        _ => Err(CtvError::parse(format!(
            "{} context must be a JSON object",
            what
        ))),
    }
}

/// One `address:amount[:dataHex]` line of a lock request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    pub address: bitcoin::Address,
    pub amount: Amount,
    pub data: Option<Vec<u8>>,
}

impl OutputRequest {
    pub fn parse_line(line: &str, network: Network) -> CtvResult<Self> {
        let parts: Vec<&str> = line.trim().split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(CtvError::parse(format!(
                "Invalid output format: '{}'. Expected: address:amount[:data]",
                line.trim()
            )));
        }

        let address = address::validate_and_parse(parts[0], network)?;
        let amount = amount::parse_sats(parts[1])?;
        let data = match parts.get(2).map(|d| d.trim()) {
            Some(data) if !data.is_empty() => Some(hex::decode(data)?),
            _ => None,
        };

        Ok(Self {
            address,
            amount,
            data,
        })
    }

    /// Parse newline-separated lines, skipping blank ones
    pub fn parse_lines(text: &str, network: Network) -> CtvResult<Vec<Self>> {
        let requests = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Self::parse_line(line, network))
            .collect::<CtvResult<Vec<_>>>()?;

        if requests.is_empty() {
            return Err(CtvError::parse("No outputs provided"));
        }
        Ok(requests)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    pub ctv_hash: String,
    /// Locking script in ASM form
    pub locking_script: String,
    pub locking_hex: String,
    pub address: String,
    /// [`CtvContext`] blob
    pub ctv: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendResponse {
    pub txs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultResponse {
    /// [`VaultContext`] blob
    pub vault: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnvaultResponse {
    pub vault: String,
    /// Unvault redeem script hex
    pub script: String,
    pub tx: String,
    pub txid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSpendResponse {
    pub cold_tx: String,
    pub hot_tx: String,
}

/// Entry point for every external operation
#[derive(Debug, Clone, Default)]
pub struct CtvApi<H: HashProvider = StandardHashes> {
    vault: VaultEngine<H>,
    verifier: VerificationEngine<H>,
}

impl CtvApi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: HashProvider + Clone> CtvApi<H> {
    pub fn with_hashes(hashes: H) -> Self {
        Self {
            vault: VaultEngine::with_hashes(hashes.clone()),
            verifier: VerificationEngine::with_hashes(hashes),
        }
    }
}

impl<H: HashProvider> CtvApi<H> {
    /// Lock funds to a CTV template paying each requested output `amount - 600`
    pub fn create_lock(&self, outputs: &str, network: Network) -> CtvResult<LockResponse> {
        let mut ctv_outputs = Vec::new();
        for request in OutputRequest::parse_lines(outputs, network)? {
            ctv_outputs.push(CtvOutput::to_address(
                &request.address,
                amount::after_fee(request.amount, fees::LOCK_FEE_SATS)?,
            ));
            if let Some(data) = request.data {
                ctv_outputs.push(CtvOutput::new(op_return_script(&data)?, Amount::ZERO));
            }
        }

        let template = TxTemplate::single_input(ctv_outputs);
        let ctv = self.vault.ctv();
        let commitment = ctv.calculate_commitment(&template);
        let (script, lock_address) = ctv.locking_script_and_address(&commitment, network)?;

        log::info!(
            "Created CTV lock {} with {} outputs at {}",
            commitment,
            template.outputs.len(),
            lock_address
        );

        Ok(LockResponse {
            ctv_hash: commitment.to_string(),
            locking_script: script.to_asm_string(),
            locking_hex: hex::encode(script.as_bytes()),
            address: lock_address.to_string(),
            ctv: CtvContext::new(&template, commitment, network).to_json()?,
        })
    }

    /// Spend `prev_txid:prev_vout` into the outputs committed by the context
    pub fn create_spend(
        &self,
        ctv_context: &str,
        prev_txid: &str,
        prev_vout: u32,
    ) -> CtvResult<SpendResponse> {
        let context = CtvContext::from_json(ctv_context)?;
        let template = context.template()?;

        let commitment = self.vault.ctv().calculate_commitment(&template);
        if commitment != context.ctv_hash {
            return Err(CtvError::parse(format!(
                "ctvHash {} does not match the template commitment {}",
                context.ctv_hash, commitment
            )));
        }

        let prevout = OutPoint::new(txid::parse(prev_txid)?, prev_vout);
        let tx = self
            .vault
            .ctv()
            .build_spending_tx(&commitment, prevout, &template.outputs)?;

        log::info!("Created CTV spend {} of {}", tx.compute_txid(), prevout);

        Ok(SpendResponse {
            txs: vec![serialize_hex(&tx)],
        })
    }

    pub fn create_vault(
        &self,
        amount: u64,
        cold_address: &str,
        hot_address: &str,
        block_delay: u32,
        network: Network,
    ) -> CtvResult<VaultResponse> {
        let spec = VaultSpec::new(
            cold_address,
            hot_address,
            amount::positive(amount)?,
            block_delay,
            network,
        )?;
        let vault_address = self.vault.vault_address(&spec)?;

        log::info!(
            "Created vault {} for {} with {} block delay",
            vault_address,
            spec.amount(),
            block_delay
        );

        Ok(VaultResponse {
            vault: VaultContext::from_spec(&spec, false).to_json()?,
            address: vault_address.to_string(),
        })
    }

    /// Build the vault → unvault transaction spending `prev_txid:prev_vout`
    pub fn create_unvault(
        &self,
        vault_context: &str,
        prev_txid: &str,
        prev_vout: u32,
    ) -> CtvResult<UnvaultResponse> {
        let context = VaultContext::from_json(vault_context)?;
        let spec = context.to_spec()?;
        let artifacts = self.vault.artifacts(&spec)?;

        let prevout = OutPoint::new(txid::parse(prev_txid)?, prev_vout);
        let tx = self.vault.build_unvault_tx(
            &artifacts.vault_commitment,
            prevout,
            &artifacts.unvault_address,
            spec.amount(),
        )?;
        let unvault_txid = tx.compute_txid();

        log::info!("Created unvault {} spending {}", unvault_txid, prevout);

        Ok(UnvaultResponse {
            vault: context.to_json()?,
            script: hex::encode(artifacts.redeem_script.as_bytes()),
            tx: serialize_hex(&tx),
            txid: unvault_txid.to_string(),
        })
    }

    /// Build the cold and hot spends of output 0 of `unvault_txid`
    pub fn create_vault_spend(
        &self,
        vault_context: &str,
        unvault_txid: &str,
    ) -> CtvResult<VaultSpendResponse> {
        let spec = VaultContext::from_json(vault_context)?.to_spec()?;
        let artifacts = self.vault.artifacts(&spec)?;
        let prevout = OutPoint::new(txid::parse(unvault_txid)?, template::UNVAULT_OUTPUT_INDEX);

        let cold = self.vault.build_cold_spend_tx(
            &artifacts.redeem_script,
            prevout,
            spec.cold_address(),
            spec.amount(),
        )?;
        let hot = self.vault.build_hot_spend_tx(
            &artifacts.redeem_script,
            prevout,
            spec.hot_address(),
            spec.amount(),
            spec.block_delay(),
        )?;

        log::info!(
            "Created cold spend {} and hot spend {} of {}",
            cold.compute_txid(),
            hot.compute_txid(),
            prevout
        );

        Ok(VaultSpendResponse {
            cold_tx: serialize_hex(&cold),
            hot_tx: serialize_hex(&hot),
        })
    }

    /// Classify and check `tx_hex` against the vault context.
    ///
    /// Only a bad context is an error. Whitespace anywhere in `tx_hex` is
    /// ignored, and undecodable hex yields an `Unknown` report.
    pub fn verify(&self, vault_context: &str, tx_hex: &str) -> CtvResult<VerificationReport> {
        let spec = VaultContext::from_json(vault_context)?.to_spec()?;

        let tx_hex: String = tx_hex.chars().filter(|c| !c.is_whitespace()).collect();
        let report = match hex::decode(&tx_hex) {
            Ok(bytes) => self.verifier.verify(&bytes, &spec),
            Err(e) => VerificationReport::parse_failure(e),
        };

        log::info!(
            "Verified transaction as {} (valid: {})",
            report.transaction_type,
            report.valid
        );
        Ok(report)
    }
}
