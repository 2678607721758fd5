//! # CTV Playground CLI
//!
//! Command-line front end for the external operations: CTV locks and spends,
//! vault creation, unvaulting, cold/hot spends and verification.
//!
//! ## Usage
//!
//! ```bash
//! # Lock to a template paying one output
//! ctv lock "mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef:100000:"
//!
//! # Create a vault, then unvault and spend it
//! ctv create-vault --amount 1000000 --cold <addr> --hot <addr> --delay 144
//! ctv unvault @vault.json <funding_txid> --vout 0
//! ctv vault-spend @vault.json <unvault_txid>
//!
//! # Check a transaction against a vault
//! ctv verify @vault.json <tx_hex> --strict
//!
//! # Run the whole vault flow offline
//! ctv demo
//! ```
//!
//! Context arguments take either a JSON object literal or `@path` to a file
//! holding one. The network comes from `--network`, then `CTV_NETWORK`, then
//! defaults to testnet.

use anyhow::{Context, Result};
use bitcoin::Network;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::{env, fs};

use ctv_playground::{
    config::{env as env_config, network as network_config, vault as vault_config},
    utils::network,
    CtvApi, VaultStage,
};

#[derive(Parser)]
#[command(name = "ctv")]
#[command(about = "CheckTemplateVerify commitments, locks and vaults")]
struct Cli {
    /// Network: mainnet, testnet, signet or regtest
    #[arg(short, long, global = true)]
    network: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock funds to a CTV template
    Lock {
        /// Output lines `address:amount[:dataHex]`
        #[arg(required = true)]
        outputs: Vec<String>,
    },
    /// Spend a CTV-locked output
    Spend {
        /// CTV context JSON or @file
        ctv: String,
        /// Funding transaction ID
        txid: String,
        /// Funding output index
        #[arg(short, long, default_value_t = 0)]
        vout: u32,
    },
    /// Create a vault and print its address and context
    CreateVault {
        /// Amount to vault in satoshis
        #[arg(short, long, default_value_t = vault_config::DEFAULT_DEMO_AMOUNT)]
        amount: u64,
        /// Cold (recovery) address
        #[arg(long)]
        cold: String,
        /// Hot (withdrawal) address
        #[arg(long)]
        hot: String,
        /// CSV delay in blocks
        #[arg(short, long, default_value_t = vault_config::DEFAULT_BLOCK_DELAY)]
        delay: u32,
    },
    /// Build the unvault transaction
    Unvault {
        /// Vault context JSON or @file
        vault: String,
        /// Vault funding transaction ID
        txid: String,
        /// Vault funding output index
        #[arg(short, long, default_value_t = 0)]
        vout: u32,
    },
    /// Build the cold and hot spends of an unvault transaction
    VaultSpend {
        /// Vault context JSON or @file
        vault: String,
        /// Unvault transaction ID
        txid: String,
    },
    /// Classify and check a transaction against a vault
    Verify {
        /// Vault context JSON or @file
        vault: String,
        /// Raw transaction hex
        tx: String,
        /// Exit with an error unless the transaction is valid
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Run create-vault, unvault, vault-spend and verify end to end
    Demo {
        /// Vault amount in satoshis
        #[arg(short, long, default_value_t = vault_config::DEFAULT_DEMO_AMOUNT)]
        amount: u64,
        /// CSV delay in blocks
        #[arg(short, long, default_value_t = vault_config::DEFAULT_BLOCK_DELAY)]
        delay: u32,
        /// Address used for both the cold and the hot path
        #[arg(long, default_value = vault_config::DEMO_ADDRESS)]
        address: String,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(env_config::LOG, "warn"))
        .init();

    let cli = Cli::parse();
    let network = resolve_network(cli.network.as_deref())?;
    let api = CtvApi::new();

    match cli.command {
        Commands::Lock { outputs } => {
            print_json(&api.create_lock(&outputs.join("\n"), network)?)?;
        }
        Commands::Spend { ctv, txid, vout } => {
            print_json(&api.create_spend(&load_context(&ctv)?, &txid, vout)?)?;
        }
        Commands::CreateVault {
            amount,
            cold,
            hot,
            delay,
        } => {
            print_json(&api.create_vault(amount, &cold, &hot, delay, network)?)?;
        }
        Commands::Unvault { vault, txid, vout } => {
            print_json(&api.create_unvault(&load_context(&vault)?, &txid, vout)?)?;
        }
        Commands::VaultSpend { vault, txid } => {
            print_json(&api.create_vault_spend(&load_context(&vault)?, &txid)?)?;
        }
        Commands::Verify { vault, tx, strict } => {
            let report = api.verify(&load_context(&vault)?, &tx)?;
            print_json(&report)?;
            if strict {
                report.into_result()?;
            }
        }
        Commands::Demo {
            amount,
            delay,
            address,
        } => {
            demo(&api, amount, delay, &address, network)?;
        }
    }

    Ok(())
}

/// `--network`, then `CTV_NETWORK`, then the default
fn resolve_network(flag: Option<&str>) -> Result<Network> {
    let name = match flag {
        Some(name) => name.to_string(),
        None => env::var(env_config::NETWORK)
            .unwrap_or_else(|_| network_config::DEFAULT_NETWORK.to_string()),
    };
    Ok(network::parse(&name)?)
}

/// A literal JSON object, or `@path` to read one from disk
fn load_context(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read context file {}", path))
        }
        None => Ok(arg.to_string()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn demo(api: &CtvApi, amount: u64, delay: u32, address: &str, network: Network) -> Result<()> {
    let funding_txid = "00".repeat(32);

    println!("🏦 CTV Vault Demo ({})", network::name(network));
    println!("   Amount: {} sats, delay: {} blocks\n", amount, delay);

    let vault = api.create_vault(amount, address, address, delay, network)?;
    let mut stage = VaultStage::Funded;
    println!("✅ Vault address: {}", vault.address);
    println!("   Stage: {}", stage);

    let unvault = api.create_unvault(&vault.vault, &funding_txid, 0)?;
    println!("\n🔓 Unvault txid: {}", unvault.txid);
    println!("   Redeem script: {}", unvault.script);
    let report = api.verify(&vault.vault, &unvault.tx)?;
    println!("   {}", report.message);
    stage = stage.apply(report.into_result()?)?;
    println!("   Stage: {}", stage);

    let spends = api.create_vault_spend(&vault.vault, &unvault.txid)?;

    let cold = api.verify(&vault.vault, &spends.cold_tx)?;
    println!("\n❄️  Cold spend: {}", cold.message);
    println!("   Stage: {}", stage.apply(cold.into_result()?)?);

    let hot = api.verify(&vault.vault, &spends.hot_tx)?;
    println!("\n🔥 Hot spend (after {} blocks): {}", delay, hot.message);
    println!("   Stage: {}", stage.apply(hot.into_result()?)?);

    println!("\n📄 Vault context:\n{}", vault.vault);
    Ok(())
}
