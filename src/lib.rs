//! # CTV Playground: CheckTemplateVerify Commitments and Vaults
//!
//! Computes CTV template commitments, builds CTV-locked scripts and
//! addresses, constructs the transactions that satisfy them, and implements a
//! two-stage vault covenant with a structural verifier.
//!
//! ## Vault Flow
//!
//! ```text
//! Funded ──unvault──> Unvaulting ──cold (immediate)──> ColdSpent
//!                               └──hot (after delay)──> HotSpent
//! ```
//!
//! ## Module Structure
//!
//! - [`codec`]: little-endian integers, varints and hash providers
//! - [`script`]: raw script construction
//! - [`ctv`]: template commitments and CTV spends
//! - [`vault`]: vault commitments, addresses and transactions
//! - [`verify`]: transaction classification and structural checks
//! - [`api`]: context blobs and the external operations
//! - [`utils`]: network, address, amount and txid parsing
//! - [`config`]: fees and template constants
//! - [`error`]: error taxonomy
//!
//! ## Programmatic Usage
//!
//! ```rust
//! use bitcoin::Network;
//! use ctv_playground::CtvApi;
//!
//! let api = CtvApi::new();
//! let addr = "mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef";
//! let vault = api.create_vault(1_000_000, addr, addr, 144, Network::Testnet)?;
//! let unvault = api.create_unvault(&vault.vault, &"00".repeat(32), 0)?;
//! let report = api.verify(&vault.vault, &unvault.tx)?;
//! assert!(report.valid);
//! # Ok::<(), ctv_playground::CtvError>(())
//! ```

pub mod api;
pub mod codec;
pub mod config;
pub mod ctv;
pub mod error;
pub mod script;
pub mod utils;
pub mod vault;
pub mod verify;

// Re-export commonly used types
pub use api::{CtvApi, CtvContext, VaultContext};
pub use codec::{HashProvider, StandardHashes};
pub use ctv::{CtvCommitment, CtvEngine, CtvOutput, TxTemplate};
pub use error::{CtvError, CtvResult, ErrorKind};
pub use vault::{VaultArtifacts, VaultEngine, VaultSpec, VaultStage};
pub use verify::{Mismatch, TransactionType, VerificationEngine, VerificationReport};
