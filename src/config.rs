//! # Configuration Constants
//!
//! Fixed economic and template parameters of the covenants, plus the defaults
//! used by the command-line front end.
//!
//! Every value in [`fees`] and [`template`] is committed to by a CTV hash.
//! Changing one changes every derived commitment and address.

/// Fixed fees deducted at each covenant step
pub mod fees {
    /// Fee deducted from the vault amount when moving vault → unvault.
    pub const UNVAULT_FEE_SATS: u64 = 600;

    /// Fee deducted from the vault amount for the final unvault → cold/hot
    /// spend. It is measured from the original vault amount, not from the
    /// unvault output.
    pub const SPEND_FEE_SATS: u64 = 1_200;

    /// Fee deducted per output line in a simple CTV lock.
    pub const LOCK_FEE_SATS: u64 = UNVAULT_FEE_SATS;
}

/// Transaction template parameters
pub mod template {
    /// Version of the vault, cold and CTV-spend templates.
    pub const VERSION: i32 = 1;

    /// Version of the hot-spend template.
    pub const HOT_VERSION: i32 = 2;

    pub const LOCKTIME: u32 = 0;

    /// Sequence of the single input in non-delayed templates.
    pub const SEQUENCE: u32 = 0;

    /// Only a single input at index 0 is supported.
    pub const INPUT_INDEX: usize = 0;

    /// Unvault transactions pay to their first output.
    pub const UNVAULT_OUTPUT_INDEX: u32 = 0;

    /// Length of a CTV commitment in bytes.
    pub const HASH_LEN: usize = 32;
}

/// Network defaults
pub mod network {
    /// Network used when neither `--network` nor the environment names one
    pub const DEFAULT_NETWORK: &str = "testnet";
}

/// Vault defaults for the command-line front end
pub mod vault {
    /// Default relative delay for hot withdrawals (about one day of blocks)
    pub const DEFAULT_BLOCK_DELAY: u32 = 144;

    /// Default vault amount for demonstrations (0.01 BTC)
    pub const DEFAULT_DEMO_AMOUNT: u64 = 1_000_000;

    /// Testnet address used by the demonstration flow for both hot and cold
    pub const DEMO_ADDRESS: &str = "mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef";
}

/// Environment variable names
pub mod env {
    /// Default network override
    pub const NETWORK: &str = "CTV_NETWORK";

    /// Log filter read by env_logger
    pub const LOG: &str = "RUST_LOG";
}
