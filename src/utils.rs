//! # Utility Functions
//!
//! String-boundary helpers: network names, address parsing and the legacy
//! address encoding used for covenant outputs, amount and txid parsing.

use crate::error::{CtvError, CtvResult};
use bitcoin::{Address, Network};
use std::str::FromStr;

/// Network name utilities
pub mod network {
    use super::*;

    /// Parse a network name (`mainnet`/`bitcoin`, `testnet`, `signet`, `regtest`)
    pub fn parse(name: &str) -> CtvResult<Network> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            other => Err(CtvError::parse(format!("Unknown network '{}'", other))),
        }
    }

    /// Canonical name written into context blobs
    pub fn name(network: Network) -> &'static str {
        match network {
            Network::Bitcoin => "mainnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
            _ => "testnet",
        }
    }

    /// Serde adapter storing a [`Network`] by its canonical name
    pub mod serde_name {
        use super::*;
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(network: &Network, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(name(*network))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Network, D::Error> {
            let raw = String::deserialize(deserializer)?;
            parse(&raw).map_err(D::Error::custom)
        }
    }
}

/// Address parsing and encoding utilities
pub mod address {
    use super::*;
    use crate::codec::HashProvider;
    use crate::script::p2wsh_script;
    use bitcoin::{hashes::Hash, PubkeyHash, Script};

    /// Validate and parse a Bitcoin address (Base58Check or Bech32) for the given network
    pub fn validate_and_parse(address_str: &str, network: Network) -> CtvResult<Address> {
        let trimmed = address_str.trim();
        let invalid = || CtvError::invalid_address(network::name(network), trimmed);

        let address = Address::from_str(trimmed).map_err(|_| invalid())?;

        // Ensure the address is for the correct network
        address.require_network(network).map_err(|_| invalid())
    }

    /// Legacy-style encoding of a witness script:
    /// `Base58Check(version, RIPEMD160(SHA256(script)))`.
    ///
    /// The version byte is the network's pay-to-pubkey-hash prefix, so the
    /// result looks like a P2PKH address whose payload is the RIPEMD-160 of
    /// the script's P2WSH program. Existing callers depend on this exact
    /// encoding; it is not a spendable P2WSH address.
    pub fn legacy_script_address<H: HashProvider>(
        hashes: &H,
        script: &Script,
        network: Network,
    ) -> Address {
        legacy_program_address(hashes, &p2wsh_script(hashes, script), network)
    }

    /// Legacy-style encoding of a P2WSH output: the payload is the
    /// RIPEMD-160 of the 32-byte program after `OP_0 OP_PUSHBYTES_32`
    pub fn legacy_program_address<H: HashProvider>(
        hashes: &H,
        witness_program: &Script,
        network: Network,
    ) -> Address {
        let program = witness_program.as_bytes().get(2..).unwrap_or_default();
        Address::p2pkh(
            PubkeyHash::from_byte_array(hashes.ripemd160(program)),
            network,
        )
    }
}

/// Amount parsing utilities
pub mod amount {
    use super::*;
    use bitcoin::Amount;

    /// Parse a strictly positive satoshi amount
    pub fn parse_sats(input: &str) -> CtvResult<Amount> {
        let sats: u64 = input
            .trim()
            .parse()
            .map_err(|_| CtvError::invalid_amount(input.trim()))?;
        positive(sats)
    }

    /// Reject zero amounts and amounts above the money supply
    pub fn positive(sats: u64) -> CtvResult<Amount> {
        if sats == 0 {
            return Err(CtvError::invalid_amount("0"));
        }
        within_supply(sats)
    }

    /// Reject amounts above [`Amount::MAX_MONEY`]
    pub fn within_supply(sats: u64) -> CtvResult<Amount> {
        let amount = Amount::from_sat(sats);
        if amount > Amount::MAX_MONEY {
            return Err(CtvError::invalid_amount(sats.to_string()));
        }
        Ok(amount)
    }

    /// `amount - fee`, which must stay strictly positive
    pub fn after_fee(amount: Amount, fee_sats: u64) -> CtvResult<Amount> {
        match amount.to_sat().checked_sub(fee_sats) {
            Some(rest) if rest > 0 => Ok(Amount::from_sat(rest)),
            _ => Err(CtvError::InsufficientFunds {
                required: fee_sats,
                available: amount.to_sat(),
            }),
        }
    }
}

/// Transaction ID utilities
pub mod txid {
    use super::*;
    use bitcoin::Txid;

    /// Parse a transaction ID in display (reversed) byte order, exactly 64 hex characters
    pub fn parse(input: &str) -> CtvResult<Txid> {
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.len() != 64 {
            return Err(CtvError::parse(format!(
                "Transaction ID must be exactly 64 hex characters, got {}",
                cleaned.len()
            )));
        }

        Txid::from_str(&cleaned)
            .map_err(|e| CtvError::parse(format!("Invalid transaction ID '{}': {}", cleaned, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{HashProvider, StandardHashes};
    use crate::error::ErrorKind;
    use bitcoin::{Amount, ScriptBuf};

    const TESTNET_ADDR: &str = "mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef";

    #[test]
    fn test_network_names() {
        assert_eq!(network::parse("mainnet").unwrap(), Network::Bitcoin);
        assert_eq!(network::parse("Bitcoin").unwrap(), Network::Bitcoin);
        assert_eq!(network::parse(" testnet ").unwrap(), Network::Testnet);
        assert_eq!(network::parse("SIGNET").unwrap(), Network::Signet);
        assert_eq!(network::parse("regtest").unwrap(), Network::Regtest);
        assert_eq!(network::parse("moonnet").unwrap_err().kind(), ErrorKind::Parse);

        for net in [Network::Bitcoin, Network::Testnet, Network::Signet, Network::Regtest] {
            assert_eq!(network::parse(network::name(net)).unwrap(), net);
        }
    }

    #[test]
    fn test_address_validation() {
        let addr = address::validate_and_parse(TESTNET_ADDR, Network::Testnet).unwrap();
        assert_eq!(addr.to_string(), TESTNET_ADDR);

        let err = address::validate_and_parse(TESTNET_ADDR, Network::Bitcoin).unwrap_err();
        assert!(matches!(
            err,
            CtvError::InvalidAddress { ref network, ref input } if network == "mainnet" && input == TESTNET_ADDR
        ));

        // Corrupt the checksum
        let bad = format!("{}x", &TESTNET_ADDR[..TESTNET_ADDR.len() - 1]);
        assert_eq!(
            address::validate_and_parse(&bad, Network::Testnet).unwrap_err().kind(),
            ErrorKind::InvalidAddress
        );
    }

    #[test]
    fn test_legacy_script_address() {
        let script = ScriptBuf::from_bytes(vec![0x51]);
        let addr = address::legacy_script_address(&StandardHashes, &script, Network::Testnet);

        let expected_payload = StandardHashes.hash160(script.as_bytes());
        let mut payload = vec![0x6f];
        payload.extend_from_slice(&expected_payload);
        assert_eq!(addr.to_string(), bitcoin::base58::encode_check(&payload));

        let mainnet = address::legacy_script_address(&StandardHashes, &script, Network::Bitcoin);
        assert!(mainnet.to_string().starts_with('1'));
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(amount::parse_sats("100000").unwrap(), Amount::from_sat(100_000));
        assert_eq!(amount::parse_sats("abc").unwrap_err().kind(), ErrorKind::InvalidAmount);
        assert_eq!(amount::parse_sats("-5").unwrap_err().kind(), ErrorKind::InvalidAmount);
        assert_eq!(amount::parse_sats("0").unwrap_err().kind(), ErrorKind::InvalidAmount);
    }

    #[test]
    fn test_amount_money_supply_cap() {
        let max = Amount::MAX_MONEY.to_sat();
        assert_eq!(amount::positive(max).unwrap(), Amount::MAX_MONEY);
        assert_eq!(amount::positive(max + 1).unwrap_err().kind(), ErrorKind::InvalidAmount);
        assert_eq!(
            amount::parse_sats(&u64::MAX.to_string()).unwrap_err().kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(amount::within_supply(0).unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_amount_after_fee() {
        assert_eq!(
            amount::after_fee(Amount::from_sat(1_000_000), 600).unwrap(),
            Amount::from_sat(999_400)
        );
        assert!(matches!(
            amount::after_fee(Amount::from_sat(600), 600),
            Err(CtvError::InsufficientFunds { required: 600, available: 600 })
        ));
        assert!(matches!(
            amount::after_fee(Amount::from_sat(100), 1_200),
            Err(CtvError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_txid_validation() {
        let zero = "0".repeat(64);
        assert_eq!(txid::parse(&zero).unwrap().to_string(), zero);
        assert_eq!(txid::parse("abcd").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(txid::parse(&"z".repeat(64)).unwrap_err().kind(), ErrorKind::Parse);
    }
}
