//! End-to-end flows through the public operation surface.

use bitcoin::{consensus, hashes::Hash, Network, Transaction};
use ctv_playground::{
    script::OP_CHECKTEMPLATEVERIFY, CtvApi, ErrorKind, TransactionType, VaultContext, VaultStage,
};

const ADDR: &str = "mzBc4XEFSdzCDcTxAgf6EZXgsZWpztRhef";

fn zero_txid() -> String {
    "0".repeat(64)
}

fn decode_tx(tx_hex: &str) -> Transaction {
    consensus::deserialize(&hex::decode(tx_hex).unwrap()).unwrap()
}

#[test]
fn scenario_a_create_and_unvault() {
    let api = CtvApi::new();
    let vault = api
        .create_vault(1_000_000, ADDR, ADDR, 144, Network::Testnet)
        .unwrap();
    assert_eq!(vault.address, "mp95tyH7p7AigThwTwucugd4zmmPf85tqH");

    let context = VaultContext::from_json(&vault.vault).unwrap();
    assert_eq!(context.block_delay, 144);
    assert_eq!(context.network, Network::Testnet);

    let unvault = api.create_unvault(&vault.vault, &zero_txid(), 0).unwrap();
    assert_eq!(unvault.txid.len(), 64);
    assert!(unvault.txid.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!unvault.script.is_empty());
    assert_eq!(decode_tx(&unvault.tx).compute_txid().to_string(), unvault.txid);

    let report = api.verify(&vault.vault, &unvault.tx).unwrap();
    assert_eq!(report.transaction_type, TransactionType::Unvaulting);
    assert!(report.valid, "{}", report.message);
}

#[test]
fn scenario_b_lock() {
    let api = CtvApi::new();
    let lock = api
        .create_lock(&format!("{}:100000:", ADDR), Network::Testnet)
        .unwrap();

    assert_eq!(lock.ctv_hash.len(), 64);
    assert!(lock.ctv_hash.chars().all(|c| c.is_ascii_hexdigit()));

    let script = hex::decode(&lock.locking_hex).unwrap();
    assert_eq!(script.len(), 34);
    assert_eq!(script[0], 0x20);
    assert_eq!(hex::encode(&script[1..33]), lock.ctv_hash);
    // OP_CHECKTEMPLATEVERIFY redefines OP_NOP4, which is 0xb3
    assert_eq!(*script.last().unwrap(), 0xb3);
    assert_eq!(*script.last().unwrap(), OP_CHECKTEMPLATEVERIFY);
}

#[test]
fn lock_then_spend() {
    let api = CtvApi::new();
    let lock = api
        .create_lock(&format!("{a}:100000:\n{a}:50000:beef", a = ADDR), Network::Testnet)
        .unwrap();

    let spend = api.create_spend(&lock.ctv, &zero_txid(), 2).unwrap();
    let tx = decode_tx(&spend.txs[0]);

    assert_eq!(tx.output.len(), 3);
    assert_eq!(tx.output[0].value.to_sat(), 99_400);
    assert_eq!(tx.output[1].value.to_sat(), 49_400);
    assert!(tx.output[2].script_pubkey.is_op_return());
    assert_eq!(tx.input[0].previous_output.vout, 2);
    assert_eq!(
        tx.input[0].witness.nth(1).unwrap(),
        hex::decode(&lock.locking_hex).unwrap().as_slice()
    );
}

#[test]
fn full_vault_round_trip() {
    let api = CtvApi::new();
    let vault = api
        .create_vault(1_000_000, ADDR, ADDR, 144, Network::Testnet)
        .unwrap();
    let unvault = api.create_unvault(&vault.vault, &zero_txid(), 0).unwrap();
    let spends = api.create_vault_spend(&vault.vault, &unvault.txid).unwrap();

    let mut stage = VaultStage::Funded;

    let report = api.verify(&vault.vault, &unvault.tx).unwrap();
    assert_eq!((report.transaction_type, report.valid), (TransactionType::Unvaulting, true));
    stage = stage.apply(report.transaction_type).unwrap();

    let cold = api.verify(&vault.vault, &spends.cold_tx).unwrap();
    assert_eq!((cold.transaction_type, cold.valid), (TransactionType::ColdSpend, true));

    let hot = api.verify(&vault.vault, &spends.hot_tx).unwrap();
    assert_eq!((hot.transaction_type, hot.valid), (TransactionType::HotSpend, true));

    assert_eq!(stage.apply(cold.transaction_type).unwrap(), VaultStage::ColdSpent);
    assert_eq!(stage.apply(hot.transaction_type).unwrap(), VaultStage::HotSpent);

    // Both spends consume output 0 of the unvault transaction
    let cold_tx = decode_tx(&spends.cold_tx);
    assert_eq!(cold_tx.input[0].previous_output.txid.to_string(), unvault.txid);
    assert_eq!(cold_tx.input[0].previous_output.vout, 0);
}

#[test]
fn round_trip_with_distinct_addresses_on_signet() {
    let api = CtvApi::new();
    let cold = bitcoin::Address::p2pkh(
        bitcoin::PubkeyHash::from_byte_array([1u8; 20]),
        Network::Signet,
    )
    .to_string();
    let hot = bitcoin::Address::p2wpkh(
        &bitcoin::CompressedPublicKey::from_slice(
            &hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap(),
        )
        .unwrap(),
        Network::Signet,
    )
    .to_string();

    let vault = api.create_vault(250_000, &cold, &hot, 6, Network::Signet).unwrap();
    let unvault = api.create_unvault(&vault.vault, &"ab".repeat(32), 3).unwrap();
    let spends = api.create_vault_spend(&vault.vault, &unvault.txid).unwrap();

    for (tx_hex, expected) in [
        (&unvault.tx, TransactionType::Unvaulting),
        (&spends.cold_tx, TransactionType::ColdSpend),
        (&spends.hot_tx, TransactionType::HotSpend),
    ] {
        let report = api.verify(&vault.vault, tx_hex).unwrap();
        assert_eq!(report.transaction_type, expected);
        assert!(report.valid, "{}", report.message);
    }

    // A spend built for one vault does not verify against another
    let other = api.create_vault(250_000, &cold, &hot, 7, Network::Signet).unwrap();
    let report = api.verify(&other.vault, &spends.hot_tx).unwrap();
    assert_eq!(report.transaction_type, TransactionType::Unknown);
}

#[test]
fn truncated_transaction_is_unknown() {
    let api = CtvApi::new();
    let vault = api
        .create_vault(1_000_000, ADDR, ADDR, 144, Network::Testnet)
        .unwrap();

    let report = api.verify(&vault.vault, "00").unwrap();
    assert_eq!(report.transaction_type, TransactionType::Unknown);
    assert!(!report.valid);
    assert!(report.message.contains("error"));
}

#[test]
fn create_vault_is_idempotent() {
    let api = CtvApi::new();
    let first = api
        .create_vault(1_000_000, ADDR, ADDR, 144, Network::Testnet)
        .unwrap();
    let second = api
        .create_vault(1_000_000, ADDR, ADDR, 144, Network::Testnet)
        .unwrap();
    assert_eq!(first, second);

    let a = api.create_unvault(&first.vault, &zero_txid(), 0).unwrap();
    let b = api.create_unvault(&second.vault, &zero_txid(), 0).unwrap();
    assert_eq!(a.script, b.script);
    assert_eq!(a.txid, b.txid);
}

#[test]
fn double_encoded_context_is_rejected() {
    let api = CtvApi::new();
    let vault = api
        .create_vault(1_000_000, ADDR, ADDR, 144, Network::Testnet)
        .unwrap();
    let double_encoded = serde_json::to_string(&vault.vault).unwrap();

    for err in [
        api.create_unvault(&double_encoded, &zero_txid(), 0).unwrap_err(),
        api.create_vault_spend(&double_encoded, &zero_txid()).unwrap_err(),
        api.verify(&double_encoded, "00").unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}

#[test]
fn context_network_mismatch_is_rejected() {
    let api = CtvApi::new();
    let vault = api
        .create_vault(1_000_000, ADDR, ADDR, 144, Network::Testnet)
        .unwrap();
    let tampered = vault.vault.replace("\"testnet\"", "\"mainnet\"");

    let err = api.create_unvault(&tampered, &zero_txid(), 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAddress);
}
