// src/verify.rs - stateless chain/transaction/PoW predicates (C5)
use crate::constants::DIFFICULTY_PREFIX;
use crate::crypto::verify_signature;
use crate::hash::{hash_block, proof_of_work_hash};
use crate::types::{Block, Transaction};

/// Accepts `proof` iff the hex SHA-256 of `transactions + last_hash + proof`
/// starts with the fixed difficulty prefix (two leading hex zeros).
pub fn valid_proof(transactions: &[Transaction], last_hash: &str, proof: u64) -> bool {
    let transactions_json =
        serde_json::to_string(transactions).expect("transactions always serialise");
    let digest = proof_of_work_hash(&transactions_json, last_hash, proof);
    digest.starts_with(DIFFICULTY_PREFIX)
}

/// Walks the chain from index 1, checking the previous-hash link and the
/// proof of work of every block.
pub fn verify_chain(chain: &[Block]) -> bool {
    for i in 1..chain.len() {
        let previous = &chain[i - 1];
        let current = &chain[i];
        if current.previous_hash != hash_block(previous) {
            return false;
        }
        if !valid_proof(current.pow_transactions(), &current.previous_hash, current.proof) {
            return false;
        }
    }
    true
}

/// Verifies a single transaction: signature validity, and (when
/// `check_funds`) that the sender's balance covers the amount. Coinbase
/// transactions are always valid (the empty signature is a sentinel, not a
/// cryptographic artefact — SPEC_FULL.md §9).
pub fn verify_transaction(
    tx: &Transaction,
    balance_of: impl Fn(&str) -> f64,
    check_funds: bool,
) -> bool {
    if tx.is_coinbase() {
        return true;
    }
    if !verify_signature(tx) {
        return false;
    }
    if check_funds && balance_of(&tx.sender) < tx.amount {
        return false;
    }
    true
}

/// Signature-only check (no funds check) over every pending transaction.
pub fn verify_open_transactions(mempool: &[Transaction], balance_of: impl Fn(&str) -> f64) -> bool {
    mempool
        .iter()
        .all(|tx| verify_transaction(tx, &balance_of, false))
}
