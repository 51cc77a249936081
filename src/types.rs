// src/types.rs - transaction and block data model
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    COINBASE_SENDER, GENESIS_PREVIOUS_HASH, GENESIS_PROOF, GENESIS_TIMESTAMP,
};

/// An atomic transfer intent. Field order matches the canonical dict form
/// required for hashing and signing: `sender, recipient, signature, amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub signature: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, signature: impl Into<String>, amount: f64) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            signature: signature.into(),
            amount,
        }
    }

    /// A coinbase reward has the sentinel sender `"MINING"` and carries no signature.
    pub fn coinbase(recipient: impl Into<String>, amount: f64) -> Self {
        Transaction {
            sender: COINBASE_SENDER.to_string(),
            recipient: recipient.into(),
            signature: String::new(),
            amount,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    /// Identity used for mempool/chain deduplication (invariant 7 of the spec).
    pub fn identity_key(&self) -> (&str, &str, u64, &str) {
        (&self.sender, &self.recipient, self.amount.to_bits(), &self.signature)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.sender, self.recipient, self.amount)
    }
}

/// An ordered batch of transactions, chained to its predecessor by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub timestamp: u64,
}

impl Block {
    pub fn new(index: u64, previous_hash: impl Into<String>, transactions: Vec<Transaction>, proof: u64, timestamp: u64) -> Self {
        Block {
            index,
            previous_hash: previous_hash.into(),
            transactions,
            proof,
            timestamp,
        }
    }

    /// The fixed genesis block, identical across every node.
    pub fn genesis() -> Self {
        Block {
            index: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            timestamp: GENESIS_TIMESTAMP,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// The coinbase transaction, if the block carries one. By convention it
    /// is the last element of a non-empty `transactions` list.
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.last().filter(|tx| tx.is_coinbase())
    }

    /// Transactions subject to proof-of-work verification: everything except
    /// a trailing coinbase reward.
    pub fn pow_transactions(&self) -> &[Transaction] {
        match self.transactions.last() {
            Some(tx) if tx.is_coinbase() => &self.transactions[..self.transactions.len() - 1],
            _ => &self.transactions[..],
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block #{index} [{n} tx(s), proof={proof}, prev={prev}]",
            index = self.index,
            n = self.transactions.len(),
            proof = self.proof,
            prev = self.previous_hash
        )
    }
}
