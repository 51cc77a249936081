// src/hash.rs - canonical encoding and digests (C1)
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use sha3::Sha3_512;

use crate::types::Block;

/// SHA3-512 digest of `str(sender) + str(recipient) + str(amount)`, UTF-8
/// encoded. This is the byte string that gets signed and verified; the
/// `amount` rendering is fixed to `f64::to_string()` (see SPEC_FULL.md §4.1
/// and §9) so the signer and verifier agree bit-exactly.
pub fn hash_transaction_fields(sender: &str, recipient: &str, amount: f64) -> [u8; 64] {
    let payload = format!("{sender}{recipient}{}", amount_to_string(amount));
    let digest = Sha3_512::digest(payload.as_bytes());
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest);
    out
}

pub fn hash_transaction_fields_hex(sender: &str, recipient: &str, amount: f64) -> String {
    hex::encode(hash_transaction_fields(sender, recipient, amount))
}

/// Fixed decimal rendering used everywhere `str(amount)` appears in a
/// hashed or signed payload.
pub fn amount_to_string(amount: f64) -> String {
    amount.to_string()
}

/// Hex SHA3-512 of the block, serialised as JSON with top-level keys sorted
/// lexicographically and `transactions` rendered as a list of canonical
/// ordered dicts (`sender, recipient, signature, amount`).
pub fn hash_block(block: &Block) -> String {
    let digest = Sha3_512::digest(canonical_block_json(block).as_bytes());
    hex::encode(digest)
}

/// Builds the exact JSON text `hash_block` hashes. Exposed separately so
/// tests (and S1 in particular) can assert on the serialised form itself.
pub fn canonical_block_json(block: &Block) -> String {
    let mut obj = Map::new();
    obj.insert("index".to_string(), json!(block.index));
    obj.insert("previous_hash".to_string(), json!(block.previous_hash));
    obj.insert("proof".to_string(), json!(block.proof));
    obj.insert("timestamp".to_string(), json!(block.timestamp));
    obj.insert(
        "transactions".to_string(),
        serde_json::to_value(&block.transactions).expect("transactions always serialise"),
    );
    Value::Object(obj).to_string()
}

/// SHA-256 (hex) of `str(transactions) + str(last_hash) + str(proof)`, the
/// proof-of-work input. `transactions` is rendered the same way as inside
/// `hash_block`: canonical ordered dicts, in a JSON array.
pub fn proof_of_work_hash(transactions_json: &str, last_hash: &str, proof: u64) -> String {
    let payload = format!("{transactions_json}{last_hash}{proof}");
    hex::encode(Sha256::digest(payload.as_bytes()))
}
