// src/crypto.rs - KeyStore / Signer (C2)
use std::fs;
use std::path::Path;

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::error::{LedgerError, Result};
use crate::hash::hash_transaction_fields;
use crate::types::Transaction;

/// Holds one node's RSA keypair and performs the signing/verification
/// operations the spec assigns to the KeyStore/Signer component.
///
/// Signatures are PKCS#1 v1.5 over the raw SHA3-512 digest (no DigestInfo
/// OID prefix): this node never needs to interoperate with the Python
/// original bit-for-bit (see SPEC_FULL.md §9), and the unprefixed scheme
/// avoids depending on SHA3 OID support in the padding implementation.
pub struct KeyStore {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl KeyStore {
    /// Generates a fresh RSA keypair. `bits` defaults to 1024 (legacy, see
    /// SPEC_FULL.md §9) but is configurable via `NodeConfig::rsa_key_bits`.
    pub fn generate(bits: usize) -> Result<Self> {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| LedgerError::crypto(format!("RSA keygen failed: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(KeyStore { private_key, public_key })
    }

    /// Two-line text file: private key first, public key second, both
    /// hex-encoded PKCS#1 DER.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = format!("{}\n{}\n", self.private_key_hex(), self.public_key_hex());
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut lines = contents.lines();
        let private_hex = lines
            .next()
            .ok_or_else(|| LedgerError::wallet("key file is missing the private key line"))?;
        let public_hex = lines
            .next()
            .ok_or_else(|| LedgerError::wallet("key file is missing the public key line"))?;

        let private_der = hex::decode(private_hex)?;
        let public_der = hex::decode(public_hex)?;
        let private_key = RsaPrivateKey::from_pkcs1_der(&private_der)
            .map_err(|e| LedgerError::crypto(format!("invalid private key: {e}")))?;
        let public_key = RsaPublicKey::from_pkcs1_der(&public_der)
            .map_err(|e| LedgerError::crypto(format!("invalid public key: {e}")))?;
        Ok(KeyStore { private_key, public_key })
    }

    pub fn public_key_hex(&self) -> String {
        let der = self.public_key.to_pkcs1_der().expect("public key always encodes");
        hex::encode(der.as_bytes())
    }

    /// Returned to callers (the `/wallet` façade endpoint echoes it back);
    /// zeroized as soon as the caller drops its copy, matching the spec's
    /// acknowledgement that key storage here is not meant to be secure.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        let der = self
            .private_key
            .to_pkcs1_der()
            .expect("private key always encodes");
        Zeroizing::new(hex::encode(der.as_bytes()))
    }

    /// Signs `(sender, recipient, amount)` with this store's private key.
    /// `sender` is expected to equal `self.public_key_hex()`.
    pub fn sign(&self, sender: &str, recipient: &str, amount: f64) -> Result<String> {
        let digest = hash_transaction_fields(sender, recipient, amount);
        let signature = self
            .private_key
            .sign(Pkcs1v15Sign::new_unprefixed(), &digest)
            .map_err(|e| LedgerError::crypto(format!("signing failed: {e}")))?;
        Ok(hex::encode(signature))
    }
}

/// Verifies a transaction's signature under its own `sender` public key.
/// Coinbase transactions (`sender == "MINING"`) are never passed here by
/// the Ledger; callers must skip the check for them explicitly.
pub fn verify_signature(tx: &Transaction) -> bool {
    let public_der = match hex::decode(&tx.sender) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let public_key = match RsaPublicKey::from_pkcs1_der(&public_der) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = match hex::decode(&tx.signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let digest = hash_transaction_fields(&tx.sender, &tx.recipient, tx.amount);
    public_key
        .verify(Pkcs1v15Sign::new_unprefixed(), &digest, &signature)
        .is_ok()
}
