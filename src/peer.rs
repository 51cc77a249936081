// src/peer.rs - outbound RPCs to peer nodes (C8)
use std::future::Future;
use std::time::Duration;

use log::warn;
use serde_json::json;

use crate::error::{LedgerError, Result};
use crate::types::{Block, Transaction};

/// Thin wrapper around an async HTTP client. The façade (src/api.rs) calls
/// into the Ledger from tokio's multi-threaded runtime, so peer RPCs are
/// awaited in place rather than blocking a worker thread (SPEC_FULL.md §5:
/// "the HTTP façade itself runs on a tokio multi-threaded runtime").
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with a timeout always builds");
        PeerClient { http }
    }

    /// `POST {peer}/broadcast-transaction`. Returns the HTTP status code on
    /// any response; only connection-level failures are `Err`.
    pub async fn broadcast_transaction(&self, peer: &str, tx: &Transaction) -> Result<u16> {
        let url = format!("http://{peer}/broadcast-transaction");
        let body = json!({
            "sender": tx.sender,
            "recipient": tx.recipient,
            "amount": tx.amount,
            "signature": tx.signature,
        });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::peer(format!("{peer}: {e}")))?;
        Ok(response.status().as_u16())
    }

    /// `POST {peer}/broadcast-block`.
    pub async fn broadcast_block(&self, peer: &str, block: &Block) -> Result<u16> {
        let url = format!("http://{peer}/broadcast-block");
        let body = json!({ "block": block });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::peer(format!("{peer}: {e}")))?;
        Ok(response.status().as_u16())
    }

    /// `GET {peer}/chain` — returns the peer's full chain.
    pub async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>> {
        let url = format!("http://{peer}/chain");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::peer(format!("{peer}: {e}")))?;
        response
            .json::<Vec<Block>>()
            .await
            .map_err(|e| LedgerError::peer(format!("{peer}: malformed chain response: {e}")))
    }
}

/// Fans `f` out over every peer, logging and skipping connection failures.
/// Returns the per-peer results that did complete (success or HTTP error
/// status), in peer iteration order.
pub async fn fan_out<T, F>(peers: &[String], f: impl Fn(&str) -> F) -> Vec<(String, T)>
where
    F: Future<Output = Result<T>>,
{
    let mut results = Vec::new();
    for peer in peers {
        match f(peer).await {
            Ok(value) => results.push((peer.clone(), value)),
            Err(e) => warn!("peer {peer} unreachable: {e}"),
        }
    }
    results
}
