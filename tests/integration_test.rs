// tests/integration_test.rs - end-to-end exercise of the HTTP façade (C9)
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pali_coin::api::{routes, AppState};
use pali_coin::ledger::Ledger;
use tempfile::TempDir;
use tokio::sync::Mutex;
use warp::http::StatusCode;

fn fresh_state(node_id: &str) -> (TempDir, Arc<AppState>) {
    let dir = TempDir::new().unwrap();
    let data_dir: PathBuf = dir.path().to_path_buf();
    let ledger = Ledger::load(node_id.to_string(), data_dir.clone(), 10.0, Duration::from_millis(200));
    let state = Arc::new(AppState {
        ledger: Mutex::new(ledger),
        keystore: Mutex::new(None),
        wallet_path: data_dir.join(format!("wallet-{node_id}.txt")),
        rsa_key_bits: 1024,
    });
    (dir, state)
}

#[tokio::test]
async fn s1_genesis_chain_via_http() {
    let (_dir, state) = fresh_state("5000");
    let filter = routes(state);

    let resp = warp::test::request().method("GET").path("/chain").reply(&filter).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let chain: Vec<serde_json::Value> = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0]["index"], 0);
    assert_eq!(chain[0]["proof"], 100);
}

#[tokio::test]
async fn s2_mine_on_empty_mempool_pays_coinbase() {
    let (_dir, state) = fresh_state("5001");
    let filter = routes(state);

    let wallet_resp = warp::test::request().method("POST").path("/wallet").reply(&filter).await;
    assert_eq!(wallet_resp.status(), StatusCode::CREATED);

    let mine_resp = warp::test::request().method("POST").path("/mine").reply(&filter).await;
    assert_eq!(mine_resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = serde_json::from_slice(mine_resp.body()).unwrap();
    assert_eq!(body["funds"], 10.0);
    assert_eq!(body["block"]["index"], 1);
    assert_eq!(body["block"]["transactions"].as_array().unwrap().len(), 1);

    let balance_resp = warp::test::request().method("GET").path("/balance").reply(&filter).await;
    assert_eq!(balance_resp.status(), StatusCode::OK);
    let balance: serde_json::Value = serde_json::from_slice(balance_resp.body()).unwrap();
    assert_eq!(balance["funds"], 10.0);
}

#[tokio::test]
async fn s3_insufficient_funds_returns_500_and_mempool_stays_empty() {
    let (_dir, state) = fresh_state("5002");
    let filter = routes(state.clone());

    warp::test::request().method("POST").path("/wallet").reply(&filter).await;

    let resp = warp::test::request()
        .method("POST")
        .path("/transaction")
        .json(&serde_json::json!({ "recipient": "alice", "amount": 5.0 }))
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let ledger = state.ledger.lock().await;
    assert!(ledger.mempool().is_empty());
}

#[tokio::test]
async fn balance_without_wallet_is_500() {
    let (_dir, state) = fresh_state("5003");
    let filter = routes(state);
    let resp = warp::test::request().method("GET").path("/balance").reply(&filter).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["wallet_set_up"], false);
}

#[tokio::test]
async fn mine_after_spend_updates_balances() {
    let (_dir, state) = fresh_state("5004");
    let filter = routes(state.clone());

    warp::test::request().method("POST").path("/wallet").reply(&filter).await;
    warp::test::request().method("POST").path("/mine").reply(&filter).await;

    let tx_resp = warp::test::request()
        .method("POST")
        .path("/transaction")
        .json(&serde_json::json!({ "recipient": "alice", "amount": 3.0 }))
        .reply(&filter)
        .await;
    assert_eq!(tx_resp.status(), StatusCode::CREATED);

    let mine_resp = warp::test::request().method("POST").path("/mine").reply(&filter).await;
    assert_eq!(mine_resp.status(), StatusCode::CREATED);

    let chain_resp = warp::test::request().method("GET").path("/chain").reply(&filter).await;
    let chain: Vec<serde_json::Value> = serde_json::from_slice(chain_resp.body()).unwrap();
    assert_eq!(chain.len(), 3); // genesis + first mine + second mine
}

#[tokio::test]
async fn node_management_roundtrip() {
    let (_dir, state) = fresh_state("5005");
    let filter = routes(state);

    let add_resp = warp::test::request()
        .method("POST")
        .path("/node")
        .json(&serde_json::json!({ "node": "127.0.0.1:5006" }))
        .reply(&filter)
        .await;
    assert_eq!(add_resp.status(), StatusCode::CREATED);

    let list_resp = warp::test::request().method("GET").path("/nodes").reply(&filter).await;
    assert_eq!(list_resp.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(list_resp.body()).unwrap();
    assert_eq!(body["all_nodes"].as_array().unwrap().len(), 1);

    let remove_resp = warp::test::request()
        .method("DELETE")
        .path("/node/127.0.0.1:5006")
        .reply(&filter)
        .await;
    assert_eq!(remove_resp.status(), StatusCode::OK);

    let list_resp = warp::test::request().method("GET").path("/nodes").reply(&filter).await;
    let body: serde_json::Value = serde_json::from_slice(list_resp.body()).unwrap();
    assert_eq!(body["all_nodes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn broadcast_transaction_with_bad_signature_is_rejected() {
    let (_dir, state) = fresh_state("5007");
    let filter = routes(state);

    let resp = warp::test::request()
        .method("POST")
        .path("/broadcast-transaction")
        .json(&serde_json::json!({
            "sender": "not-a-real-key",
            "recipient": "alice",
            "amount": 1.0,
            "signature": "bad",
        }))
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn broadcast_block_with_stale_index_returns_409() {
    let (_dir, state) = fresh_state("5008");
    let filter = routes(state.clone());

    let block = { state.ledger.lock().await.chain()[0].clone() };
    let resp = warp::test::request()
        .method("POST")
        .path("/broadcast-block")
        .json(&serde_json::json!({ "block": block }))
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn broadcast_transaction_with_coinbase_sender_is_rejected() {
    let (_dir, state) = fresh_state("5010");
    let filter = routes(state.clone());

    let resp = warp::test::request()
        .method("POST")
        .path("/broadcast-transaction")
        .json(&serde_json::json!({
            "sender": "MINING",
            "recipient": "attacker-key",
            "amount": 1_000_000_000.0,
            "signature": "",
        }))
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let ledger = state.ledger.lock().await;
    assert!(ledger.mempool().is_empty());
}

#[tokio::test]
async fn resolve_with_no_peers_reports_no_replacement() {
    let (_dir, state) = fresh_state("5009");
    let filter = routes(state);
    let resp = warp::test::request().method("POST").path("/resolve").reply(&filter).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["replaced"], false);
}
