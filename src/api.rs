// src/api.rs - the node façade (C9): warp filters over the Ledger/KeyStore
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::crypto::KeyStore;
use crate::ledger::Ledger;
use crate::types::Block;

/// Everything a warp filter needs to call into the core: the single
/// mutex-guarded Ledger (SPEC_FULL.md §5), the local wallet (if
/// provisioned), and the on-disk key file path it loads/saves to.
pub struct AppState {
    pub ledger: Mutex<Ledger>,
    pub keystore: Mutex<Option<KeyStore>>,
    pub wallet_path: PathBuf,
    pub rsa_key_bits: usize,
}

pub type SharedState = Arc<AppState>;

fn with_state(state: SharedState) -> impl Filter<Extract = (SharedState,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Builds the full set of routes described in SPEC_FULL.md §6.
pub fn routes(state: SharedState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML));

    let create_wallet = warp::path("wallet")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(create_wallet_handler);

    let load_wallet = warp::path("wallet")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(load_wallet_handler);

    let balance = warp::path("balance")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(balance_handler);

    let transaction = warp::path("transaction")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(transaction_handler);

    let broadcast_transaction = warp::path("broadcast-transaction")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(broadcast_transaction_handler);

    let mine = warp::path("mine")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(mine_handler);

    let broadcast_block = warp::path("broadcast-block")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(broadcast_block_handler);

    let resolve = warp::path("resolve")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(resolve_handler);

    let chain = warp::path("chain")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(chain_handler);

    let add_node = warp::path("node")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(add_node_handler);

    let remove_node = warp::path!("node" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(remove_node_handler);

    let list_nodes = warp::path("nodes")
        .and(warp::get())
        .and(with_state(state))
        .and_then(list_nodes_handler);

    index
        .or(create_wallet)
        .or(load_wallet)
        .or(balance)
        .or(transaction)
        .or(broadcast_transaction)
        .or(mine)
        .or(broadcast_block)
        .or(resolve)
        .or(chain)
        .or(add_node)
        .or(remove_node)
        .or(list_nodes)
}

const INDEX_HTML: &str = "<html><head><title>Pali Coin</title></head><body><h1>Pali Coin node</h1></body></html>";

fn json_status(status: StatusCode, body: serde_json::Value) -> impl Reply {
    warp::reply::with_status(warp::reply::json(&body), status)
}

async fn create_wallet_handler(state: SharedState) -> Result<impl Reply, Rejection> {
    let store = match KeyStore::generate(state.rsa_key_bits) {
        Ok(store) => store,
        Err(e) => {
            error!("wallet generation failed: {e}");
            return Ok(json_status(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })));
        }
    };
    if let Err(e) = store.save(&state.wallet_path) {
        error!("wallet save failed: {e}");
        return Ok(json_status(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })));
    }

    let public_key = store.public_key_hex();
    let private_key = store.private_key_hex().to_string();

    let mut ledger = state.ledger.lock().await;
    ledger.set_public_key(Some(public_key.clone()));
    let funds = ledger.balance(None);
    drop(ledger);

    *state.keystore.lock().await = Some(store);

    info!("created wallet {public_key}");
    Ok(json_status(
        StatusCode::CREATED,
        json!({ "public_key": public_key, "private_key": private_key, "funds": funds }),
    ))
}

async fn load_wallet_handler(state: SharedState) -> Result<impl Reply, Rejection> {
    let store = match KeyStore::load(&state.wallet_path) {
        Ok(store) => store,
        Err(e) => {
            error!("wallet load failed: {e}");
            return Ok(json_status(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })));
        }
    };

    let public_key = store.public_key_hex();
    let private_key = store.private_key_hex().to_string();

    let mut ledger = state.ledger.lock().await;
    ledger.set_public_key(Some(public_key.clone()));
    let funds = ledger.balance(None);
    drop(ledger);

    *state.keystore.lock().await = Some(store);

    Ok(json_status(
        StatusCode::CREATED,
        json!({ "public_key": public_key, "private_key": private_key, "funds": funds }),
    ))
}

async fn balance_handler(state: SharedState) -> Result<impl Reply, Rejection> {
    let ledger = state.ledger.lock().await;
    match ledger.balance(None) {
        Some(funds) => Ok(json_status(StatusCode::OK, json!({ "funds": funds }))),
        None => Ok(json_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "wallet_set_up": false }),
        )),
    }
}

#[derive(Deserialize)]
struct TransactionRequest {
    recipient: String,
    amount: f64,
}

async fn transaction_handler(body: TransactionRequest, state: SharedState) -> Result<impl Reply, Rejection> {
    let keystore = state.keystore.lock().await;
    let Some(store) = keystore.as_ref() else {
        return Ok(json_status(
            StatusCode::BAD_REQUEST,
            json!({ "error": "no wallet set up", "wallet_set_up": false }),
        ));
    };

    let sender = store.public_key_hex();
    let signature = match store.sign(&sender, &body.recipient, body.amount) {
        Ok(sig) => sig,
        Err(e) => {
            error!("signing failed: {e}");
            return Ok(json_status(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })));
        }
    };
    drop(keystore);

    let mut ledger = state.ledger.lock().await;
    let accepted = ledger
        .add_transaction(sender.clone(), body.recipient.clone(), signature.clone(), body.amount, false)
        .await;
    let funds = ledger.balance(None);
    drop(ledger);

    if !accepted {
        return Ok(json_status(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "transaction rejected" })));
    }

    let transaction = json!({
        "sender": sender,
        "recipient": body.recipient,
        "signature": signature,
        "amount": body.amount,
    });
    Ok(json_status(StatusCode::CREATED, json!({ "transaction": transaction, "funds": funds })))
}

#[derive(Deserialize)]
struct BroadcastTransactionRequest {
    sender: String,
    recipient: String,
    amount: f64,
    signature: String,
}

async fn broadcast_transaction_handler(
    body: BroadcastTransactionRequest,
    state: SharedState,
) -> Result<impl Reply, Rejection> {
    let mut ledger = state.ledger.lock().await;
    let accepted = ledger
        .add_transaction(body.sender, body.recipient, body.signature, body.amount, true)
        .await;
    if accepted {
        Ok(json_status(StatusCode::CREATED, json!({ "message": "transaction added" })))
    } else {
        Ok(json_status(StatusCode::BAD_REQUEST, json!({ "error": "invalid transaction" })))
    }
}

async fn mine_handler(state: SharedState) -> Result<impl Reply, Rejection> {
    let mut ledger = state.ledger.lock().await;
    match ledger.mine_block().await {
        Some(block) => {
            let funds = ledger.balance(None);
            Ok(json_status(StatusCode::CREATED, json!({ "block": block, "funds": funds })))
        }
        None => {
            let wallet_set_up = ledger.public_key().is_some();
            Ok(json_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "mining failed", "wallet_set_up": wallet_set_up }),
            ))
        }
    }
}

#[derive(Deserialize)]
struct BroadcastBlockRequest {
    block: Block,
}

async fn broadcast_block_handler(body: BroadcastBlockRequest, state: SharedState) -> Result<impl Reply, Rejection> {
    let mut ledger = state.ledger.lock().await;
    let current_len = ledger.chain().len() as u64;

    if body.block.index < current_len {
        ledger.mark_resolve_needed();
        return Ok(json_status(StatusCode::CONFLICT, json!({ "error": "short chain" })));
    }

    if ledger.add_block(body.block) {
        Ok(json_status(StatusCode::CREATED, json!({ "message": "block added" })))
    } else {
        ledger.mark_resolve_needed();
        Ok(json_status(StatusCode::BAD_REQUEST, json!({ "error": "block rejected, resolve needed" })))
    }
}

async fn resolve_handler(state: SharedState) -> Result<impl Reply, Rejection> {
    let mut ledger = state.ledger.lock().await;
    let replaced = ledger.resolve().await;
    let chain: Vec<Block> = ledger.chain().to_vec();
    Ok(json_status(StatusCode::OK, json!({ "replaced": replaced, "chain": chain })))
}

async fn chain_handler(state: SharedState) -> Result<impl Reply, Rejection> {
    let ledger = state.ledger.lock().await;
    Ok(json_status(StatusCode::OK, json!(ledger.chain())))
}

#[derive(Deserialize)]
struct AddNodeRequest {
    node: String,
}

async fn add_node_handler(body: AddNodeRequest, state: SharedState) -> Result<impl Reply, Rejection> {
    if body.node.trim().is_empty() {
        return Ok(json_status(StatusCode::BAD_REQUEST, json!({ "error": "missing node url" })));
    }
    let mut ledger = state.ledger.lock().await;
    ledger.add_peer_node(body.node.clone());
    let peers = ledger.peers();
    Ok(json_status(StatusCode::CREATED, json!({ "message": "node added", "peers": peers })))
}

async fn remove_node_handler(url: String, state: SharedState) -> Result<impl Reply, Rejection> {
    let mut ledger = state.ledger.lock().await;
    ledger.remove_peer_node(&url);
    let peers = ledger.peers();
    Ok(json_status(StatusCode::OK, json!({ "message": "node removed", "peers": peers })))
}

async fn list_nodes_handler(state: SharedState) -> Result<impl Reply, Rejection> {
    let ledger = state.ledger.lock().await;
    Ok(json_status(StatusCode::OK, json!({ "all_nodes": ledger.peers() })))
}
