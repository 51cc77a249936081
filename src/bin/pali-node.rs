// src/bin/pali-node.rs - HTTP node binary (C9 entry point)
use std::sync::Arc;

use clap::Parser;
use log::info;
use tokio::sync::Mutex;

use pali_coin::api::{routes, AppState};
use pali_coin::config::{CliArgs, NodeConfig};
use pali_coin::ledger::Ledger;

#[tokio::main]
async fn main() {
    pali_coin::init_logging();

    let args = CliArgs::parse();
    let config = match NodeConfig::load(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let node_id = config.resolved_node_id();
    std::fs::create_dir_all(&config.data_dir).expect("data directory must be creatable");

    let mut ledger = Ledger::load(
        node_id.clone(),
        config.data_dir.clone(),
        config.mining_reward,
        config.peer_request_timeout,
    );
    for peer in &config.peers {
        ledger.add_peer_node(peer.clone());
    }

    let wallet_path = config.data_dir.join(format!("wallet-{node_id}.txt"));
    let state = Arc::new(AppState {
        ledger: Mutex::new(ledger),
        keystore: Mutex::new(None),
        wallet_path,
        rsa_key_bits: config.rsa_key_bits,
    });

    let bind_address = config.bound_address().expect("bind address was validated at config load");
    info!("starting pali-coin node {node_id} on {bind_address}:{}", config.port);

    warp::serve(routes(state)).run((bind_address, config.port)).await;
}
