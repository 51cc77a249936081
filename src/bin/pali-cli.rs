// src/bin/pali-cli.rs - interactive menu front-end (C12), in-process Ledger
use std::io::{self, Write};

use clap::Parser;
use log::{error, info};

use pali_coin::config::{CliArgs, NodeConfig};
use pali_coin::crypto::KeyStore;
use pali_coin::ledger::Ledger;
use pali_coin::verify::verify_open_transactions;

fn prompt(label: &str) -> String {
    print!("{label}");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().read_line(&mut line).expect("stdin read failed");
    line.trim().to_string()
}

#[tokio::main(flavor = "current_thread")]
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
    let store = match KeyStore::load(&wallet_path) {
        Ok(store) => store,
        Err(_) => {
            let store = KeyStore::generate(config.rsa_key_bits).expect("key generation must succeed");
            store.save(&wallet_path).expect("wallet save must succeed");
            store
        }
    };
    let public_key = store.public_key_hex();
    ledger.set_public_key(Some(public_key.clone()));
    info!("node {node_id} ready, wallet {public_key}");

    loop {
        println!("Please choose");
        println!("1: Add a new transaction value");
        println!("2: Mine a new block");
        println!("3: Output the blockchain blocks");
        println!("4: Check open transaction validity");
        println!("q: Quit");

        match prompt("Your choice: ").as_str() {
            "1" => {
                let recipient = prompt("Enter the recipient of the transaction: ");
                let amount: f64 = match prompt("Your transaction amount please: ").parse() {
                    Ok(amount) => amount,
                    Err(_) => {
                        println!("Invalid amount, transaction failed!");
                        continue;
                    }
                };
                let signature = match store.sign(&public_key, &recipient, amount) {
                    Ok(sig) => sig,
                    Err(e) => {
                        error!("signing failed: {e}");
                        println!("Transaction failed!");
                        continue;
                    }
                };
                if ledger.add_transaction(public_key.clone(), recipient, signature, amount, false).await {
                    println!("Added transaction!");
                } else {
                    println!("Transaction failed!");
                }
                println!("{:?}", ledger.mempool());
            }
            "2" => {
                match ledger.mine_block().await {
                    Some(block) => println!("Mined block #{}", block.index),
                    None => println!("Mining failed!"),
                }
            }
            "3" => {
                for block in ledger.chain() {
                    println!("Outputting Block");
                    println!("{block}");
                }
                println!("{}", "-".repeat(20));
            }
            "4" => {
                if verify_open_transactions(ledger.mempool(), |p| ledger.balance(Some(p)).unwrap_or(0.0)) {
                    println!("All transactions are valid!");
                } else {
                    println!("There are invalid transactions!");
                }
            }
            "q" => break,
            _ => println!("Input was invalid, please pick a value from the list!"),
        }

        if !pali_coin::verify::verify_chain(ledger.chain()) {
            for block in ledger.chain() {
                println!("Outputting Block");
                println!("{block}");
            }
            println!("Invalid blockchain!");
            break;
        }

        println!("Balance of {public_key} is {:6.2}", ledger.balance(None).unwrap_or(0.0));
    }
}
