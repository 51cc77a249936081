// src/lib.rs - Pali Coin: a peer-to-peer replicated ledger node
//!
//! Core consensus and replication subsystem for a single node: a
//! hash-chained, proof-of-work-mined, RSA-signed ledger that gossips
//! transactions and blocks to a configured peer set and resolves
//! divergence by adopting the longest verified chain.

pub mod api;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod peer;
pub mod snapshot;
pub mod types;
pub mod verify;

pub use config::{CliArgs, NodeConfig};
pub use crypto::KeyStore;
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use types::{Block, Transaction};

/// Crate version, exposed for `--version` output and the HTTP index page.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initializes the `log`/`env_logger` facade once at process startup.
/// Library code never calls this itself — only the binaries do, matching
/// the source's practice of leaving logging initialization to the entry
/// point (SPEC_FULL.md §4.11).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

pub fn init_logging_with_level(level: log::LevelFilter) {
    env_logger::Builder::from_default_env().filter_level(level).init();
}
