// src/constants.rs - consensus and network constants
use std::time::Duration;

/// Reward paid to the miner of a block's coinbase transaction.
pub const MINING_REWARD: f64 = 10.0;

/// Proof is accepted once the hex SHA-256 digest starts with this prefix.
pub const DIFFICULTY_PREFIX: &str = "00";

/// Sentinel sender string for coinbase transactions.
pub const COINBASE_SENDER: &str = "MINING";

/// Fixed genesis block fields (§3 of the spec).
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_TIMESTAMP: u64 = 0;
pub const GENESIS_PREVIOUS_HASH: &str = "";

/// Default HTTP façade bind address and port.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Default RSA key size; legacy value, kept for on-disk key compatibility (see DESIGN.md).
pub const DEFAULT_RSA_KEY_BITS: usize = 1024;

/// Default per-peer HTTP request timeout so a single unresponsive peer cannot
/// stall a broadcast fan-out or a resolve sweep.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default snapshot/key file directory, relative to the current working directory.
pub const DEFAULT_DATA_DIR: &str = ".";
