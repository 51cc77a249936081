// src/config.rs - layered node configuration (C10)
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_DATA_DIR, DEFAULT_PEER_TIMEOUT, DEFAULT_PORT,
    DEFAULT_RSA_KEY_BITS, MINING_REWARD,
};
use crate::error::{LedgerError, Result};

/// Everything a running node needs, assembled from three layers (lowest to
/// highest precedence): compiled-in defaults, an optional TOML file, then
/// CLI flag overrides. Unlike the teacher's `PaliConfig` there is no nested
/// network/mining/security/database/wallet sub-config — this node has none
/// of those concerns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub bind_address: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Defaults to `port.to_string()` if left unset in every layer.
    pub node_id: Option<String>,
    pub mining_reward: f64,
    pub rsa_key_bits: usize,
    #[serde(with = "duration_secs")]
    pub peer_request_timeout: Duration,
    pub peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            node_id: None,
            mining_reward: MINING_REWARD,
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            peer_request_timeout: DEFAULT_PEER_TIMEOUT,
            peers: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Layer 2: read an optional TOML file, falling back to defaults when
    /// it doesn't exist. A present-but-malformed file is a hard error — the
    /// spec treats this as a startup-time `LedgerError::Config` (§7).
    pub fn load_file(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(NodeConfig::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| LedgerError::config(format!("parsing {}: {e}", path.display())))
    }

    /// The config file searched for when no `--config` flag is given:
    /// `pali-coin.toml` in the current directory, falling back to a
    /// `dirs`-resolved config-home path.
    pub fn default_file_path() -> PathBuf {
        let cwd_candidate = PathBuf::from("pali-coin.toml");
        if cwd_candidate.exists() {
            return cwd_candidate;
        }
        dirs::config_dir()
            .map(|dir| dir.join("pali-coin").join("config.toml"))
            .unwrap_or(cwd_candidate)
    }

    /// Layer 3: apply CLI overrides on top of whatever file/default layer
    /// produced `self`. Only flags the user actually passed take effect.
    pub fn apply_cli(mut self, args: &CliArgs) -> Self {
        if let Some(bind_address) = &args.bind_address {
            self.bind_address = bind_address.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(data_dir) = &args.data_dir {
            self.data_dir = data_dir.clone();
        }
        if let Some(node_id) = &args.node_id {
            self.node_id = Some(node_id.clone());
        }
        if let Some(mining_reward) = args.mining_reward {
            self.mining_reward = mining_reward;
        }
        if let Some(rsa_key_bits) = args.rsa_key_bits {
            self.rsa_key_bits = rsa_key_bits;
        }
        if let Some(timeout_secs) = args.peer_timeout_secs {
            self.peer_request_timeout = Duration::from_secs(timeout_secs);
        }
        for peer in &args.peer {
            if !self.peers.contains(peer) {
                self.peers.push(peer.clone());
            }
        }
        self
    }

    /// Resolves the effective node id: the explicit value if set, otherwise
    /// the bound port rendered as a string (SPEC_FULL.md §3 "Node identity").
    pub fn resolved_node_id(&self) -> String {
        self.node_id.clone().unwrap_or_else(|| self.port.to_string())
    }

    pub fn bound_address(&self) -> Result<Ipv4Addr> {
        self.bind_address
            .parse()
            .map_err(|e| LedgerError::config(format!("invalid bind_address {:?}: {e}", self.bind_address)))
    }

    /// Rejects configurations that would fail at startup in a confusing
    /// way (port 0, a zero-length key size) rather than letting them
    /// surface as an opaque bind or keygen error later.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(LedgerError::config("port must be nonzero"));
        }
        if self.rsa_key_bits < 512 {
            return Err(LedgerError::config("rsa_key_bits must be at least 512"));
        }
        if self.mining_reward < 0.0 {
            return Err(LedgerError::config("mining_reward must not be negative"));
        }
        Ok(())
    }

    /// Full three-layer load: defaults -> file (explicit path, or the
    /// default search path) -> CLI overrides.
    pub fn load(args: CliArgs) -> Result<Self> {
        let file_path = args
            .config
            .clone()
            .unwrap_or_else(NodeConfig::default_file_path);
        let config = NodeConfig::load_file(&file_path)?.apply_cli(&args);
        config.validate()?;
        Ok(config)
    }
}

/// CLI overrides, layered on top of defaults/file config (§4.8). Shared by
/// both binaries; `pali-cli` only uses the subset that affects the
/// in-process Ledger (`data_dir`, `node_id`, `mining_reward`, `rsa_key_bits`).
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pali-node", about = "A peer-to-peer replicated ledger node")]
pub struct CliArgs {
    /// Path to a TOML config file; defaults to ./pali-coin.toml or a
    /// dirs-resolved config path if neither is present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP façade bind address.
    #[arg(long)]
    pub bind_address: Option<String>,

    /// HTTP façade port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory holding the snapshot and key files.
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Node id used to namespace the snapshot file; defaults to the port.
    #[arg(long)]
    pub node_id: Option<String>,

    /// Coinbase reward paid per mined block.
    #[arg(long)]
    pub mining_reward: Option<f64>,

    /// RSA key size in bits for newly generated wallets.
    #[arg(long)]
    pub rsa_key_bits: Option<usize>,

    /// Per-peer HTTP request timeout, in seconds.
    #[arg(long)]
    pub peer_timeout_secs: Option<u64>,

    /// A peer to register at startup (`host:port`); may be repeated.
    #[arg(long = "peer", value_name = "HOST:PORT")]
    pub peer: Vec<String>,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.resolved_node_id(), DEFAULT_PORT.to_string());
    }

    #[test]
    fn node_id_falls_back_to_port() {
        let mut config = NodeConfig::default();
        config.port = 5001;
        assert_eq!(config.resolved_node_id(), "5001");
        config.node_id = Some("custom".to_string());
        assert_eq!(config.resolved_node_id(), "custom");
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = NodeConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_layer_then_cli_layer_overrides_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pali-coin.toml");
        std::fs::write(&path, "port = 6000\nmining_reward = 25.0\n").unwrap();

        let from_file = NodeConfig::load_file(&path).unwrap();
        assert_eq!(from_file.port, 6000);
        assert_eq!(from_file.mining_reward, 25.0);

        let args = CliArgs {
            port: Some(7000),
            ..Default::default()
        };
        let layered = from_file.apply_cli(&args);
        assert_eq!(layered.port, 7000); // CLI wins over file
        assert_eq!(layered.mining_reward, 25.0); // file wins over default
    }

    #[test]
    fn missing_file_degrades_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let config = NodeConfig::load_file(&path).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
