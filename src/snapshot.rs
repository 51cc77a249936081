// src/snapshot.rs - durable snapshot store (C7)
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::Result;
use crate::types::{Block, Transaction};

/// In-memory view of everything the snapshot file persists.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotData {
    pub chain: Vec<Block>,
    pub mempool: Vec<Transaction>,
    pub peers: HashSet<String>,
}

impl SnapshotData {
    pub fn fresh() -> Self {
        SnapshotData {
            chain: vec![Block::genesis()],
            mempool: Vec::new(),
            peers: HashSet::new(),
        }
    }
}

/// Snapshot file path for a given node, e.g. `blockchain-5000.txt`.
pub fn snapshot_path(data_dir: &Path, node_id: &str) -> PathBuf {
    data_dir.join(format!("blockchain-{node_id}.txt"))
}

/// Writes the three-line snapshot. Not atomic: a crash mid-write can
/// corrupt the file (SPEC_FULL.md §9 — this is documented legacy behaviour,
/// not an oversight).
pub fn save(path: impl AsRef<Path>, data: &SnapshotData) -> Result<()> {
    let peers: Vec<&String> = data.peers.iter().collect();
    let contents = format!(
        "{}\n{}\n{}\n",
        serde_json::to_string(&data.chain)?,
        serde_json::to_string(&data.mempool)?,
        serde_json::to_string(&peers)?,
    );
    std::fs::write(path, contents)?;
    Ok(())
}

/// Parses the three-line snapshot. Returns an error on a missing file,
/// short file, or malformed JSON; callers that want the spec's "degrade
/// silently" behaviour should use [`load_or_default`] instead.
pub fn load(path: impl AsRef<Path>) -> Result<SnapshotData> {
    let contents = std::fs::read_to_string(path)?;
    let mut lines = contents.lines();

    let chain_line = lines
        .next()
        .ok_or_else(|| crate::error::LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "snapshot missing chain line",
        )))?;
    let mempool_line = lines
        .next()
        .ok_or_else(|| crate::error::LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "snapshot missing mempool line",
        )))?;
    let peers_line = lines
        .next()
        .ok_or_else(|| crate::error::LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "snapshot missing peers line",
        )))?;

    let chain: Vec<Block> = serde_json::from_str(chain_line)?;
    let mempool: Vec<Transaction> = serde_json::from_str(mempool_line)?;
    let peers_vec: Vec<String> = serde_json::from_str(peers_line)?;

    Ok(SnapshotData {
        chain,
        mempool,
        peers: peers_vec.into_iter().collect(),
    })
}

/// Loads the snapshot, falling back to `[genesis], [], ∅` on any failure
/// (missing file, short file, parse error) as the spec mandates.
pub fn load_or_default(path: impl AsRef<Path>) -> SnapshotData {
    match load(&path) {
        Ok(data) => data,
        Err(e) => {
            warn!("snapshot load failed, starting from genesis: {e}");
            SnapshotData::fresh()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip() {
        let dir = tempdir().unwrap();
        let path = snapshot_path(dir.path(), "5000");

        let mut data = SnapshotData::fresh();
        data.mempool.push(Transaction::new("alice", "bob", "sig", 1.0));
        data.peers.insert("127.0.0.1:5001".to_string());

        save(&path, &data).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn missing_file_degrades_to_fresh_state() {
        let dir = tempdir().unwrap();
        let path = snapshot_path(dir.path(), "does-not-exist");
        let data = load_or_default(&path);
        assert_eq!(data, SnapshotData::fresh());
    }

    #[test]
    fn truncated_file_degrades_to_fresh_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.txt");
        std::fs::write(&path, "[]\n").unwrap();
        let data = load_or_default(&path);
        assert_eq!(data, SnapshotData::fresh());
    }
}
