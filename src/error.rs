// src/error.rs - error handling for Pali Coin
use thiserror::Error;

/// Result type alias for Pali Coin operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Main error type for Pali Coin operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("transaction validation failed: {0}")]
    TransactionValidation(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("block validation failed: {0}")]
    BlockValidation(String),

    #[error("proof of work validation failed: {0}")]
    ProofOfWork(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("peer request failed: {0}")]
    Peer(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

impl LedgerError {
    pub fn transaction_validation<S: Into<String>>(msg: S) -> Self {
        LedgerError::TransactionValidation(msg.into())
    }

    pub fn insufficient_funds<S: Into<String>>(msg: S) -> Self {
        LedgerError::InsufficientFunds(msg.into())
    }

    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        LedgerError::Crypto(msg.into())
    }

    pub fn wallet<S: Into<String>>(msg: S) -> Self {
        LedgerError::Wallet(msg.into())
    }

    pub fn peer<S: Into<String>>(msg: S) -> Self {
        LedgerError::Peer(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        LedgerError::Config(msg.into())
    }

    /// Category used for log lines and, where relevant, HTTP error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            LedgerError::TransactionValidation(_)
            | LedgerError::InsufficientFunds(_)
            | LedgerError::BlockValidation(_)
            | LedgerError::ProofOfWork(_)
            | LedgerError::InvalidSignature(_) => "validation",
            LedgerError::Crypto(_) => "crypto",
            LedgerError::Wallet(_) => "wallet",
            LedgerError::Peer(_) => "peer",
            LedgerError::Config(_) => "config",
            LedgerError::Io(_) => "io",
            LedgerError::Json(_) => "serialization",
            LedgerError::HexDecode(_) => "serialization",
        }
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            LedgerError::TransactionValidation(_)
                | LedgerError::InsufficientFunds(_)
                | LedgerError::BlockValidation(_)
                | LedgerError::ProofOfWork(_)
                | LedgerError::InvalidSignature(_)
        )
    }

    pub fn is_peer_error(&self) -> bool {
        matches!(self, LedgerError::Peer(_))
    }
}
