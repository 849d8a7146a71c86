//! Error handling for the ledger
//!
//! Every fallible operation in the crate returns [`Result`]. Nothing is
//! swallowed on the way up: the CLI decides how to report each variant.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error taxonomy for chain, transaction and wallet operations
#[derive(Debug, Clone)]
pub enum BlockchainError {
    /// A chain already exists at the target location (genesis creation is a no-op)
    AlreadyExists,
    /// No chain has been created yet, or a required key is missing
    NotFound(String),
    /// Transfer request exceeds the spendable total of the sender
    InsufficientFunds { required: f64, available: f64 },
    /// Underlying persistence failure: I/O, corruption, aborted transaction
    Database(String),
    /// Malformed persisted block or transaction
    Decode(String),
    /// Encoding failure
    Serialization(String),
    /// Transaction construction errors
    Transaction(String),
    /// Block construction errors
    InvalidBlock(String),
    /// Invalid address format
    InvalidAddress(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Wallet operation errors
    Wallet(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::AlreadyExists => write!(f, "Blockchain already exists"),
            BlockchainError::NotFound(msg) => write!(f, "Not found: {msg}"),
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Decode(msg) => write!(f, "Decode error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Wallet(msg) => write!(f, "Wallet error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Decode(err.to_string())
    }
}
