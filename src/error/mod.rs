//! Error handling for the Golos client
//!
//! Every fallible operation in this crate returns [`GolosError`]. The variants are split
//! into transient transport failures (the only retryable kind), node-reported domain
//! outcomes, and local validation failures that indicate bad input.

use std::fmt;

/// Result type alias for Golos client operations
pub type Result<T> = std::result::Result<T, GolosError>;

/// Error types for codec, key, assembly and transport operations
#[derive(Debug, Clone, PartialEq)]
pub enum GolosError {
    /// Socket or handshake failure, retried with backoff and node rotation
    Transport(String),
    /// The RPC method has no known namespace, or the node does not serve it
    ApiNotFound(String),
    /// The node could not locate the requested transaction
    TransactionNotFound(String),
    /// The bounded retry budget is exhausted
    RetriesExceeded { attempts: u32, last_error: String },
    /// Operation name is absent from the schema registry
    UnknownOperation(String),
    /// A field required by the operation schema is absent
    MissingField { operation: String, field: String },
    /// A field value does not match its wire type
    Encoding(String),
    /// A numeric value does not fit its wire width
    EncodingOverflow(String),
    /// Malformed WIF or public key text
    InvalidKeyEncoding(String),
    /// Reference block data is missing or malformed
    Assembly(String),
    /// Generic failure reported by the node
    Rpc { code: Option<i64>, message: String },
    /// Response is neither a result nor an error
    Protocol(String),
    /// Explicit interruption; never retried
    Interrupted(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl GolosError {
    /// Only transport failures are worth another attempt on a fresh connection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GolosError::Transport(_))
    }
}

impl fmt::Display for GolosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GolosError::Transport(msg) => write!(f, "Transport error: {msg}"),
            GolosError::ApiNotFound(method) => write!(f, "API not found for method: {method}"),
            GolosError::TransactionNotFound(msg) => write!(f, "Transaction not found: {msg}"),
            GolosError::RetriesExceeded {
                attempts,
                last_error,
            } => write!(
                f,
                "Retries exceeded after {attempts} attempts, last error: {last_error}"
            ),
            GolosError::UnknownOperation(name) => write!(f, "Unknown operation: {name}"),
            GolosError::MissingField { operation, field } => {
                write!(f, "Operation {operation} is missing field '{field}'")
            }
            GolosError::Encoding(msg) => write!(f, "Encoding error: {msg}"),
            GolosError::EncodingOverflow(msg) => write!(f, "Encoding overflow: {msg}"),
            GolosError::InvalidKeyEncoding(msg) => write!(f, "Invalid key encoding: {msg}"),
            GolosError::Assembly(msg) => write!(f, "Transaction assembly error: {msg}"),
            GolosError::Rpc { code, message } => match code {
                Some(code) => write!(f, "RPC error {code}: {message}"),
                None => write!(f, "RPC error: {message}"),
            },
            GolosError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            GolosError::Interrupted(msg) => write!(f, "Interrupted: {msg}"),
            GolosError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            GolosError::Config(msg) => write!(f, "Configuration error: {msg}"),
            GolosError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for GolosError {}

impl From<std::io::Error> for GolosError {
    fn from(err: std::io::Error) -> Self {
        GolosError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GolosError {
    fn from(err: serde_json::Error) -> Self {
        GolosError::Protocol(format!("Invalid JSON: {err}"))
    }
}

impl From<toml::de::Error> for GolosError {
    fn from(err: toml::de::Error) -> Self {
        GolosError::Config(err.to_string())
    }
}

impl From<secp256k1::Error> for GolosError {
    fn from(err: secp256k1::Error) -> Self {
        GolosError::Crypto(err.to_string())
    }
}

impl From<tungstenite::Error> for GolosError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::Interrupted => {
                GolosError::Interrupted(io.to_string())
            }
            other => GolosError::Transport(other.to_string()),
        }
    }
}
