//! Error types for the decoding pipeline.

use thiserror::Error;

/// Decoder error type
#[derive(Error, Debug)]
pub enum Error {
    /// Input too short to hold a frame header
    #[error("malformed frame: {len} bytes is shorter than the 16-byte header")]
    MalformedFrame {
        /// Length of the rejected input
        len: usize,
    },

    /// A textual capture line was not valid hex
    #[error("invalid frame encoding: {0}")]
    InvalidFrameEncoding(#[from] hex::FromHexError),

    /// Key text could not be decoded
    #[error("invalid key configuration: {0}")]
    InvalidKeyConfiguration(String),

    /// Decoded key is neither AES-128 nor AES-256 sized
    #[error("invalid key length: {0} bytes (expected 16 or 32)")]
    InvalidKeyLength(usize),

    /// Decrypted bytes are not a well-formed application envelope
    #[error("envelope parse error: {0}")]
    EnvelopeParse(String),

    /// An application payload did not match its port's schema
    #[error("{port_name} payload parse error: {reason}")]
    InnerSchema {
        /// Name of the port whose decoder failed
        port_name: &'static str,
        /// Underlying failure
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZeroMQ socket error
    #[error("ZeroMQ error: {0}")]
    Zmq(#[from] zmq::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn inner_schema(port_name: &'static str, reason: impl ToString) -> Self {
        Error::InnerSchema {
            port_name,
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for decoder operations
pub type Result<T> = std::result::Result<T, Error>;
