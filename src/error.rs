//! Error types for the relay client and community service.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by event construction, publishing and querying.
///
/// Validation, moderation and key errors fail fast before any network call.
/// An ambiguous publish (no relay feedback within the budget) is not an error;
/// see [`crate::publish::PublishOutcome::timeout`].
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// The signing secret cannot produce a public key.
    #[error("Invalid private key")]
    InvalidSecret,

    /// The declared author does not match the key derived from the secret.
    #[error("Invalid key pair")]
    KeyMismatch,

    /// Content refused by the moderation gate.
    #[error("Content rejected: {0}")]
    Moderation(String),

    /// A relay explicitly refused the event before any acceptance or timeout.
    #[error("relay {relay} rejected event: {reason}")]
    RelayRejected { relay: String, reason: String },

    /// Event id or signature does not verify.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Signature library error.
    #[error("signature error: {0}")]
    Signature(#[from] secp256k1::Error),

    /// Hex decoding error.
    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// SOCKS proxy error.
    #[error("proxy error: {0}")]
    Proxy(#[from] tokio_socks::Error),

    /// Relay URL could not be parsed.
    #[error("invalid relay url: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned relay task panicked or was aborted.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True for errors caused by the caller's input rather than the network.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::InvalidSecret | Error::KeyMismatch | Error::Moderation(_)
        )
    }
}
