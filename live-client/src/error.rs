//! Client error types

use thiserror::Error;

/// REST client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session storage error
    #[error("Session error: {0}")]
    Session(String),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// WebSocket transport error type
#[derive(Debug, Error)]
pub enum TransportError {
    /// No bearer token in the session
    #[error("Missing auth token")]
    MissingToken,

    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Underlying WebSocket failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
