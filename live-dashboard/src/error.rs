//! Dashboard error types

use live_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// REST or session failure
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DashboardResult<T> = Result<T, DashboardError>;
