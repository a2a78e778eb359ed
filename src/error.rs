//! Crate error types.

use thiserror::Error;

use crate::core::domain::{DomainError, OrderRejection};

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("no fee pack published for venue {venue}")]
    MissingFeePack { venue: String },
}

/// Venue adapter errors.
#[derive(Error, Debug, Clone)]
pub enum VenueError {
    /// Recoverable network fault; the connection layer retries these.
    #[error("transport error: {0}")]
    Transport(String),

    /// Synchronous order refusal; never retried by the adapter.
    #[error("order rejected: {0}")]
    Rejected(OrderRejection),

    /// A request exceeded its deadline.
    #[error("venue request timed out")]
    Timeout,

    /// The stream is not connected.
    #[error("not connected")]
    NotConnected,
}

/// Execution engine errors.
#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    /// Unwinding failed to reach net-zero within the retry budget.
    #[error("leg risk: {residual} unhedged contracts remain after {attempts} unwind attempts")]
    LegRisk { residual: i64, attempts: u32 },

    /// The intent's total time budget elapsed before a terminal state.
    #[error("hedge lifetime budget exhausted")]
    BudgetExhausted,
}

/// Top-level crate error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
