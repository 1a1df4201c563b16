//! Common error type for the grid crates.
//!
//! Domain-specific errors (loading, power flow, dispatch) convert into
//! [`GridError`] at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use hq_core::{GridError, GridResult};
//!
//! fn study(dir: &str) -> GridResult<()> {
//!     let network = load_network(dir)?;
//!     run_power_flow(&network)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    /// Reading or writing a data file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV cell, JSON document or timestamp could not be read
    #[error("Parse error: {0}")]
    Parse(String),

    /// The network or its time series cannot be studied as given
    #[error("Validation error: {0}")]
    Validation(String),

    /// A linear system or optimisation backend failed
    #[error("Solver error: {0}")]
    Solver(String),

    /// Unknown solver name or another invalid setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// A line references a bus that is not in the network
    #[error("Network error: {0}")]
    Network(String),

    /// Anything else, including `anyhow` chains from the loaders
    #[error("{0}")]
    Other(String),
}

pub type GridResult<T> = Result<T, GridError>;

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(format!("{err:#}"))
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}
