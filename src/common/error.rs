//! Error Types.
//!
//! `AxiError` is the single outcome type carried by every completion handle
//! and returned by submission calls. `ConfigError` covers loading and
//! validating the TOML configuration.

use std::io;

use thiserror::Error;

use super::data::Direction;

/// Failure outcome of an AXI operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AxiError {
    /// A submission argument is out of range. Nothing was enqueued.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A response beat arrived for an ID with no outstanding bursts.
    ///
    /// This is a protocol violation by the bus or slave and is fatal to the
    /// engine until it is reset.
    #[error("unexpected {direction} response for ID {id} with no outstanding bursts")]
    UnexpectedResponseId { direction: Direction, id: u32 },

    /// The operation was discarded by a reset before it completed.
    #[error("operation flushed by reset")]
    Flushed,
}

impl AxiError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AxiError::InvalidParameter(msg.into())
    }
}

/// Result alias used throughout the engine.
pub type AxiResult<T> = Result<T, AxiError>;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
