//! Common types used throughout the AXI master engine.
//!
//! This module provides the protocol-level enumerations, attribute bundles,
//! constants and error types that are shared between the bus transport,
//! the master engines and the slave models.

/// Protocol constants (burst limits, boundary sizes, attribute defaults).
pub mod constants;

/// Protocol field encodings and transfer attributes.
pub mod data;

/// Error types for the engine and configuration loading.
pub mod error;

pub use data::{Attributes, BurstType, Direction, LockType, Resp, UserSignal};
pub use error::{AxiError, AxiResult, ConfigError};

pub use constants::{BOUNDARY_4K, MAX_BURST_LEN};
