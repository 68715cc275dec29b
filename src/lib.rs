//! AXI4 Bus Master Library.
//!
//! This crate implements the master side of an AXI4 memory-mapped interface.
//! Callers submit byte-level read and write requests; the engines split them
//! into legal bursts, drive the address and data channels, match responses
//! back to requests by transaction ID and resolve each request with its data
//! and aggregated response code.
//!
//! # Architecture
//!
//! * **Bus**: five bounded channels (AW, W, B, AR, R) shared by master and slave.
//! * **Engines**: independent write and read pipelines with per-ID ordering.
//! * **Reset**: flushes every pending operation and restarts both engines.
//! * **Slave models**: an AXI4 slave serving a `Device`, used for self-test.
//!
//! # Modules
//!
//! * `bus`: Channel payloads and the interface bundle.
//! * `common`: Shared types, constants, and error handling.
//! * `config`: Configuration loading and parsing.
//! * `engine`: Burst splitter, write/read engines, tracker and reset controller.
//! * `soc`: Slave-side device models.
//! * `stats`: Engine statistics collection.

/// AXI4 channel payloads and the five-channel interface.
///
/// Both sides of the interface hold clones of one `AxiBus`; each channel is a
/// bounded FIFO with back-pressure.
pub mod bus;

/// Shared types, constants and error handling.
///
/// Defines the AXI attribute enums, response codes and the error types
/// returned by submission and completion.
pub mod common;

/// Configuration system for the bus shape and the self-test memory.
///
/// Loads and validates TOML configuration files.
pub mod config;

/// AXI4 master engines.
///
/// Implements burst splitting, the write and read pipelines, per-ID
/// outstanding tracking and the reset controller.
pub mod engine;

/// Slave-side models: device trait, RAM and AXI slave endpoint.
pub mod soc;

/// Engine statistics collection and reporting.
pub mod stats;

pub use bus::AxiBus;
pub use common::{AxiError, AxiResult, Resp};
pub use config::{BusConfig, Config};
pub use engine::{AxiMaster, ReadRequest, ReadResponse, WriteRequest, WriteResponse};
