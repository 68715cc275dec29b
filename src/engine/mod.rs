//! AXI4 master engine.
//!
//! `AxiMaster` pairs a `WriteEngine` and a `ReadEngine` on one `AxiBus` and
//! owns the reset controller that flushes and restarts both.
//!
//! # Reset
//!
//! Entering reset cancels every task of both engines, clears all five bus
//! channels and resolves every queued or in-flight operation with
//! `AxiError::Flushed`. Per-ID counters, the round-robin ID allocator and
//! the in-flight counts return to zero. Leaving reset relaunches the tasks.

/// Request builders and response types.
pub mod command;

/// Single-assignment completion handles.
pub mod completion;

/// Task set and per-ID queue wiring.
mod pipeline;

/// Read direction: AR issue, R demultiplexing and data reassembly.
pub mod read;

/// Burst splitting and byte-lane planning.
pub mod splitter;

/// Outstanding-burst and in-flight bookkeeping.
pub mod tracker;

/// Write direction: AW/W issue, B demultiplexing and completion.
pub mod write;

pub use command::{ReadRequest, ReadResponse, WriteRequest, WriteResponse};
pub use completion::Pending;
pub use read::ReadEngine;
pub use splitter::{lane_mask, split_bursts, Burst, LanePlan};
pub use tracker::Tracker;
pub use write::WriteEngine;

use log::info;

use crate::bus::AxiBus;
use crate::common::{AxiError, AxiResult};
use crate::config::BusConfig;
use crate::stats::Report;

/// Reset controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetState {
    Active,
    Resetting,
}

/// A complete AXI4 master: independent write and read engines sharing one
/// interface.
pub struct AxiMaster {
    write: WriteEngine,
    read: ReadEngine,
    state: ResetState,
}

impl AxiMaster {
    /// Builds both engines on `bus` and starts them.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(bus: &AxiBus, config: &BusConfig) -> AxiResult<Self> {
        config
            .validate()
            .map_err(|e| AxiError::invalid(e.to_string()))?;
        if bus.byte_lanes != config.byte_lanes() {
            return Err(AxiError::invalid(format!(
                "bus has {} byte lanes, config expects {}",
                bus.byte_lanes,
                config.byte_lanes()
            )));
        }

        info!(
            "[AXI] master: {} bit data, {} IDs, max burst {}, queue depth {}",
            config.data_width,
            config.id_count(),
            config.effective_burst_len(),
            config.channel_queue_depth
        );
        Ok(Self {
            write: WriteEngine::new(bus.write.clone(), config),
            read: ReadEngine::new(bus.read.clone(), config),
            state: ResetState::Active,
        })
    }

    pub fn submit_write(&self, req: WriteRequest) -> AxiResult<Pending<WriteResponse>> {
        self.write.submit(req)
    }

    pub fn submit_read(&self, req: ReadRequest) -> AxiResult<Pending<ReadResponse>> {
        self.read.submit(req)
    }

    /// Writes `data` at `addr` and waits for the response.
    pub async fn write(&self, addr: u64, data: &[u8]) -> AxiResult<WriteResponse> {
        self.submit_write(WriteRequest::new(addr, data))?.await
    }

    /// Reads `length` bytes at `addr` and waits for the data.
    pub async fn read(&self, addr: u64, length: usize) -> AxiResult<ReadResponse> {
        self.submit_read(ReadRequest::new(addr, length))?.await
    }

    /// Writes the low `width` bytes of `value`, little-endian.
    pub async fn write_word(&self, addr: u64, value: u64, width: usize) -> AxiResult<WriteResponse> {
        check_word_width(width)?;
        self.write(addr, &value.to_le_bytes()[..width]).await
    }

    /// Reads a little-endian value of `width` bytes.
    pub async fn read_word(&self, addr: u64, width: usize) -> AxiResult<u64> {
        check_word_width(width)?;
        let resp = self.read(addr, width).await?;
        let mut bytes = [0u8; 8];
        bytes[..resp.data.len()].copy_from_slice(&resp.data);
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn write_engine(&self) -> &WriteEngine {
        &self.write
    }

    pub fn read_engine(&self) -> &ReadEngine {
        &self.read
    }

    /// True when neither engine has an operation in flight.
    pub fn idle(&self) -> bool {
        self.write.tracker().idle() && self.read.tracker().idle()
    }

    /// Suspends until both engines are idle at the same time.
    pub async fn wait_idle(&self) {
        loop {
            self.write.tracker().wait_idle().await;
            self.read.tracker().wait_idle().await;
            if self.idle() {
                return;
            }
        }
    }

    /// The first protocol violation recorded by either engine.
    pub fn fault(&self) -> Option<AxiError> {
        self.write
            .tracker()
            .fault()
            .or_else(|| self.read.tracker().fault())
    }

    pub fn state(&self) -> ResetState {
        self.state
    }

    /// Enters reset: cancels all tasks and flushes every pending operation.
    pub async fn assert_reset(&mut self) {
        info!("[AXI] reset asserted");
        self.state = ResetState::Resetting;
        self.write.assert_reset().await;
        self.read.assert_reset().await;
    }

    /// Leaves reset and relaunches the tasks of both engines.
    pub fn release_reset(&mut self) {
        info!("[AXI] reset released");
        self.write.release_reset();
        self.read.release_reset();
        self.state = ResetState::Active;
    }

    /// Pulses reset: flush everything, then restart.
    pub async fn reset(&mut self) {
        self.assert_reset().await;
        self.release_reset();
    }

    /// Snapshot of both engines' counters.
    pub fn report(&self, host_seconds: f64) -> Report {
        Report {
            host_seconds,
            write: self.write.stats().snapshot(),
            read: self.read.stats().snapshot(),
        }
    }
}

/// Resolves the beat size of a command, defaulting to the full bus width.
pub(crate) fn check_size(size: Option<u8>, max_size: u8) -> AxiResult<u8> {
    match size {
        None => Ok(max_size),
        Some(s) if s <= max_size => Ok(s),
        Some(s) => Err(AxiError::invalid(format!(
            "size {} exceeds bus maximum {}",
            s, max_size
        ))),
    }
}

pub(crate) fn check_id(id: Option<u32>, id_count: usize) -> AxiResult<()> {
    match id {
        Some(id) if id as usize >= id_count => Err(AxiError::invalid(format!(
            "id {} out of range (0..{})",
            id, id_count
        ))),
        _ => Ok(()),
    }
}

/// Rejects transfers whose last byte lies beyond a bus of `addr_width` bits.
pub(crate) fn check_range(addr: u64, len: usize, addr_width: u32) -> AxiResult<()> {
    let end = addr.checked_add(len as u64);
    let fits = match (end, 1u64.checked_shl(addr_width)) {
        (None, _) => false,
        (Some(end), Some(limit)) => end <= limit,
        (Some(_), None) => true,
    };
    if fits {
        Ok(())
    } else {
        Err(AxiError::invalid(format!(
            "transfer of {} bytes at {:#x} exceeds the {}-bit address space",
            len, addr, addr_width
        )))
    }
}

fn check_word_width(width: usize) -> AxiResult<()> {
    match width {
        1 | 2 | 4 | 8 => Ok(()),
        _ => Err(AxiError::invalid(format!("word width {} not in 1/2/4/8", width))),
    }
}
