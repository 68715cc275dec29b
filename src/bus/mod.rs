//! AXI4 Interconnect.
//!
//! This module models the wires between one master and one slave as five
//! independent channels. The master sends on AW, W and AR and receives on
//! B and R; the slave does the opposite. Both sides hold clones of the same
//! `AxiBus`.

/// Per-channel payload structs.
pub mod beats;

/// Bounded FIFO used for every channel.
pub mod channel;

pub use beats::{AddrBeat, ReadDataBeat, WriteDataBeat, WriteRespBeat};
pub use channel::BusChannel;

use crate::config::BusConfig;

/// Write half of the interface: AW, W and B channels.
#[derive(Clone)]
pub struct WriteChannels {
    pub aw: BusChannel<AddrBeat>,
    pub w: BusChannel<WriteDataBeat>,
    pub b: BusChannel<WriteRespBeat>,
}

impl WriteChannels {
    /// Drops every beat in flight on the write channels.
    pub fn clear(&self) {
        self.aw.clear();
        self.w.clear();
        self.b.clear();
    }
}

/// Read half of the interface: AR and R channels.
#[derive(Clone)]
pub struct ReadChannels {
    pub ar: BusChannel<AddrBeat>,
    pub r: BusChannel<ReadDataBeat>,
}

impl ReadChannels {
    /// Drops every beat in flight on the read channels.
    pub fn clear(&self) {
        self.ar.clear();
        self.r.clear();
    }
}

/// A complete AXI4 interface.
#[derive(Clone)]
pub struct AxiBus {
    pub write: WriteChannels,
    pub read: ReadChannels,
    /// Data bus width in bytes.
    pub byte_lanes: usize,
}

impl AxiBus {
    /// Creates an interface with the data width and channel depth from `config`.
    pub fn new(config: &BusConfig) -> Self {
        let depth = config.channel_queue_depth;
        Self {
            write: WriteChannels {
                aw: BusChannel::new("AW", depth),
                w: BusChannel::new("W", depth),
                b: BusChannel::new("B", depth),
            },
            read: ReadChannels {
                ar: BusChannel::new("AR", depth),
                r: BusChannel::new("R", depth),
            },
            byte_lanes: config.byte_lanes(),
        }
    }
}
