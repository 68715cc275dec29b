//! Channel Payloads.
//!
//! One struct per AXI4 channel. Data beats carry the full bus width as a
//! little-endian byte vector, one entry per byte lane; the write strobe is a
//! lane bitmask with bit `n` enabling lane `n`.

use crate::common::{BurstType, LockType, Resp};

/// Address-phase beat shared by the AW and AR channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddrBeat {
    pub id: u32,
    pub addr: u64,
    /// Burst length minus one (AxLEN).
    pub len: u8,
    /// log2 of bytes per beat (AxSIZE).
    pub size: u8,
    pub burst: BurstType,
    pub lock: LockType,
    pub cache: u8,
    pub prot: u8,
    pub qos: u8,
    pub region: u8,
    pub user: u64,
}

impl AddrBeat {
    /// Number of beats in this burst.
    pub fn beats(&self) -> usize {
        self.len as usize + 1
    }

    pub fn beat_bytes(&self) -> usize {
        1usize << self.size
    }
}

/// Write data beat (W channel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteDataBeat {
    pub data: Vec<u8>,
    /// Lane write-enable mask (WSTRB).
    pub strb: u128,
    pub last: bool,
    pub user: u64,
}

/// Write response beat (B channel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRespBeat {
    pub id: u32,
    pub resp: Resp,
    pub user: u64,
}

/// Read data beat (R channel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadDataBeat {
    pub id: u32,
    pub data: Vec<u8>,
    pub resp: Resp,
    pub last: bool,
    pub user: u64,
}
