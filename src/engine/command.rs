//! Caller-facing requests and responses.
//!
//! Requests are built with chained setters; anything left unset takes the
//! engine's default (auto-assigned ID, full bus-width beats, INCR bursts).

use crate::common::{Attributes, BurstType, LockType, Resp, UserSignal};

/// A write of `data` starting at `addr`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRequest {
    pub addr: u64,
    pub data: Vec<u8>,
    pub id: Option<u32>,
    /// log2 bytes per beat; `None` uses the full bus width.
    pub size: Option<u8>,
    pub attrs: Attributes,
    pub wuser: UserSignal,
}

impl WriteRequest {
    pub fn new(addr: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            addr,
            data: data.into(),
            id: None,
            size: None,
            attrs: Attributes::default(),
            wuser: UserSignal::default(),
        }
    }

    pub fn id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn size(mut self, size: u8) -> Self {
        self.size = Some(size);
        self
    }

    pub fn burst(mut self, burst: BurstType) -> Self {
        self.attrs.burst = burst;
        self
    }

    pub fn lock(mut self, lock: LockType) -> Self {
        self.attrs.lock = lock;
        self
    }

    pub fn cache(mut self, cache: u8) -> Self {
        self.attrs.cache = cache;
        self
    }

    pub fn prot(mut self, prot: u8) -> Self {
        self.attrs.prot = prot;
        self
    }

    pub fn qos(mut self, qos: u8) -> Self {
        self.attrs.qos = qos;
        self
    }

    pub fn region(mut self, region: u8) -> Self {
        self.attrs.region = region;
        self
    }

    /// AWUSER value placed on every address beat.
    pub fn user(mut self, user: u64) -> Self {
        self.attrs.user = user;
        self
    }

    pub fn wuser(mut self, wuser: impl Into<UserSignal>) -> Self {
        self.wuser = wuser.into();
        self
    }
}

/// A read of `length` bytes starting at `addr`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadRequest {
    pub addr: u64,
    pub length: usize,
    pub id: Option<u32>,
    pub size: Option<u8>,
    pub attrs: Attributes,
}

impl ReadRequest {
    pub fn new(addr: u64, length: usize) -> Self {
        Self {
            addr,
            length,
            id: None,
            size: None,
            attrs: Attributes::default(),
        }
    }

    pub fn id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn size(mut self, size: u8) -> Self {
        self.size = Some(size);
        self
    }

    pub fn burst(mut self, burst: BurstType) -> Self {
        self.attrs.burst = burst;
        self
    }

    pub fn lock(mut self, lock: LockType) -> Self {
        self.attrs.lock = lock;
        self
    }

    pub fn cache(mut self, cache: u8) -> Self {
        self.attrs.cache = cache;
        self
    }

    pub fn prot(mut self, prot: u8) -> Self {
        self.attrs.prot = prot;
        self
    }

    pub fn qos(mut self, qos: u8) -> Self {
        self.attrs.qos = qos;
        self
    }

    pub fn region(mut self, region: u8) -> Self {
        self.attrs.region = region;
        self
    }

    /// ARUSER value placed on every address beat.
    pub fn user(mut self, user: u64) -> Self {
        self.attrs.user = user;
        self
    }
}

/// Outcome of a completed write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteResponse {
    pub addr: u64,
    pub length: usize,
    /// First non-OKAY response seen across all bursts, else OKAY.
    pub resp: Resp,
    /// BUSER of each burst, in burst order.
    pub user: Vec<u64>,
}

/// Outcome of a completed read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadResponse {
    pub addr: u64,
    pub data: Vec<u8>,
    /// First non-OKAY response seen across all beats, else OKAY.
    pub resp: Resp,
    /// RUSER of each data beat, in beat order.
    pub user: Vec<u64>,
}
