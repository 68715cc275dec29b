//! Protocol Field Encodings.
//!
//! This module defines the encodings of the AXI4 address-phase and
//! response fields, along with the attribute bundle a caller attaches to a
//! transfer. The engine forwards most attributes to the bus untouched; only
//! the burst type and beat size influence how a command is split.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_CACHE, DEFAULT_PROT};

/// Address stepping mode of a burst (AxBURST).
///
/// Only `Incr` address stepping is modeled by the splitter; `Fixed` and
/// `Wrap` are accepted and forwarded on the address channel as-is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstType {
    /// Every beat targets the same address.
    Fixed,
    /// Each beat advances the address by the beat size.
    #[default]
    Incr,
    /// Incrementing address that wraps at a burst-aligned boundary.
    Wrap,
}

impl BurstType {
    /// Returns the two-bit AxBURST encoding.
    pub fn bits(self) -> u8 {
        match self {
            BurstType::Fixed => 0b00,
            BurstType::Incr => 0b01,
            BurstType::Wrap => 0b10,
        }
    }
}

/// Access type (AxLOCK).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    #[default]
    Normal,
    Exclusive,
}

/// Response code carried on the B and R channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resp {
    /// Normal access success.
    #[default]
    Okay,
    /// Exclusive access success.
    ExOkay,
    /// Slave error.
    SlvErr,
    /// Decode error, no slave at the address.
    DecErr,
}

impl Resp {
    /// Returns the two-bit xRESP encoding.
    pub fn bits(self) -> u8 {
        match self {
            Resp::Okay => 0b00,
            Resp::ExOkay => 0b01,
            Resp::SlvErr => 0b10,
            Resp::DecErr => 0b11,
        }
    }

    /// Decodes a two-bit xRESP value. Upper bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Resp::Okay,
            0b01 => Resp::ExOkay,
            0b10 => Resp::SlvErr,
            _ => Resp::DecErr,
        }
    }

    pub fn is_okay(self) -> bool {
        self == Resp::Okay
    }

    /// Folds a per-burst response into an aggregate.
    ///
    /// The first non-`Okay` code observed is kept for the remainder of the
    /// transfer.
    pub fn merge(self, next: Resp) -> Resp {
        if self.is_okay() {
            next
        } else {
            self
        }
    }
}

impl fmt::Display for Resp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resp::Okay => "OKAY",
            Resp::ExOkay => "EXOKAY",
            Resp::SlvErr => "SLVERR",
            Resp::DecErr => "DECERR",
        };
        f.write_str(s)
    }
}

/// Which half of the interface a component belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Write,
    Read,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Write => f.write_str("write"),
            Direction::Read => f.write_str("read"),
        }
    }
}

/// Address-phase attributes attached to every burst of a command.
///
/// Apart from `burst`, these values are opaque to the engine and are copied
/// onto each AW/AR beat the command produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub burst: BurstType,
    pub lock: LockType,
    /// AxCACHE memory attributes.
    pub cache: u8,
    /// AxPROT protection attributes.
    pub prot: u8,
    /// AxQOS quality-of-service identifier.
    pub qos: u8,
    /// AxREGION region identifier.
    pub region: u8,
    /// AxUSER side-band value.
    pub user: u64,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            burst: BurstType::Incr,
            lock: LockType::Normal,
            cache: DEFAULT_CACHE,
            prot: DEFAULT_PROT,
            qos: 0,
            region: 0,
            user: 0,
        }
    }
}

/// Per-beat WUSER side-band source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserSignal {
    /// The same value on every beat.
    Single(u64),
    /// One value per beat, consumed in order. Beats past the end carry 0.
    PerBeat(Vec<u64>),
}

impl UserSignal {
    /// Returns the side-band value for data beat `beat`.
    pub fn value_at(&self, beat: usize) -> u64 {
        match self {
            UserSignal::Single(v) => *v,
            UserSignal::PerBeat(values) => values.get(beat).copied().unwrap_or(0),
        }
    }
}

impl Default for UserSignal {
    fn default() -> Self {
        UserSignal::Single(0)
    }
}

impl From<u64> for UserSignal {
    fn from(v: u64) -> Self {
        UserSignal::Single(v)
    }
}

impl From<Vec<u64>> for UserSignal {
    fn from(values: Vec<u64>) -> Self {
        UserSignal::PerBeat(values)
    }
}
