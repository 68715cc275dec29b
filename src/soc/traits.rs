//! Slave-side Device Trait.
//!
//! This module defines the interface a memory-mapped device implements to be
//! served over AXI by an `AxiSlave`. The slave performs address decoding and
//! lane selection; the device only sees byte accesses at offsets inside its
//! own range.

use crate::common::Resp;

/// Trait for memory-mapped devices behind an AXI slave port.
pub trait Device: Send {
    /// Returns the user-friendly name of the device.
    ///
    /// Used for logging.
    fn name(&self) -> &str;

    /// Returns the address range (Base Address, Size) of the device.
    fn address_range(&self) -> (u64, u64);

    /// Reads a byte from the device at the specified offset.
    fn read_u8(&mut self, offset: u64) -> u8;

    /// Writes a byte to the device at the specified offset.
    fn write_u8(&mut self, offset: u64, val: u8);

    /// Response code for a beat touching `offset`.
    ///
    /// Devices that refuse some accesses return `SlvErr` here; the slave then
    /// skips the access and reports the code on the bus.
    fn response(&self, _offset: u64, _write: bool) -> Resp {
        Resp::Okay
    }

    /// Returns `true` if the absolute address falls inside the device.
    fn contains(&self, addr: u64) -> bool {
        let (base, size) = self.address_range();
        addr >= base && addr - base < size
    }
}
