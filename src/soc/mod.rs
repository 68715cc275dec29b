//! Slave-side models.
//!
//! Components that sit on the far side of an `AxiBus`: the `Device` trait,
//! a flat `Ram` and the `AxiSlave` that decodes AXI traffic into device
//! accesses.

/// Flat RAM device.
pub mod memory;

/// AXI4 slave endpoint serving one device.
pub mod slave;

/// Device trait implemented by every slave-side model.
pub mod traits;

pub use memory::Ram;
pub use slave::{AxiSlave, SlaveHandle};
pub use traits::Device;
