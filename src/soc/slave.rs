//! AXI4 Slave Model.
//!
//! Serves one `Device` on the slave side of an `AxiBus`. Two tasks run
//! independently: the write task consumes AW and W beats and answers on B,
//! the read task consumes AR beats and answers on R. Bursts are served in
//! arrival order.
//!
//! Accesses outside the device window are dropped and answered with DECERR.
//! Devices can refuse individual beats through `Device::response`.

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, trace, warn};
use tokio::task::JoinHandle;

use super::traits::Device;
use crate::bus::{AddrBeat, AxiBus, ReadDataBeat, WriteRespBeat};
use crate::common::{BurstType, Resp};

/// Device shared between the slave tasks and the caller.
pub type SharedDevice<D> = Arc<Mutex<D>>;

/// Slave-side endpoint of an AXI4 interface.
pub struct AxiSlave<D: Device + 'static> {
    bus: AxiBus,
    device: SharedDevice<D>,
}

/// Running slave tasks. Dropping the handle stops the slave.
pub struct SlaveHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SlaveHandle {
    /// Stops both slave tasks.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for SlaveHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

impl<D: Device + 'static> AxiSlave<D> {
    pub fn new(bus: AxiBus, device: D) -> Self {
        Self {
            bus,
            device: Arc::new(Mutex::new(device)),
        }
    }

    /// Handle to the served device, for preloading and inspection.
    pub fn device(&self) -> SharedDevice<D> {
        Arc::clone(&self.device)
    }

    /// Starts the write and read tasks. Must be called from within a tokio
    /// runtime.
    pub fn spawn(&self) -> SlaveHandle {
        {
            let dev = lock(&self.device);
            let (base, size) = dev.address_range();
            debug!("[Slave] serving {} at {:#x}, {} bytes", dev.name(), base, size);
        }
        let write = tokio::spawn(write_loop(self.bus.clone(), Arc::clone(&self.device)));
        let read = tokio::spawn(read_loop(self.bus.clone(), Arc::clone(&self.device)));
        SlaveHandle {
            tasks: vec![write, read],
        }
    }
}

/// Address of beat `n` of the burst described by `ax`.
pub fn beat_address(ax: &AddrBeat, n: usize) -> u64 {
    let bytes = ax.beat_bytes() as u64;
    let aligned = ax.addr & !(bytes - 1);
    match ax.burst {
        BurstType::Fixed => ax.addr,
        BurstType::Incr if n == 0 => ax.addr,
        BurstType::Incr => aligned + n as u64 * bytes,
        BurstType::Wrap => {
            let total = bytes * ax.beats() as u64;
            let lower = ax.addr & !(total - 1);
            lower + (aligned - lower + n as u64 * bytes) % total
        }
    }
}

/// Response for a byte access at `addr`, DECERR outside the device window.
fn access_resp<D: Device>(device: &D, addr: u64, write: bool) -> Resp {
    if !device.contains(addr) {
        return Resp::DecErr;
    }
    let (base, _) = device.address_range();
    device.response(addr - base, write)
}

fn lock<D>(device: &SharedDevice<D>) -> std::sync::MutexGuard<'_, D> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write_loop<D: Device>(bus: AxiBus, device: SharedDevice<D>) {
    let lanes = bus.byte_lanes as u64;
    loop {
        let aw = bus.write.aw.recv().await;
        trace!("[Slave] AW {:?}", aw);
        let mut resp = Resp::Okay;

        for n in 0..aw.beats() {
            let w = bus.write.w.recv().await;
            if w.last != (n + 1 == aw.beats()) {
                warn!(
                    "[Slave] id={} W beat {} of {} has last={}",
                    aw.id,
                    n + 1,
                    aw.beats(),
                    w.last
                );
            }

            let word = beat_address(&aw, n) & !(lanes - 1);
            let mut dev = lock(&device);
            for lane in 0..lanes {
                if w.strb & (1u128 << lane) == 0 {
                    continue;
                }
                let addr = word + lane;
                let r = access_resp(&*dev, addr, true);
                if r.is_okay() {
                    let (base, _) = dev.address_range();
                    dev.write_u8(addr - base, w.data.get(lane as usize).copied().unwrap_or(0));
                }
                resp = resp.merge(r);
            }
        }

        debug!(
            "[Slave] write id={} addr={:#x} beats={} resp={}",
            aw.id,
            aw.addr,
            aw.beats(),
            resp
        );
        bus.write
            .b
            .send(WriteRespBeat {
                id: aw.id,
                resp,
                user: aw.user,
            })
            .await;
    }
}

async fn read_loop<D: Device>(bus: AxiBus, device: SharedDevice<D>) {
    let lanes = bus.byte_lanes as u64;
    loop {
        let ar = bus.read.ar.recv().await;
        trace!("[Slave] AR {:?}", ar);
        let bytes = ar.beat_bytes() as u64;

        for n in 0..ar.beats() {
            let addr = beat_address(&ar, n);
            let word = addr & !(lanes - 1);
            let end = (addr & !(bytes - 1)) + bytes;
            let mut data = vec![0u8; lanes as usize];
            let mut resp = Resp::Okay;
            {
                let mut dev = lock(&device);
                for byte_addr in addr..end {
                    let r = access_resp(&*dev, byte_addr, false);
                    let slot = data.get_mut((byte_addr - word) as usize);
                    if let (true, Some(slot)) = (r.is_okay(), slot) {
                        let (base, _) = dev.address_range();
                        *slot = dev.read_u8(byte_addr - base);
                    }
                    resp = resp.merge(r);
                }
            }
            bus.read
                .r
                .send(ReadDataBeat {
                    id: ar.id,
                    data,
                    resp,
                    last: n + 1 == ar.beats(),
                    user: ar.user,
                })
                .await;
        }

        debug!(
            "[Slave] read id={} addr={:#x} beats={}",
            ar.id,
            ar.addr,
            ar.beats()
        );
    }
}
