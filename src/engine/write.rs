//! Write Engine.
//!
//! Drives the AW, W and B channels. Three kinds of task cooperate:
//!
//! * **Issue**: takes commands in submission order, splits them into bursts,
//!   sends one AW beat per burst followed by that burst's W beats, then
//!   hands a response descriptor to the command's ID slot.
//! * **Collect**: receives B beats, matches each against an outstanding
//!   burst on its ID and forwards it to that ID's slot.
//! * **Reassemble** (one per ID): pairs each descriptor with as many B beats
//!   as it has bursts and resolves the caller's handle.
//!
//! A B beat with no outstanding burst latches a fault. From then on every
//! queued or in-flight write resolves with that fault until reset.

use std::sync::Arc;

use log::{debug, error, trace};
use tokio::sync::mpsc;

use super::command::{WriteRequest, WriteResponse};
use super::completion::{Completion, Pending};
use super::pipeline::{IdQueues, Pipeline, TaskSet};
use super::splitter::{lane_mask, split_bursts, LanePlan};
use super::tracker::{fault_raised, Tracker};
use super::{check_id, check_range, check_size};
use crate::bus::{AddrBeat, WriteChannels, WriteDataBeat, WriteRespBeat};
use crate::common::{AxiError, AxiResult, Direction, Resp};
use crate::config::BusConfig;
use crate::stats::EngineStats;

struct WriteCommand {
    req: WriteRequest,
    size: u8,
    completion: Completion<WriteResponse>,
}

/// Everything the reassembly task needs once the bursts are on the wire.
struct WriteDescriptor {
    addr: u64,
    length: usize,
    size: u8,
    cycles: usize,
    prot: u8,
    bursts: Vec<usize>,
    completion: Completion<WriteResponse>,
}

struct WriteContext {
    bus: WriteChannels,
    tracker: Tracker,
    stats: EngineStats,
    byte_lanes: usize,
    addr_width: u32,
    max_size: u8,
    max_burst_len: usize,
}

/// Write half of an AXI4 master.
pub struct WriteEngine {
    ctx: Arc<WriteContext>,
    cmd_tx: mpsc::UnboundedSender<WriteCommand>,
    pipeline: Pipeline<WriteCommand>,
}

impl WriteEngine {
    /// Creates the engine and starts its tasks. Must be called from within
    /// a tokio runtime.
    pub fn new(bus: WriteChannels, config: &BusConfig) -> Self {
        let ctx = Arc::new(WriteContext {
            bus,
            tracker: Tracker::new(config.id_count()),
            stats: EngineStats::new(Direction::Write),
            byte_lanes: config.byte_lanes(),
            addr_width: config.addr_width,
            max_size: config.max_size(),
            max_burst_len: config.effective_burst_len(),
        });
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let mut engine = Self {
            ctx,
            cmd_tx,
            pipeline: Pipeline::Parked(cmd_rx),
        };
        engine.release_reset();
        engine
    }

    /// Queues a write and returns its completion handle.
    ///
    /// Parameter errors are reported here and nothing is queued. Once the
    /// engine has recorded a protocol fault every submission fails with it
    /// until the next reset.
    pub fn submit(&self, req: WriteRequest) -> AxiResult<Pending<WriteResponse>> {
        if let Some(err) = self.ctx.tracker.fault() {
            return Err(err);
        }
        let size = check_size(req.size, self.ctx.max_size)?;
        check_id(req.id, self.ctx.tracker.id_count())?;
        check_range(req.addr, req.data.len(), self.ctx.addr_width)?;

        let (completion, pending) = Completion::new();
        self.ctx.tracker.begin();
        self.ctx.stats.command_submitted();
        debug!(
            "[AXI-W] submit addr={:#x} len={} id={:?} size={}",
            req.addr,
            req.data.len(),
            req.id,
            size
        );

        let cmd = WriteCommand {
            req,
            size,
            completion,
        };
        if self.cmd_tx.send(cmd).is_err() {
            self.ctx.tracker.finish();
            return Err(AxiError::Flushed);
        }
        Ok(pending)
    }

    pub fn tracker(&self) -> &Tracker {
        &self.ctx.tracker
    }

    pub fn stats(&self) -> &EngineStats {
        &self.ctx.stats
    }

    pub fn is_running(&self) -> bool {
        matches!(self.pipeline, Pipeline::Running(_))
    }

    /// Stops every task and flushes all queued and in-flight writes.
    pub async fn assert_reset(&mut self) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let old = std::mem::replace(&mut self.pipeline, Pipeline::Parked(cmd_rx));
        self.cmd_tx = cmd_tx;
        if let Pipeline::Running(tasks) = old {
            tasks.cancel().await;
        }

        self.ctx.bus.clear();
        let flushed = self.ctx.tracker.clear();
        self.ctx.stats.commands_flushed(flushed);
        debug!("[AXI-W] reset asserted, {} writes flushed", flushed);
    }

    /// Relaunches the tasks. Writes submitted during reset are issued now.
    pub fn release_reset(&mut self) {
        let old = std::mem::replace(&mut self.pipeline, Pipeline::Running(TaskSet::default()));
        match old {
            Pipeline::Parked(cmd_rx) => {
                let tasks = launch(&self.ctx, cmd_rx);
                debug!("[AXI-W] started {} tasks", tasks.len());
                self.pipeline = Pipeline::Running(tasks);
            }
            running => self.pipeline = running,
        }
    }
}

fn launch(ctx: &Arc<WriteContext>, cmd_rx: mpsc::UnboundedReceiver<WriteCommand>) -> TaskSet {
    let IdQueues {
        desc_tx,
        beat_tx,
        slots,
    } = IdQueues::new(ctx.tracker.id_count());

    let mut tasks = TaskSet::default();
    tasks.spawn(issue_loop(Arc::clone(ctx), cmd_rx, desc_tx));
    tasks.spawn(collect_loop(Arc::clone(ctx), beat_tx));
    for (id, (desc_rx, beat_rx)) in slots.into_iter().enumerate() {
        tasks.spawn(reassemble_loop(Arc::clone(ctx), id, desc_rx, beat_rx));
    }
    tasks
}

async fn issue_loop(
    ctx: Arc<WriteContext>,
    mut cmd_rx: mpsc::UnboundedReceiver<WriteCommand>,
    desc_tx: Vec<mpsc::UnboundedSender<WriteDescriptor>>,
) {
    let id_count = desc_tx.len() as u32;
    let mut next_id = 0u32;
    let mut fault_rx = ctx.tracker.watch_fault();

    while let Some(cmd) = cmd_rx.recv().await {
        let WriteCommand {
            req,
            size,
            completion,
        } = cmd;
        let id = match req.id {
            Some(id) => id,
            None => {
                let id = next_id;
                next_id = (next_id + 1) % id_count;
                id
            }
        };

        let bursts = tokio::select! {
            biased;
            err = fault_raised(&mut fault_rx) => {
                fail(&ctx, completion, err);
                continue;
            }
            bursts = issue(&ctx, id, &req, size) => bursts,
        };
        let desc = WriteDescriptor {
            addr: req.addr,
            length: req.data.len(),
            size,
            cycles: bursts.iter().sum(),
            prot: req.attrs.prot,
            bursts,
            completion,
        };
        if desc_tx[id as usize].send(desc).is_err() {
            break;
        }
    }
}

/// Puts every burst of `req` on AW and W. Returns the beat count per burst.
async fn issue(ctx: &WriteContext, id: u32, req: &WriteRequest, size: u8) -> Vec<usize> {
    let bursts = split_bursts(req.addr, req.data.len(), size, ctx.max_burst_len);
    let plan = LanePlan::new(req.addr, req.data.len(), size, ctx.byte_lanes);
    let mut lanes = plan.beats();
    let mut offset = 0;
    let mut beat_index = 0;

    debug!(
        "[AXI-W] issue id={} addr={:#x} len={} bursts={} beats={}",
        id,
        req.addr,
        req.data.len(),
        bursts.len(),
        plan.cycles()
    );

    for burst in &bursts {
        ctx.tracker.burst_issued(id as usize);
        let aw = AddrBeat {
            id,
            addr: burst.addr,
            len: burst.len_field(),
            size,
            burst: req.attrs.burst,
            lock: req.attrs.lock,
            cache: req.attrs.cache,
            prot: req.attrs.prot,
            qos: req.attrs.qos,
            region: req.attrs.region,
            user: req.attrs.user,
        };
        trace!("[AXI-W] AW {:?}", aw);
        ctx.bus.aw.send(aw).await;
        ctx.stats.burst_issued();

        for n in 0..burst.beats {
            let Some(range) = lanes.next() else {
                break;
            };
            let mut data = vec![0u8; ctx.byte_lanes];
            let width = range.len();
            if let Some(src) = req.data.get(offset..offset + width) {
                data[range.clone()].copy_from_slice(src);
            }
            offset += width;

            let w = WriteDataBeat {
                data,
                strb: lane_mask(range),
                last: n + 1 == burst.beats,
                user: req.wuser.value_at(beat_index),
            };
            trace!("[AXI-W] W {:?}", w);
            ctx.bus.w.send(w).await;
            ctx.stats.beat_transferred();
            beat_index += 1;
        }
    }

    bursts.iter().map(|b| b.beats).collect()
}

/// Resolves a write with the latched fault.
fn fail(ctx: &WriteContext, completion: Completion<WriteResponse>, err: AxiError) {
    ctx.tracker.finish();
    completion.complete(Err(err));
}

async fn collect_loop(ctx: Arc<WriteContext>, beat_tx: Vec<mpsc::UnboundedSender<WriteRespBeat>>) {
    loop {
        let b = ctx.bus.b.recv().await;
        trace!("[AXI-W] B {:?}", b);
        let id = b.id as usize;
        if !ctx.tracker.claim_burst(id) {
            let err = AxiError::UnexpectedResponseId {
                direction: Direction::Write,
                id: b.id,
            };
            error!("[AXI-W] {}", err);
            ctx.tracker.raise_fault(err);
            continue;
        }
        if beat_tx[id].send(b).is_err() {
            break;
        }
    }
}

async fn reassemble_loop(
    ctx: Arc<WriteContext>,
    id: usize,
    mut desc_rx: mpsc::UnboundedReceiver<WriteDescriptor>,
    mut beat_rx: mpsc::UnboundedReceiver<WriteRespBeat>,
) {
    let mut fault_rx = ctx.tracker.watch_fault();

    while let Some(desc) = desc_rx.recv().await {
        let result = tokio::select! {
            biased;
            resp = collect_responses(&ctx, id, &desc, &mut beat_rx) => match resp {
                Some(resp) => resp,
                None => return,
            },
            err = fault_raised(&mut fault_rx) => {
                debug!("[AXI-W] id={} addr={:#x} failed: {}", id, desc.addr, err);
                fail(&ctx, desc.completion, err);
                continue;
            }
        };
        ctx.tracker.finish();
        desc.completion.complete(Ok(result));
    }
}

/// Waits for one B beat per burst of `desc` and merges them.
async fn collect_responses(
    ctx: &WriteContext,
    id: usize,
    desc: &WriteDescriptor,
    beat_rx: &mut mpsc::UnboundedReceiver<WriteRespBeat>,
) -> Option<WriteResponse> {
    let mut resp = Resp::Okay;
    let mut user = Vec::with_capacity(desc.bursts.len());

    for _ in &desc.bursts {
        let b = beat_rx.recv().await?;
        if !b.resp.is_okay() {
            ctx.stats.error_response();
        }
        resp = resp.merge(b.resp);
        user.push(b.user);
    }

    debug!(
        "[AXI-W] done id={} addr={:#x} len={} size={} beats={} prot={:#05b} resp={}",
        id, desc.addr, desc.length, desc.size, desc.cycles, desc.prot, resp
    );
    ctx.stats.command_completed(desc.length);
    Some(WriteResponse {
        addr: desc.addr,
        length: desc.length,
        resp,
        user,
    })
}
