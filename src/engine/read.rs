//! Read Engine.
//!
//! Mirror of the write engine on the AR and R channels. The reassembly task
//! additionally stitches the active byte lanes of every R beat back into one
//! contiguous buffer. R beats of different IDs may interleave arbitrarily;
//! beats of one ID arrive in burst order.
//!
//! An R beat with no open burst on its ID latches a fault, which then
//! resolves every queued or in-flight read until reset.

use std::sync::Arc;

use log::{debug, error, trace, warn};
use tokio::sync::mpsc;

use super::command::{ReadRequest, ReadResponse};
use super::completion::{Completion, Pending};
use super::pipeline::{IdQueues, Pipeline, TaskSet};
use super::splitter::{split_bursts, LanePlan};
use super::tracker::{fault_raised, Tracker};
use super::{check_id, check_range, check_size};
use crate::bus::{AddrBeat, ReadChannels, ReadDataBeat};
use crate::common::{AxiError, AxiResult, Direction, Resp};
use crate::config::BusConfig;
use crate::stats::EngineStats;

struct ReadCommand {
    req: ReadRequest,
    size: u8,
    completion: Completion<ReadResponse>,
}

struct ReadDescriptor {
    addr: u64,
    length: usize,
    size: u8,
    cycles: usize,
    prot: u8,
    bursts: Vec<usize>,
    completion: Completion<ReadResponse>,
}

struct ReadContext {
    bus: ReadChannels,
    tracker: Tracker,
    stats: EngineStats,
    byte_lanes: usize,
    addr_width: u32,
    max_size: u8,
    max_burst_len: usize,
}

/// Read half of an AXI4 master.
pub struct ReadEngine {
    ctx: Arc<ReadContext>,
    cmd_tx: mpsc::UnboundedSender<ReadCommand>,
    pipeline: Pipeline<ReadCommand>,
}

impl ReadEngine {
    /// Creates the engine and starts its tasks. Must be called from within
    /// a tokio runtime.
    pub fn new(bus: ReadChannels, config: &BusConfig) -> Self {
        let ctx = Arc::new(ReadContext {
            bus,
            tracker: Tracker::new(config.id_count()),
            stats: EngineStats::new(Direction::Read),
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

    /// Queues a read and returns its completion handle.
    pub fn submit(&self, req: ReadRequest) -> AxiResult<Pending<ReadResponse>> {
        if let Some(err) = self.ctx.tracker.fault() {
            return Err(err);
        }
        let size = check_size(req.size, self.ctx.max_size)?;
        check_id(req.id, self.ctx.tracker.id_count())?;
        check_range(req.addr, req.length, self.ctx.addr_width)?;

        let (completion, pending) = Completion::new();
        self.ctx.tracker.begin();
        self.ctx.stats.command_submitted();
        debug!(
            "[AXI-R] submit addr={:#x} len={} id={:?} size={}",
            req.addr, req.length, req.id, size
        );

        let cmd = ReadCommand {
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

    /// Stops every task and flushes all queued and in-flight reads.
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
        debug!("[AXI-R] reset asserted, {} reads flushed", flushed);
    }

    /// Relaunches the tasks. Reads submitted during reset are issued now.
    pub fn release_reset(&mut self) {
        let old = std::mem::replace(&mut self.pipeline, Pipeline::Running(TaskSet::default()));
        match old {
            Pipeline::Parked(cmd_rx) => {
                let tasks = launch(&self.ctx, cmd_rx);
                debug!("[AXI-R] started {} tasks", tasks.len());
                self.pipeline = Pipeline::Running(tasks);
            }
            running => self.pipeline = running,
        }
    }
}

fn launch(ctx: &Arc<ReadContext>, cmd_rx: mpsc::UnboundedReceiver<ReadCommand>) -> TaskSet {
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
    ctx: Arc<ReadContext>,
    mut cmd_rx: mpsc::UnboundedReceiver<ReadCommand>,
    desc_tx: Vec<mpsc::UnboundedSender<ReadDescriptor>>,
) {
    let id_count = desc_tx.len() as u32;
    let mut next_id = 0u32;
    let mut fault_rx = ctx.tracker.watch_fault();

    while let Some(cmd) = cmd_rx.recv().await {
        let ReadCommand {
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
        let desc = ReadDescriptor {
            addr: req.addr,
            length: req.length,
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

/// Puts every burst of `req` on AR. Returns the beat count per burst.
async fn issue(ctx: &ReadContext, id: u32, req: &ReadRequest, size: u8) -> Vec<usize> {
    let bursts = split_bursts(req.addr, req.length, size, ctx.max_burst_len);

    debug!(
        "[AXI-R] issue id={} addr={:#x} len={} bursts={} beats={}",
        id,
        req.addr,
        req.length,
        bursts.len(),
        bursts.iter().map(|b| b.beats).sum::<usize>()
    );

    for burst in &bursts {
        ctx.tracker.burst_issued(id as usize);
        let ar = AddrBeat {
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
        trace!("[AXI-R] AR {:?}", ar);
        ctx.bus.ar.send(ar).await;
        ctx.stats.burst_issued();
    }

    bursts.iter().map(|b| b.beats).collect()
}

fn fail(ctx: &ReadContext, completion: Completion<ReadResponse>, err: AxiError) {
    ctx.tracker.finish();
    completion.complete(Err(err));
}

async fn collect_loop(ctx: Arc<ReadContext>, beat_tx: Vec<mpsc::UnboundedSender<ReadDataBeat>>) {
    loop {
        let r = ctx.bus.r.recv().await;
        trace!("[AXI-R] R {:?}", r);
        let id = r.id as usize;

        // Every beat needs an open burst; the last beat of a burst closes it.
        let matched = if r.last {
            ctx.tracker.claim_burst(id)
        } else {
            ctx.tracker.outstanding(id) > 0
        };
        if !matched {
            let err = AxiError::UnexpectedResponseId {
                direction: Direction::Read,
                id: r.id,
            };
            error!("[AXI-R] {}", err);
            ctx.tracker.raise_fault(err);
            continue;
        }
        if beat_tx[id].send(r).is_err() {
            break;
        }
    }
}

async fn reassemble_loop(
    ctx: Arc<ReadContext>,
    id: usize,
    mut desc_rx: mpsc::UnboundedReceiver<ReadDescriptor>,
    mut beat_rx: mpsc::UnboundedReceiver<ReadDataBeat>,
) {
    let mut fault_rx = ctx.tracker.watch_fault();

    while let Some(desc) = desc_rx.recv().await {
        let result = tokio::select! {
            biased;
            resp = collect_beats(&ctx, id, &desc, &mut beat_rx) => match resp {
                Some(resp) => resp,
                None => return,
            },
            err = fault_raised(&mut fault_rx) => {
                debug!("[AXI-R] id={} addr={:#x} failed: {}", id, desc.addr, err);
                fail(&ctx, desc.completion, err);
                continue;
            }
        };
        ctx.tracker.finish();
        desc.completion.complete(Ok(result));
    }
}

/// Receives every R beat of `desc` and stitches the active lanes together.
async fn collect_beats(
    ctx: &ReadContext,
    id: usize,
    desc: &ReadDescriptor,
    beat_rx: &mut mpsc::UnboundedReceiver<ReadDataBeat>,
) -> Option<ReadResponse> {
    let plan = LanePlan::new(desc.addr, desc.length, desc.size, ctx.byte_lanes);
    let mut lanes = plan.beats();
    let mut data = Vec::with_capacity(desc.length);
    let mut resp = Resp::Okay;
    let mut user = Vec::with_capacity(desc.cycles);

    for &beats in &desc.bursts {
        for k in 0..beats {
            let r = beat_rx.recv().await?;
            if r.last != (k + 1 == beats) {
                warn!(
                    "[AXI-R] id={} beat {} of {} has last={}",
                    id,
                    k + 1,
                    beats,
                    r.last
                );
            }
            if !r.resp.is_okay() {
                ctx.stats.error_response();
            }
            resp = resp.merge(r.resp);
            user.push(r.user);
            ctx.stats.beat_transferred();

            if let Some(range) = lanes.next() {
                match r.data.get(range.clone()) {
                    Some(bytes) => data.extend_from_slice(bytes),
                    None => {
                        warn!("[AXI-R] id={} short data beat ({} bytes)", id, r.data.len());
                        data.resize(data.len() + range.len(), 0);
                    }
                }
            }
        }
    }
    data.truncate(desc.length);

    debug!(
        "[AXI-R] done id={} addr={:#x} len={} size={} beats={} prot={:#05b} resp={}",
        id, desc.addr, desc.length, desc.size, desc.cycles, desc.prot, resp
    );
    ctx.stats.command_completed(desc.length);
    Some(ReadResponse {
        addr: desc.addr,
        data,
        resp,
        user,
    })
}
