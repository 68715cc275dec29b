//! Engine statistics collection and reporting.
//!
//! Tracks command, burst and beat counts per engine direction. Counters are
//! updated concurrently by the pipeline tasks, so they are atomics; a
//! `StatsSnapshot` freezes them for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::common::Direction;

/// Live counters for one engine direction.
pub struct EngineStats {
    direction: Direction,
    commands: AtomicU64,
    completed: AtomicU64,
    bursts: AtomicU64,
    beats: AtomicU64,
    bytes: AtomicU64,
    error_responses: AtomicU64,
    flushed: AtomicU64,
}

impl EngineStats {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            commands: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            bursts: AtomicU64::new(0),
            beats: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            error_responses: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
        }
    }

    pub(crate) fn command_submitted(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn burst_issued(&self) {
        self.bursts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn beat_transferred(&self) {
        self.beats.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn error_response(&self) {
        self.error_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn command_completed(&self, bytes: usize) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn commands_flushed(&self, n: usize) {
        self.flushed.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            direction: self.direction,
            commands: self.commands.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            bursts: self.bursts.load(Ordering::Relaxed),
            beats: self.beats.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            error_responses: self.error_responses.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of an engine's counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub direction: Direction,
    /// Commands accepted by `submit`.
    pub commands: u64,
    /// Commands resolved with a bus response.
    pub completed: u64,
    pub bursts: u64,
    /// Data beats sent (write) or received (read).
    pub beats: u64,
    /// Payload bytes of completed commands.
    pub bytes: u64,
    /// Bursts (write) or beats (read) answered with a non-OKAY code.
    pub error_responses: u64,
    /// Commands discarded by reset.
    pub flushed: u64,
}

/// Combined report printed by the self-test binary.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub host_seconds: f64,
    pub write: StatsSnapshot,
    pub read: StatsSnapshot,
}

impl Report {
    /// Prints a formatted summary of both engine directions.
    pub fn print(&self) {
        let seconds = if self.host_seconds > 0.0 {
            self.host_seconds
        } else {
            f64::EPSILON
        };
        let total_bytes = self.write.bytes + self.read.bytes;
        let mbps = (total_bytes as f64 / seconds) / 1_000_000.0;

        println!("\n==========================================================");
        println!("AXI MASTER STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", self.host_seconds);
        println!("bytes_total              {}", total_bytes);
        println!("throughput               {:.2} MB/s", mbps);

        for s in [&self.write, &self.read] {
            let avg_burst = if s.bursts > 0 {
                s.beats as f64 / s.bursts as f64
            } else {
                0.0
            };
            println!("----------------------------------------------------------");
            println!("{} ENGINE", s.direction.to_string().to_uppercase());
            println!("  commands               {}", s.commands);
            println!("  completed              {}", s.completed);
            println!("  flushed                {}", s.flushed);
            println!("  bursts                 {}", s.bursts);
            println!("  beats                  {}", s.beats);
            println!("  beats_per_burst        {:.2}", avg_burst);
            println!("  bytes                  {}", s.bytes);
            println!("  error_responses        {}", s.error_responses);
        }
        println!("==========================================================");
    }
}
