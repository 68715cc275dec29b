//! AXI4 Master Self-Test CLI.
//!
//! Builds a master and a RAM-backed slave on one interface, writes a
//! pattern through the write engine, reads it back through the read engine
//! and compares. Prints the engine statistics at the end.
//!
//! # Usage
//!
//! ```text
//! axi-master --config configs/default.toml --transfers 64 --length 300 --stride 0x200
//! ```

use std::error::Error;
use std::process;
use std::time::Instant;

use clap::Parser;
use log::{error, info};

use axi_master::config::Config;
use axi_master::engine::{AxiMaster, ReadRequest, WriteRequest};
use axi_master::soc::{AxiSlave, Ram};
use axi_master::AxiBus;

/// Command-line arguments for the self-test.
#[derive(Parser, Debug)]
#[command(author, version, about = "AXI4 bus master self-test")]
struct Args {
    #[arg(short, long, default_value = "configs/default.toml")]
    config: String,

    /// Number of write/read pairs.
    #[arg(short, long, default_value_t = 16)]
    transfers: usize,

    /// Bytes per transfer.
    #[arg(short, long, default_value_t = 256)]
    length: usize,

    /// Address distance between transfers (decimal or 0x hex).
    #[arg(short, long, default_value = "0x100", value_parser = parse_num)]
    stride: u64,

    /// Beat size as log2 bytes; defaults to the full bus width.
    #[arg(long)]
    size: Option<u8>,

    /// Print statistics as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_num(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn pattern(transfer: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(7).wrapping_add(transfer as u8))
        .collect()
}

/// Main entry point.
///
/// # Behavior
///
/// 1. **Configuration**: Parses arguments and loads the TOML configuration.
/// 2. **Initialization**: Builds the bus, a RAM slave and the master.
/// 3. **Traffic**: Submits all writes, waits, then submits all reads.
/// 4. **Teardown**: Prints statistics and exits non-zero on any mismatch.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("[!] failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(0) => {}
        Ok(mismatches) => {
            error!("{} transfers failed verification", mismatches);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("[!] {}", e);
            process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<usize, Box<dyn Error>> {
    let config = Config::from_file(&args.config)?;

    println!("Global Configuration");
    println!("--------------------");
    println!("Bus:");
    println!("  Data Width:         {} bits", config.bus.data_width);
    println!("  Address Width:      {} bits", config.bus.addr_width);
    println!("  ID Width:           {} bits", config.bus.id_width);
    println!("  Max Burst:          {} beats", config.bus.effective_burst_len());
    println!("  Queue Depth:        {}", config.bus.channel_queue_depth);
    println!("RAM:");
    println!("  Base:               {:#x}", config.ram.base_val());
    println!("  Size:               {} KB", config.ram.size_val() / 1024);
    println!("Traffic:");
    println!("  Transfers:          {}", args.transfers);
    println!("  Length:             {} bytes", args.length);
    println!("  Stride:             {:#x}", args.stride);
    println!("--------------------");

    let bus = AxiBus::new(&config.bus);
    let slave = AxiSlave::new(
        bus.clone(),
        Ram::new(config.ram.base_val(), config.ram.size_val()),
    );
    let _slave_tasks = slave.spawn();
    let master = AxiMaster::new(&bus, &config.bus)?;

    let start = Instant::now();
    let base = config.ram.base_val();

    let mut writes = Vec::with_capacity(args.transfers);
    for t in 0..args.transfers {
        let mut req = WriteRequest::new(base + t as u64 * args.stride, pattern(t, args.length));
        if let Some(size) = args.size {
            req = req.size(size);
        }
        writes.push(master.submit_write(req)?);
    }
    let mut mismatches = 0;
    for (t, pending) in writes.into_iter().enumerate() {
        let resp = pending.await?;
        if !resp.resp.is_okay() {
            error!("[*] write {} at {:#x} returned {}", t, resp.addr, resp.resp);
            mismatches += 1;
        }
    }
    info!("[*] {} writes complete", args.transfers);

    let mut reads = Vec::with_capacity(args.transfers);
    for t in 0..args.transfers {
        let mut req = ReadRequest::new(base + t as u64 * args.stride, args.length);
        if let Some(size) = args.size {
            req = req.size(size);
        }
        reads.push(master.submit_read(req)?);
    }
    for (t, pending) in reads.into_iter().enumerate() {
        let resp = pending.await?;
        if !resp.resp.is_okay() || resp.data != pattern(t, args.length) {
            error!("[*] read {} at {:#x} mismatch (resp {})", t, resp.addr, resp.resp);
            mismatches += 1;
        }
    }
    info!("[*] {} reads complete", args.transfers);

    master.wait_idle().await;
    let report = master.report(start.elapsed().as_secs_f64());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(mismatches)
}
