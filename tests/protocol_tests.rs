//! Protocol-level tests driving the slave side of the bus by hand.
//!
//! These tests play the slave themselves so that response order, ID
//! interleaving and malformed responses can be controlled exactly.

use std::time::Duration;

use axi_master::bus::{ReadDataBeat, WriteRespBeat};
use axi_master::common::{AxiError, BurstType, Direction, LockType, Resp};
use axi_master::config::BusConfig;
use axi_master::engine::{AxiMaster, ReadRequest, WriteRequest};
use axi_master::AxiBus;

fn setup() -> (AxiBus, AxiMaster) {
    let config = BusConfig {
        data_width: 32,
        id_width: 2,
        channel_queue_depth: 0,
        ..BusConfig::default()
    };
    let bus = AxiBus::new(&config);
    let master = AxiMaster::new(&bus, &config).expect("master");
    (bus, master)
}

/// Consumes one AW beat and its W beats, returning the AW ID.
async fn drain_write(bus: &AxiBus) -> u32 {
    let aw = bus.write.aw.recv().await;
    for _ in 0..aw.beats() {
        bus.write.w.recv().await;
    }
    aw.id
}

fn b(id: u32, resp: Resp, user: u64) -> WriteRespBeat {
    WriteRespBeat { id, resp, user }
}

fn r(id: u32, data: [u8; 4], last: bool, user: u64) -> ReadDataBeat {
    ReadDataBeat {
        id,
        data: data.to_vec(),
        resp: Resp::Okay,
        last,
        user,
    }
}

/// Tests AW field encoding, W strobes, last flags and per-beat WUSER.
#[tokio::test]
async fn test_write_channel_encoding() {
    let (bus, master) = setup();
    let data: Vec<u8> = (1..=10).collect();
    let req = WriteRequest::new(0x1002, data)
        .id(2)
        .burst(BurstType::Incr)
        .lock(LockType::Exclusive)
        .cache(0xF)
        .prot(0b001)
        .qos(3)
        .region(1)
        .user(0x55)
        .wuser(vec![10, 11, 12]);
    let pending = master.submit_write(req).unwrap();

    let aw = bus.write.aw.recv().await;
    assert_eq!(aw.id, 2);
    assert_eq!(aw.addr, 0x1000);
    assert_eq!(aw.len, 2);
    assert_eq!(aw.size, 2);
    assert_eq!(aw.burst, BurstType::Incr);
    assert_eq!(aw.lock, LockType::Exclusive);
    assert_eq!(aw.cache, 0xF);
    assert_eq!(aw.prot, 0b001);
    assert_eq!(aw.qos, 3);
    assert_eq!(aw.region, 1);
    assert_eq!(aw.user, 0x55);

    let w0 = bus.write.w.recv().await;
    let w1 = bus.write.w.recv().await;
    let w2 = bus.write.w.recv().await;
    assert_eq!((w0.strb, w1.strb, w2.strb), (0b1100, 0b1111, 0b1111));
    assert_eq!(&w0.data[2..], &[1, 2]);
    assert_eq!(w1.data, vec![3, 4, 5, 6]);
    assert_eq!(w2.data, vec![7, 8, 9, 10]);
    assert_eq!((w0.last, w1.last, w2.last), (false, false, true));
    assert_eq!((w0.user, w1.user, w2.user), (10, 11, 12));
    assert!(bus.write.w.is_empty());

    bus.write.b.send(b(2, Resp::ExOkay, 9)).await;
    let resp = pending.await.unwrap();
    assert_eq!(resp.resp, Resp::ExOkay);
    assert_eq!(resp.user, vec![9]);
    assert_eq!(resp.length, 10);
}

/// Tests that AR carries the read attributes.
#[tokio::test]
async fn test_read_channel_encoding() {
    let (bus, master) = setup();
    let _pending = master
        .submit_read(ReadRequest::new(0x7, 6).id(1).size(1).prot(0b100).user(3))
        .unwrap();
    let ar = bus.read.ar.recv().await;
    assert_eq!(ar.id, 1);
    assert_eq!(ar.addr, 0x6);
    assert_eq!(ar.size, 1);
    assert_eq!(ar.len, 3);
    assert_eq!(ar.prot, 0b100);
    assert_eq!(ar.user, 3);
    assert_eq!(master.read_engine().tracker().outstanding(1), 1);
}

/// Tests that write completions on one ID resolve in submission order while
/// other IDs complete independently.
#[tokio::test(start_paused = true)]
async fn test_write_per_id_ordering() {
    let (bus, master) = setup();
    let mut w0 = master.submit_write(WriteRequest::new(0x0, vec![1; 4]).id(0)).unwrap();
    let mut w1 = master.submit_write(WriteRequest::new(0x10, vec![2; 4]).id(0)).unwrap();
    let w2 = master.submit_write(WriteRequest::new(0x20, vec![3; 4]).id(1)).unwrap();

    assert_eq!(drain_write(&bus).await, 0);
    assert_eq!(drain_write(&bus).await, 0);
    assert_eq!(drain_write(&bus).await, 1);
    assert_eq!(master.write_engine().tracker().outstanding(0), 2);

    bus.write.b.send(b(1, Resp::Okay, 300)).await;
    assert_eq!(w2.await.unwrap().user, vec![300]);
    assert!(tokio::time::timeout(Duration::from_millis(10), &mut w0).await.is_err());

    bus.write.b.send(b(0, Resp::Okay, 100)).await;
    let first = tokio::time::timeout(Duration::from_millis(10), &mut w0)
        .await
        .expect("first write on ID 0 resolves first")
        .unwrap();
    assert_eq!(first.addr, 0x0);
    assert_eq!(first.user, vec![100]);
    assert!(tokio::time::timeout(Duration::from_millis(10), &mut w1).await.is_err());

    bus.write.b.send(b(0, Resp::SlvErr, 200)).await;
    let second = w1.await.unwrap();
    assert_eq!(second.addr, 0x10);
    assert_eq!(second.resp, Resp::SlvErr);
    assert_eq!(master.write_engine().tracker().outstanding(0), 0);
    master.wait_idle().await;
}

/// Tests reassembly of R beats interleaved across IDs.
#[tokio::test]
async fn test_read_interleaved_ids() {
    let (bus, master) = setup();
    let r0 = master.submit_read(ReadRequest::new(0x0, 8).id(0)).unwrap();
    let r1 = master.submit_read(ReadRequest::new(0x100, 8).id(1)).unwrap();
    let r2 = master.submit_read(ReadRequest::new(0x202, 2).id(0)).unwrap();

    let ids = [
        bus.read.ar.recv().await.id,
        bus.read.ar.recv().await.id,
        bus.read.ar.recv().await.id,
    ];
    assert_eq!(ids, [0, 1, 0]);

    bus.read.r.send(r(1, [1, 2, 3, 4], false, 1)).await;
    bus.read.r.send(r(0, [10, 11, 12, 13], false, 2)).await;
    bus.read.r.send(r(1, [5, 6, 7, 8], true, 3)).await;
    bus.read.r.send(r(0, [14, 15, 16, 17], true, 4)).await;
    bus.read.r.send(r(0, [0, 0, 20, 21], true, 5)).await;

    let a = r0.await.unwrap();
    assert_eq!(a.data, vec![10, 11, 12, 13, 14, 15, 16, 17]);
    assert_eq!(a.user, vec![2, 4]);
    let c = r1.await.unwrap();
    assert_eq!(c.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(c.user, vec![1, 3]);
    let d = r2.await.unwrap();
    assert_eq!(d.data, vec![20, 21]);
    assert_eq!(d.resp, Resp::Okay);
    master.wait_idle().await;
}

/// Tests that a B beat on an idle ID faults the write engine only.
#[tokio::test]
async fn test_unexpected_write_response_id() {
    let (bus, mut master) = setup();
    let first = master.submit_write(WriteRequest::new(0x40, vec![7; 4]).id(1)).unwrap();
    let second = master.submit_write(WriteRequest::new(0x80, vec![8; 4]).id(0)).unwrap();
    assert_eq!(drain_write(&bus).await, 1);
    assert_eq!(drain_write(&bus).await, 0);

    bus.write.b.send(b(3, Resp::Okay, 0)).await;
    let fault = master.write_engine().tracker().wait_fault().await;
    let expected = AxiError::UnexpectedResponseId {
        direction: Direction::Write,
        id: 3,
    };
    assert_eq!(fault, expected);
    assert_eq!(master.fault(), Some(expected.clone()));

    let err = master
        .submit_write(WriteRequest::new(0x0, vec![0; 4]))
        .unwrap_err();
    assert_eq!(err, expected);

    // Writes already in flight resolve with the fault instead of hanging.
    let first = tokio::time::timeout(Duration::from_secs(1), first).await.unwrap();
    let second = tokio::time::timeout(Duration::from_secs(1), second).await.unwrap();
    assert_eq!(first.unwrap_err(), expected);
    assert_eq!(second.unwrap_err(), expected);
    master.write_engine().tracker().wait_idle().await;

    // The read engine keeps accepting work.
    let read = master.submit_read(ReadRequest::new(0x0, 4).id(2)).unwrap();
    bus.read.ar.recv().await;
    bus.read.r.send(r(2, [9, 9, 9, 9], true, 0)).await;
    assert_eq!(read.await.unwrap().data, vec![9; 4]);

    master.reset().await;
    assert_eq!(master.fault(), None);
    assert!(master.submit_write(WriteRequest::new(0x0, vec![0; 4])).is_ok());
}

/// Tests that R beats on an idle ID fault the read engine.
#[tokio::test]
async fn test_unexpected_read_response_id() {
    let (bus, master) = setup();
    let pending = master.submit_read(ReadRequest::new(0x10, 8).id(1)).unwrap();
    assert_eq!(bus.read.ar.recv().await.id, 1);

    bus.read.r.send(r(1, [1; 4], false, 0)).await;
    bus.read.r.send(r(2, [0; 4], false, 0)).await;
    let fault = master.read_engine().tracker().wait_fault().await;
    let expected = AxiError::UnexpectedResponseId {
        direction: Direction::Read,
        id: 2,
    };
    assert_eq!(fault, expected);
    assert!(master.write_engine().tracker().fault().is_none());
    assert!(master.submit_read(ReadRequest::new(0x0, 4)).is_err());

    // The half-received read fails rather than waiting for its last beat.
    let result = tokio::time::timeout(Duration::from_secs(1), pending).await.unwrap();
    assert_eq!(result.unwrap_err(), expected);
    assert!(master.read_engine().tracker().idle());
}

/// Tests that writes queued behind a full channel fail once a fault is latched.
#[tokio::test]
async fn test_fault_fails_queued_writes() {
    let config = BusConfig {
        data_width: 32,
        id_width: 2,
        channel_queue_depth: 1,
        ..BusConfig::default()
    };
    let bus = AxiBus::new(&config);
    let master = AxiMaster::new(&bus, &config).unwrap();

    let pending: Vec<_> = (0..3u64)
        .map(|i| master.submit_write(WriteRequest::new(i * 0x100, vec![0xA5; 16])).unwrap())
        .collect();
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert_eq!(bus.write.aw.len(), 1);

    bus.write.b.send(b(2, Resp::Okay, 0)).await;
    for p in pending {
        let result = tokio::time::timeout(Duration::from_secs(1), p).await.unwrap();
        assert!(matches!(
            result.unwrap_err(),
            AxiError::UnexpectedResponseId { id: 2, .. }
        ));
    }
    assert!(master.idle());
}

/// Tests that a duplicate B response is detected rather than miscounted.
#[tokio::test]
async fn test_duplicate_write_response() {
    let (bus, master) = setup();
    let pending = master.submit_write(WriteRequest::new(0x0, vec![1; 4]).id(0)).unwrap();
    drain_write(&bus).await;
    bus.write.b.send(b(0, Resp::Okay, 0)).await;
    bus.write.b.send(b(0, Resp::Okay, 0)).await;

    assert_eq!(pending.await.unwrap().resp, Resp::Okay);
    let fault = master.write_engine().tracker().wait_fault().await;
    assert!(matches!(fault, AxiError::UnexpectedResponseId { id: 0, .. }));
    assert_eq!(master.write_engine().tracker().outstanding(0), 0);
}

/// Tests rejection of out-of-range submission parameters.
#[tokio::test]
async fn test_invalid_parameters() {
    let (bus, master) = setup();
    let err = master
        .submit_write(WriteRequest::new(0x0, vec![0; 8]).size(3))
        .unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));
    let err = master
        .submit_write(WriteRequest::new(0x0, vec![0; 8]).id(4))
        .unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));
    let err = master.submit_read(ReadRequest::new(0x0, 8).size(7)).unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));
    let err = master.submit_read(ReadRequest::new(0x0, 8).id(9)).unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));

    tokio::task::yield_now().await;
    assert!(master.idle());
    assert!(bus.write.aw.is_empty());
    assert!(bus.read.ar.is_empty());
    assert_eq!(master.report(0.0).write.commands, 0);
}

/// Tests that transfers running past the address space are refused up front.
#[tokio::test]
async fn test_address_range_checks() {
    let (bus, master) = setup();
    let err = master
        .submit_write(WriteRequest::new(u64::MAX - 3, vec![1; 8]))
        .unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));
    let err = master
        .submit_write(WriteRequest::new(0xFFFF_FFFC, vec![1; 8]))
        .unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));
    let err = master.submit_read(ReadRequest::new(0x1_0000_0000, 4)).unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));
    tokio::task::yield_now().await;
    assert!(bus.write.aw.is_empty());
    assert!(bus.read.ar.is_empty());
    assert!(master.idle());

    // The last word of the address space is still reachable.
    let pending = master
        .submit_write(WriteRequest::new(0xFFFF_FFFC, vec![1; 4]))
        .unwrap();
    let aw = bus.write.aw.recv().await;
    assert_eq!(aw.addr, 0xFFFF_FFFC);
    bus.write.w.recv().await;
    bus.write.b.send(b(aw.id, Resp::Okay, 0)).await;
    assert_eq!(pending.await.unwrap().resp, Resp::Okay);
}

/// Tests a write ending exactly at the top of a 64-bit address space.
#[tokio::test]
async fn test_top_of_64bit_address_space() {
    let config = BusConfig {
        data_width: 64,
        addr_width: 64,
        channel_queue_depth: 0,
        ..BusConfig::default()
    };
    let bus = AxiBus::new(&config);
    let master = AxiMaster::new(&bus, &config).unwrap();

    let pending = master
        .submit_write(WriteRequest::new(u64::MAX - 7, vec![3; 8]))
        .unwrap();
    let aw = bus.write.aw.recv().await;
    assert_eq!(aw.addr, u64::MAX - 7);
    assert_eq!(aw.beats(), 1);
    assert_eq!(bus.write.w.recv().await.strb, 0xFF);
    bus.write.b.send(b(aw.id, Resp::Okay, 0)).await;
    assert_eq!(pending.await.unwrap().resp, Resp::Okay);

    let err = master.submit_read(ReadRequest::new(u64::MAX, 2)).unwrap_err();
    assert!(matches!(err, AxiError::InvalidParameter(_)));
}

/// Tests that the idle signal is already low when the last handle resolves.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_idle_when_handle_resolves() {
    let (bus, master) = setup();
    for i in 0..32u64 {
        let pending = master
            .submit_write(WriteRequest::new(i * 4, vec![0; 4]).id(1))
            .unwrap();
        drain_write(&bus).await;
        bus.write.b.send(b(1, Resp::Okay, 0)).await;
        pending.await.unwrap();
        assert!(master.idle(), "in flight after completion {}", i);
    }
}

/// Tests that the idle signal follows the in-flight count.
#[tokio::test]
async fn test_idle_tracks_in_flight() {
    let (bus, master) = setup();
    assert!(master.idle());
    let pending: Vec<_> = (0..3)
        .map(|i| master.submit_write(WriteRequest::new(i * 4, vec![0; 4]).id(0)).unwrap())
        .collect();
    assert!(!master.idle());
    assert_eq!(master.write_engine().tracker().in_flight(), 3);

    for _ in 0..3 {
        drain_write(&bus).await;
    }
    for _ in 0..3 {
        bus.write.b.send(b(0, Resp::Okay, 0)).await;
    }
    for p in pending {
        p.await.unwrap();
    }
    master.wait_idle().await;
    assert!(master.idle());
}

/// Tests that IDs are assigned round-robin when none is given.
#[tokio::test]
async fn test_round_robin_ids() {
    let (bus, master) = setup();
    let _pending: Vec<_> = (0..6)
        .map(|i| master.submit_read(ReadRequest::new(i * 4, 4)).unwrap())
        .collect();
    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(bus.read.ar.recv().await.id);
    }
    assert_eq!(ids, vec![0, 1, 2, 3, 0, 1]);
}
