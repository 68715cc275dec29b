//! Unit tests for burst splitting and lane planning.

use axi_master::common::{BOUNDARY_4K, MAX_BURST_LEN};
use axi_master::engine::{lane_mask, split_bursts, Burst, LanePlan};

/// Checks the splitter invariants for one transfer.
fn check_split(address: u64, len: usize, size: u8, max_burst_len: usize) -> Vec<Burst> {
    let bursts = split_bursts(address, len, size, max_burst_len);
    let num_bytes = 1u64 << size;
    let clamp = max_burst_len.clamp(1, MAX_BURST_LEN);
    let aligned = address & !(num_bytes - 1);
    let end = address + len as u64;

    let mut cursor = aligned;
    for b in &bursts {
        assert_eq!(b.addr, cursor, "bursts must be contiguous");
        assert_eq!(b.addr % num_bytes, 0, "burst start must be beat aligned");
        assert!(b.beats >= 1 && b.beats <= clamp);
        let last = b.addr + b.beats as u64 * num_bytes - 1;
        assert_eq!(
            b.addr / BOUNDARY_4K,
            last / BOUNDARY_4K,
            "burst {:?} crosses a 4KB boundary",
            b
        );
        cursor += b.beats as u64 * num_bytes;
    }
    if len > 0 {
        assert!(cursor >= end, "bursts must cover the transfer");
        assert!(cursor - end < num_bytes, "bursts must not overshoot a beat");
    }
    bursts
}

/// Tests the invariants over a grid of addresses, lengths and sizes.
#[test]
fn test_split_invariants() {
    for &address in &[0x0u64, 0x1, 0x3, 0x7FF, 0xFF0, 0xFFE, 0x1FFF, 0x12345] {
        for &len in &[0usize, 1, 2, 7, 64, 255, 1000, 4096, 9000] {
            for size in 0..=3u8 {
                for &max in &[0usize, 1, 4, 16, 256, 300] {
                    check_split(address, len, size, max);
                }
            }
        }
    }
}

/// Tests the canonical 4KB boundary case.
#[test]
fn test_split_at_4k_boundary() {
    let bursts = check_split(0x0FFE, 8, 0, 256);
    assert_eq!(
        bursts,
        vec![
            Burst { addr: 0x0FFE, beats: 2 },
            Burst { addr: 0x1000, beats: 6 },
        ]
    );
    assert_eq!(bursts[0].len_field(), 1);
    assert_eq!(bursts[1].len_field(), 5);
}

/// Tests that a long transfer honors the configured burst length.
#[test]
fn test_split_respects_max_burst_len() {
    let bursts = check_split(0x0, 256, 2, 16);
    assert_eq!(bursts.len(), 4);
    assert!(bursts.iter().all(|b| b.beats == 16));
}

/// Tests that a full 4KB aligned page fits in as few bursts as allowed.
#[test]
fn test_split_full_page() {
    let bursts = check_split(0x2000, 4096, 3, 256);
    assert_eq!(bursts, vec![Burst { addr: 0x2000, beats: 256 }, Burst { addr: 0x2800, beats: 256 }]);
}

/// Tests that zero-length transfers produce no bursts.
#[test]
fn test_split_zero_length() {
    assert!(split_bursts(0xABC, 0, 2, 256).is_empty());
}

/// Tests lane layout for an unaligned full-width transfer.
#[test]
fn test_lane_plan_unaligned() {
    let plan = LanePlan::new(0x1006, 10, 3, 8);
    assert_eq!(plan.cycles(), 2);
    let lanes: Vec<_> = plan.beats().collect();
    assert_eq!(lanes, vec![6..8, 0..8]);
}

/// Tests lane layout for 16-bit beats on a 64-bit bus.
#[test]
fn test_lane_plan_narrow_halfword() {
    let plan = LanePlan::new(0x2, 8, 1, 8);
    let lanes: Vec<_> = plan.beats().collect();
    assert_eq!(lanes, vec![2..4, 4..6, 6..8, 0..2]);
    let total: usize = plan.beats().map(|r| r.len()).sum();
    assert_eq!(total, 8);
}

/// Tests that the lane plan beat count matches the splitter.
#[test]
fn test_lane_plan_matches_split() {
    for &(addr, len, size) in &[(0x0u64, 33usize, 2u8), (0x3, 100, 0), (0xFFD, 20, 1), (0x10, 4096, 2)] {
        let beats: usize = split_bursts(addr, len, size, 256).iter().map(|b| b.beats).sum();
        let plan = LanePlan::new(addr, len, size, 4);
        assert_eq!(plan.cycles(), beats);
        let bytes: usize = plan.beats().map(|r| r.len()).sum();
        assert_eq!(bytes, len);
    }
}

/// Tests strobe masks.
#[test]
fn test_lane_mask_values() {
    assert_eq!(lane_mask(0..1), 0x1);
    assert_eq!(lane_mask(3..4), 0x8);
    assert_eq!(lane_mask(2..8), 0xFC);
    assert_eq!(lane_mask(64..128), u128::MAX << 64);
}
