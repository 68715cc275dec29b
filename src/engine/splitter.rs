//! Burst splitting and byte-lane planning.
//!
//! A transfer of arbitrary length and alignment is cut into INCR bursts that
//! respect the 256-beat limit and never straddle a 4KB boundary. Every beat
//! of the transfer is also assigned the range of byte lanes it carries, which
//! becomes the write strobe on the W channel and the extraction window on
//! the R channel.

use std::ops::Range;

use crate::common::constants::{BOUNDARY_4K, MAX_BURST_LEN};

/// One address-phase command worth of beats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Burst {
    /// Start address, aligned to the beat size.
    pub addr: u64,
    /// Beat count, 1..=256.
    pub beats: usize,
}

impl Burst {
    /// AxLEN encoding of this burst.
    pub fn len_field(&self) -> u8 {
        (self.beats - 1) as u8
    }
}

/// Splits `[address, address + transfer_len)` into bursts of `2^beat_size`
/// byte beats.
///
/// `max_burst_len` is clamped into `[1, 256]`. The first burst starts at the
/// beat-aligned address at or below `address`. A zero-length transfer
/// produces no bursts.
pub fn split_bursts(
    address: u64,
    transfer_len: usize,
    beat_size: u8,
    max_burst_len: usize,
) -> Vec<Burst> {
    if transfer_len == 0 {
        return Vec::new();
    }

    let num_bytes = 1u64 << beat_size;
    let max_len = max_burst_len.clamp(1, MAX_BURST_LEN) as u64;
    let aligned_addr = (address / num_bytes) * num_bytes;
    let cycles = (transfer_len as u64 + address % num_bytes).div_ceil(num_bytes);

    let mut bursts = Vec::new();
    let mut cur_addr = aligned_addr;
    let mut issued = 0u64;

    while issued < cycles {
        let beats = (cycles - issued).min(max_len);
        let room = BOUNDARY_4K - (cur_addr % BOUNDARY_4K);
        let beats = (beats * num_bytes).min(room).div_ceil(num_bytes);

        bursts.push(Burst {
            addr: cur_addr,
            beats: beats as usize,
        });
        issued += beats;
        // Only the final burst can end exactly at the top of the address space.
        match cur_addr.checked_add(beats * num_bytes) {
            Some(next) => cur_addr = next,
            None => break,
        }
    }

    bursts
}

/// Byte-lane layout of a transfer on a bus of `byte_lanes` lanes.
///
/// Narrow transfers (beat size smaller than the bus) rotate through the bus
/// lanes beat by beat, as INCR addressing requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanePlan {
    num_bytes: usize,
    byte_lanes: usize,
    start_offset: usize,
    end_offset: usize,
    first_cycle_offset: usize,
    cycles: usize,
}

impl LanePlan {
    pub fn new(address: u64, length: usize, beat_size: u8, byte_lanes: usize) -> Self {
        let num_bytes = 1usize << beat_size;
        let lanes = byte_lanes as u64;
        let aligned_addr = (address / num_bytes as u64) * num_bytes as u64;
        let word_addr = (address / lanes) * lanes;
        let cycles = if length == 0 {
            0
        } else {
            (length + (address % num_bytes as u64) as usize).div_ceil(num_bytes)
        };
        let end_offset = if length == 0 {
            0
        } else {
            (address.wrapping_add(length as u64 - 1) % lanes) as usize + 1
        };

        Self {
            num_bytes,
            byte_lanes,
            start_offset: (address % lanes) as usize,
            end_offset,
            first_cycle_offset: (aligned_addr - word_addr) as usize,
            cycles,
        }
    }

    /// Total number of data beats in the transfer.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Active lane range of every beat, in transfer order.
    pub fn beats(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let mut cycle_offset = self.first_cycle_offset;
        (0..self.cycles).map(move |k| {
            let mut start = cycle_offset;
            let mut stop = cycle_offset + self.num_bytes;
            if k == 0 {
                start = self.start_offset;
            }
            if k == self.cycles - 1 {
                stop = self.end_offset;
            }
            cycle_offset = (cycle_offset + self.num_bytes) % self.byte_lanes;
            start..stop
        })
    }
}

/// Write-strobe mask enabling exactly the lanes in `lanes`.
pub fn lane_mask(lanes: Range<usize>) -> u128 {
    let width = lanes.end.saturating_sub(lanes.start);
    if width == 0 {
        return 0;
    }
    let ones = if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    ones << lanes.start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_4k_boundary_split() {
        let bursts = split_bursts(0x0FFE, 8, 0, 256);
        assert_eq!(
            bursts,
            vec![
                Burst { addr: 0x0FFE, beats: 2 },
                Burst { addr: 0x1000, beats: 6 },
            ]
        );
    }

    #[test]
    fn test_max_burst_len_is_clamped() {
        let zero = split_bursts(0, 4, 0, 0);
        assert_eq!(zero.len(), 4);
        assert!(zero.iter().all(|b| b.beats == 1));

        let huge = split_bursts(0, 4096, 0, 10_000);
        assert_eq!(huge.len(), 16);
        assert!(huge.iter().all(|b| b.beats == 256));
    }

    #[test]
    fn test_unaligned_start_rounds_down() {
        let bursts = split_bursts(0x1003, 6, 2, 256);
        assert_eq!(bursts, vec![Burst { addr: 0x1000, beats: 3 }]);
    }

    #[test]
    fn test_zero_length() {
        assert!(split_bursts(0x100, 0, 2, 16).is_empty());
        assert_eq!(LanePlan::new(0x100, 0, 2, 4).cycles(), 0);
    }

    #[test]
    fn test_top_of_address_space() {
        let bursts = split_bursts(u64::MAX - 7, 8, 3, 256);
        assert_eq!(
            bursts,
            vec![Burst {
                addr: u64::MAX - 7,
                beats: 1
            }]
        );
        let bursts = split_bursts(u64::MAX - 5, 6, 2, 256);
        assert_eq!(bursts.iter().map(|b| b.beats).sum::<usize>(), 2);

        let plan = LanePlan::new(u64::MAX - 5, 6, 2, 4);
        let lanes: Vec<_> = plan.beats().collect();
        assert_eq!(lanes, vec![2..4, 0..4]);
    }

    #[test]
    fn test_lane_mask() {
        assert_eq!(lane_mask(0..4), 0xF);
        assert_eq!(lane_mask(1..3), 0b0110);
        assert_eq!(lane_mask(0..128), u128::MAX);
        assert_eq!(lane_mask(2..2), 0);
    }

    #[test]
    fn test_lane_plan_full_width() {
        let plan = LanePlan::new(0x2, 9, 2, 4);
        let lanes: Vec<_> = plan.beats().collect();
        assert_eq!(lanes, vec![2..4, 0..4, 0..3]);
    }

    #[test]
    fn test_lane_plan_narrow_rotates() {
        let plan = LanePlan::new(0x1, 4, 0, 4);
        let lanes: Vec<_> = plan.beats().collect();
        assert_eq!(lanes, vec![1..2, 2..3, 3..4, 0..1]);
    }
}
