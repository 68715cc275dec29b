//! Flat RAM device.

use super::traits::Device;

/// Byte-addressable memory of fixed size mapped at `base`.
pub struct Ram {
    base: u64,
    data: Vec<u8>,
}

impl Ram {
    /// Creates a zero-filled RAM of `size` bytes.
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    /// Copies `bytes` into the RAM at `offset`, truncating at the end.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) {
        if offset >= self.data.len() {
            return;
        }
        let n = bytes.len().min(self.data.len() - offset);
        self.data[offset..offset + n].copy_from_slice(&bytes[..n]);
    }

    /// Returns a copy of `len` bytes at `offset`, truncated at the end.
    pub fn dump(&self, offset: usize, len: usize) -> Vec<u8> {
        let start = offset.min(self.data.len());
        let end = offset.saturating_add(len).min(self.data.len());
        self.data[start..end].to_vec()
    }
}

impl Device for Ram {
    fn name(&self) -> &str {
        "RAM"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base, self.data.len() as u64)
    }

    #[inline(always)]
    fn read_u8(&mut self, offset: u64) -> u8 {
        self.data.get(offset as usize).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn write_u8(&mut self, offset: u64, val: u8) {
        if let Some(b) = self.data.get_mut(offset as usize) {
            *b = val;
        }
    }
}
