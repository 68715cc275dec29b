//! Protocol constants.

/// Maximum number of beats in a single INCR burst.
pub const MAX_BURST_LEN: usize = 256;

/// Bursts may not cross this address boundary.
pub const BOUNDARY_4K: u64 = 0x1000;

/// Widest supported data bus in bytes (1024 bits).
pub const MAX_BYTE_LANES: usize = 128;

/// Widest supported ID field in bits.
pub const MAX_ID_WIDTH: u32 = 16;

/// Default AxCACHE: normal non-cacheable bufferable.
pub const DEFAULT_CACHE: u8 = 0b0011;

/// Default AxPROT: unprivileged, non-secure, data access.
pub const DEFAULT_PROT: u8 = 0b010;
