use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::constants::{MAX_BURST_LEN, MAX_BYTE_LANES, MAX_ID_WIDTH};
use crate::common::ConfigError;

const DATA_WIDTH: u32 = 32;
const ADDR_WIDTH: u32 = 32;
const ID_WIDTH: u32 = 8;
const CHANNEL_QUEUE_DEPTH: usize = 16;

const DEFAULT_RAM_BASE: u64 = 0x0;
const DEFAULT_RAM_SIZE: usize = 0x1_0000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub ram: RamConfig,
}

impl Config {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.bus.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Shape of the AXI interface the master drives.
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Data bus width in bits.
    #[serde(default = "default_data_width")]
    pub data_width: u32,

    #[serde(default = "default_addr_width")]
    pub addr_width: u32,

    /// ID field width in bits. The engine runs one reassembly task per ID.
    #[serde(default = "default_id_width")]
    pub id_width: u32,

    /// Requested burst length cap. Clamped to [1, 256] when used.
    #[serde(default = "default_max_burst_len")]
    pub max_burst_len: usize,

    /// Occupancy limit of each bus channel; 0 leaves channels unbounded.
    #[serde(default = "default_channel_queue_depth")]
    pub channel_queue_depth: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            data_width: DATA_WIDTH,
            addr_width: ADDR_WIDTH,
            id_width: ID_WIDTH,
            max_burst_len: MAX_BURST_LEN,
            channel_queue_depth: CHANNEL_QUEUE_DEPTH,
        }
    }
}

impl BusConfig {
    /// Number of byte lanes on the data bus.
    pub fn byte_lanes(&self) -> usize {
        (self.data_width / 8) as usize
    }

    /// Largest legal AxSIZE for this bus.
    pub fn max_size(&self) -> u8 {
        self.byte_lanes().trailing_zeros() as u8
    }

    /// Number of distinct transaction IDs.
    pub fn id_count(&self) -> usize {
        1usize << self.id_width
    }

    /// Burst length cap actually applied by the splitter.
    pub fn effective_burst_len(&self) -> usize {
        self.max_burst_len.clamp(1, MAX_BURST_LEN)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lanes = self.byte_lanes();
        if self.data_width % 8 != 0 || !lanes.is_power_of_two() || lanes > MAX_BYTE_LANES {
            return Err(ConfigError::Invalid(format!(
                "data_width must be a power of two between 8 and {} bits, got {}",
                MAX_BYTE_LANES * 8,
                self.data_width
            )));
        }
        if self.addr_width == 0 || self.addr_width > 64 {
            return Err(ConfigError::Invalid(format!(
                "addr_width must be between 1 and 64 bits, got {}",
                self.addr_width
            )));
        }
        if self.id_width > MAX_ID_WIDTH {
            return Err(ConfigError::Invalid(format!(
                "id_width must be at most {} bits, got {}",
                MAX_ID_WIDTH, self.id_width
            )));
        }
        Ok(())
    }
}

/// Memory model served by the slave in the self-test binary.
#[derive(Debug, Clone, Deserialize)]
pub struct RamConfig {
    #[serde(default = "default_ram_base")]
    pub base: String,

    #[serde(default = "default_ram_size")]
    pub size: String,
}

impl Default for RamConfig {
    fn default() -> Self {
        Self {
            base: default_ram_base(),
            size: default_ram_size(),
        }
    }
}

impl RamConfig {
    pub fn base_val(&self) -> u64 {
        parse_hex(&self.base, DEFAULT_RAM_BASE)
    }

    pub fn size_val(&self) -> usize {
        parse_hex(&self.size, DEFAULT_RAM_SIZE as u64) as usize
    }
}

fn parse_hex(s: &str, default: u64) -> u64 {
    let s = s.trim_start_matches("0x").replace('_', "");
    u64::from_str_radix(&s, 16).unwrap_or(default)
}

fn default_data_width() -> u32 {
    DATA_WIDTH
}

fn default_addr_width() -> u32 {
    ADDR_WIDTH
}

fn default_id_width() -> u32 {
    ID_WIDTH
}

fn default_max_burst_len() -> usize {
    MAX_BURST_LEN
}

fn default_channel_queue_depth() -> usize {
    CHANNEL_QUEUE_DEPTH
}

fn default_ram_base() -> String {
    format!("{:#x}", DEFAULT_RAM_BASE)
}

fn default_ram_size() -> String {
    format!("{:#x}", DEFAULT_RAM_SIZE)
}
