//! Simulator configuration.
//!
//! Follows the same builder-free, struct-update configuration pattern as
//! `fuel-vm::interpreter::InterpreterParams` /
//! `fuel_vm::gas::GasCosts`: a plain `Default`-implementing struct that
//! callers override with `Config { issue_width: 4, ..Default::default() }`
//! or the explicit [`ConfigBuilder`] for call sites that prefer method
//! chaining.

/// Supported pipeline issue widths.
pub const VALID_ISSUE_WIDTHS: [u32; 5] = [1, 2, 4, 6, 8];

/// Geometry for one level of the cache hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    pub size_bytes: u64,
    pub associativity: u32,
    pub block_size: u32,
    pub hit_latency: u32,
    pub miss_latency: u32,
    /// Whether a second miss may proceed while an earlier one at this
    /// level is still outstanding. The baseline model requires this to
    /// be `false`; see DESIGN.md.
    pub allow_overlapping_misses: bool,
}

impl CacheConfig {
    pub const fn sets(&self) -> u64 {
        self.size_bytes / (self.block_size as u64 * self.associativity as u64)
    }
}

/// Per-level cache defaults approximating the Apple M2 P-core.
impl CacheConfig {
    pub const L1I: Self = Self {
        size_bytes: 192 * 1024,
        associativity: 6,
        block_size: 64,
        hit_latency: 1,
        miss_latency: 12,
        allow_overlapping_misses: false,
    };
    pub const L1D: Self = Self {
        size_bytes: 128 * 1024,
        associativity: 8,
        block_size: 64,
        hit_latency: 4,
        miss_latency: 12,
        allow_overlapping_misses: false,
    };
    pub const L2: Self = Self {
        size_bytes: 24 * 1024 * 1024,
        associativity: 16,
        block_size: 128,
        hit_latency: 12,
        miss_latency: 200,
        allow_overlapping_misses: false,
    };
}

/// Per-operation-class latencies in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Latencies {
    pub alu: u32,
    pub branch: u32,
    pub branch_mispredict_penalty: u32,
    pub load: u32,
    pub store: u32,
    pub multiply: u32,
    pub divide_min: u32,
    pub divide_max: u32,
    pub syscall: u32,
}

impl Default for Latencies {
    fn default() -> Self {
        Self {
            alu: 1,
            branch: 1,
            branch_mispredict_penalty: 8,
            load: 4,
            store: 1,
            multiply: 3,
            divide_min: 7,
            divide_max: 24,
            syscall: 1,
        }
    }
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    pub issue_width: u32,
    /// Functional-emulator retired-instruction cap. 0 = unlimited.
    pub max_instructions: u64,
    /// Timing-pipeline cycle cap. 0 = unlimited.
    pub max_cycles: u64,
    pub enable_icache: bool,
    pub enable_dcache: bool,
    pub l1i: CacheConfig,
    pub l1d: CacheConfig,
    pub l2: CacheConfig,
    pub latencies: Latencies,
    pub default_program_break: u64,
    pub default_mmap_base: u64,
    /// Branch target buffer entry count; defaults to a direct-mapped
    /// 1024-entry BTB.
    pub btb_entries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issue_width: 4,
            max_instructions: 0,
            max_cycles: 0,
            enable_icache: true,
            enable_dcache: true,
            l1i: CacheConfig::L1I,
            l1d: CacheConfig::L1D,
            l2: CacheConfig::L2,
            latencies: Latencies::default(),
            default_program_break: 0x1000_0000,
            default_mmap_base: 0x4000_0000,
            btb_entries: 1024,
        }
    }
}

impl Config {
    /// Validates invariants a hand-built `Config` can violate that
    /// `Default` never would (e.g. a caller picking an unsupported issue
    /// width, or enabling unsupported cache-overlap).
    pub fn validate(&self) -> Result<(), String> {
        if !VALID_ISSUE_WIDTHS.contains(&self.issue_width) {
            return Err(format!(
                "issue_width must be one of {VALID_ISSUE_WIDTHS:?}, got {}",
                self.issue_width
            ));
        }
        for (name, cache) in [("l1i", &self.l1i), ("l1d", &self.l1d), ("l2", &self.l2)] {
            if cache.allow_overlapping_misses {
                return Err(format!(
                    "{name}.allow_overlapping_misses is not implemented yet; must be false"
                ));
            }
        }
        Ok(())
    }
}

/// Method-chaining alternative to `Config { .., ..Default::default() }`,
/// for call sites that prefer a builder, the way `fuel-tx`'s
/// `TransactionBuilder` sits alongside `fuel-vm`'s plain
/// `InterpreterParams` struct literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigBuilder(Config);

impl ConfigBuilder {
    pub fn new() -> Self {
        Self(Config::default())
    }

    pub fn issue_width(mut self, width: u32) -> Self {
        self.0.issue_width = width;
        self
    }

    pub fn max_instructions(mut self, max: u64) -> Self {
        self.0.max_instructions = max;
        self
    }

    pub fn max_cycles(mut self, max: u64) -> Self {
        self.0.max_cycles = max;
        self
    }

    pub fn enable_icache(mut self, enable: bool) -> Self {
        self.0.enable_icache = enable;
        self
    }

    pub fn enable_dcache(mut self, enable: bool) -> Self {
        self.0.enable_dcache = enable;
        self
    }

    pub fn latencies(mut self, latencies: Latencies) -> Self {
        self.0.latencies = latencies;
        self
    }

    pub fn build(self) -> Result<Config, String> {
        self.0.validate()?;
        Ok(self.0)
    }
}
