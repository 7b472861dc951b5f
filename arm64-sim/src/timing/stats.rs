//! Timing-pipeline statistics with a human-readable report, in the same
//! shape as `fuel-vm`'s `ProfilingData`/`Profiler` split
//! (`fuel-vm/src/profiler.rs`): a plain counters struct paired with a
//! `Display` impl for the ambient reporting surface.

use core::fmt;

/// Hit/miss counters for one cache in the hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        if self.accesses() == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses() as f64
        }
    }
}

/// A full run's worth of pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statistics {
    pub cycles: u64,
    pub instructions: u64,
    pub exec_stalls: u64,
    pub mem_stalls: u64,
    pub structural_stalls: u64,
    pub flushes: u64,
    pub branch_predictions: u64,
    pub mispredictions: u64,
    pub correct: u64,
    pub folded: u64,
    pub icache: CacheStats,
    pub dcache: CacheStats,
    pub l2: CacheStats,
}

impl Statistics {
    /// Cycles per instruction; `0.0` before anything has retired.
    pub fn cpi(&self) -> f64 {
        if self.instructions == 0 {
            0.0
        } else {
            self.cycles as f64 / self.instructions as f64
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cycles:             {}", self.cycles)?;
        writeln!(f, "instructions:       {}", self.instructions)?;
        writeln!(f, "cpi:                {:.3}", self.cpi())?;
        writeln!(f, "exec stalls:        {}", self.exec_stalls)?;
        writeln!(f, "mem stalls:         {}", self.mem_stalls)?;
        writeln!(f, "structural stalls:  {}", self.structural_stalls)?;
        writeln!(f, "flushes:            {}", self.flushes)?;
        writeln!(
            f,
            "branches:           {} ({} correct, {} mispredicted, {} folded)",
            self.branch_predictions, self.correct, self.mispredictions, self.folded
        )?;
        writeln!(
            f,
            "icache:             {}/{} ({:.1}% hit)",
            self.icache.hits,
            self.icache.accesses(),
            self.icache.hit_rate() * 100.0
        )?;
        writeln!(
            f,
            "dcache:             {}/{} ({:.1}% hit)",
            self.dcache.hits,
            self.dcache.accesses(),
            self.dcache.hit_rate() * 100.0
        )?;
        write!(
            f,
            "l2:                 {}/{} ({:.1}% hit)",
            self.l2.hits,
            self.l2.accesses(),
            self.l2.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests;
