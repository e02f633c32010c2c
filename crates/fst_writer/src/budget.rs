//! Arena size at which a block is sealed, and its growth for huge designs.

use std::fs;

use tracing::debug;

/// Largest break size the huge-design growth will reach.
pub const BREAK_SIZE_MAX: u64 = 1 << 31;

/// Handle count at which growth first triggers, and its step.
pub const HUGE_SIGNAL_STEP: u64 = 2_000_000;

/// Tracks the current break size.
#[derive(Clone, Debug)]
pub struct BreakBudget {
    size: u64,
    base: u64,
    ceiling: u64,
    step: u64,
    next_huge: u64,
}

impl BreakBudget {
    /// Creates a budget starting at `base`, growing up to a memory-derived
    /// ceiling.
    pub fn new(base: u64) -> Self {
        let ceiling = huge_ceiling(base, fs::read_to_string("/proc/meminfo").ok().as_deref());
        Self::with_ceiling(base, ceiling)
    }

    /// Creates a budget with an explicit ceiling.
    pub fn with_ceiling(base: u64, ceiling: u64) -> Self {
        Self::with_step(base, ceiling, HUGE_SIGNAL_STEP)
    }

    /// Creates a budget that grows every `step` handles.
    pub(crate) fn with_step(base: u64, ceiling: u64, step: u64) -> Self {
        Self {
            size: base,
            base,
            ceiling,
            step,
            next_huge: step,
        }
    }

    /// Current arena size that seals a block.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Grows the budget by its base amount at each multiple of
    /// [`HUGE_SIGNAL_STEP`] allocated handles, until the ceiling is hit.
    /// Aliases do not allocate handles and do not count.
    pub fn on_handle_allocated(&mut self, handles: u64) {
        if handles == self.next_huge && self.size < self.ceiling {
            self.next_huge += self.step;
            self.size += self.base;
            debug!(handles, break_size = self.size, "grew block break size");
        }
    }
}

/// One eighth of physical memory, capped at [`BREAK_SIZE_MAX`], when that
/// exceeds `base`; otherwise `base`.
pub fn huge_ceiling(base: u64, meminfo: Option<&str>) -> u64 {
    meminfo
        .and_then(mem_total_bytes)
        .map(|total| total / 8)
        .filter(|&eighth| eighth > base)
        .map_or(base, |eighth| eighth.min(BREAK_SIZE_MAX))
}

/// Parses the `MemTotal:` line of `/proc/meminfo` into bytes.
fn mem_total_bytes(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kib: u64 = line["MemTotal:".len()..]
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kib.saturating_mul(1024))
}
