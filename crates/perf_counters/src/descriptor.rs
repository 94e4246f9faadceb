use std::fmt;

/// Generalized hardware events exposed by the CPU's PMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardwareEvent {
    /// CPU cycles
    Cycles,
    /// Retired instructions
    Instructions,
    /// Last-level cache references
    CacheReferences,
    /// Last-level cache misses
    CacheMisses,
    /// Retired branch instructions
    BranchInstructions,
    /// Mispredicted branches
    BranchMisses,
}

/// Events maintained by the kernel rather than the PMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftwareEvent {
    /// Per-CPU high resolution timer
    CpuClock,
    /// Clock specific to the task that is running, in nanoseconds
    TaskClock,
    /// Page faults
    PageFaults,
    /// Context switches
    ContextSwitches,
    /// Migrations of the task to another CPU
    CpuMigrations,
}

/// Cache being observed by a [`CacheEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheLevel {
    L1D,
    L1I,
    LL,
    DTLB,
    ITLB,
    BPU,
    Node,
}

/// Kind of cache access being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    Read,
    Write,
    Prefetch,
}

/// Whether hits (accesses) or misses are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheResult {
    Access,
    Miss,
}

/// A (level, operation, result) cache event triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheEvent {
    pub level: CacheLevel,
    pub op: CacheOp,
    pub result: CacheResult,
}

impl CacheEvent {
    /// Creates a new cache event
    pub fn new(level: CacheLevel, op: CacheOp, result: CacheResult) -> Self {
        Self { level, op, result }
    }
}

/// Configuration for one counter: its domain and the event within it.
///
/// Descriptors are plain values; each one maps to exactly one open handle in
/// a counter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterDescriptor {
    Hardware(HardwareEvent),
    Software(SoftwareEvent),
    Cache(CacheEvent),
}

impl CounterDescriptor {
    /// Retired instructions
    pub const INSTRUCTIONS: Self = Self::Hardware(HardwareEvent::Instructions);

    /// Task clock, in nanoseconds
    pub const TASK_CLOCK: Self = Self::Software(SoftwareEvent::TaskClock);

    /// L1 data cache read misses
    pub const L1D_READ_MISS: Self = Self::Cache(CacheEvent {
        level: CacheLevel::L1D,
        op: CacheOp::Read,
        result: CacheResult::Miss,
    });

    /// Returns the name of the counter domain
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Hardware(_) => "hardware",
            Self::Software(_) => "software",
            Self::Cache(_) => "cache",
        }
    }
}

impl fmt::Display for CounterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(event) => {
                let name = match event {
                    HardwareEvent::Cycles => "cycles",
                    HardwareEvent::Instructions => "instructions",
                    HardwareEvent::CacheReferences => "cache-references",
                    HardwareEvent::CacheMisses => "cache-misses",
                    HardwareEvent::BranchInstructions => "branches",
                    HardwareEvent::BranchMisses => "branch-misses",
                };
                f.write_str(name)
            }
            Self::Software(event) => {
                let name = match event {
                    SoftwareEvent::CpuClock => "cpu-clock",
                    SoftwareEvent::TaskClock => "task-clock",
                    SoftwareEvent::PageFaults => "page-faults",
                    SoftwareEvent::ContextSwitches => "context-switches",
                    SoftwareEvent::CpuMigrations => "cpu-migrations",
                };
                f.write_str(name)
            }
            Self::Cache(event) => {
                let level = match event.level {
                    CacheLevel::L1D => "L1D",
                    CacheLevel::L1I => "L1I",
                    CacheLevel::LL => "LLC",
                    CacheLevel::DTLB => "dTLB",
                    CacheLevel::ITLB => "iTLB",
                    CacheLevel::BPU => "branch",
                    CacheLevel::Node => "node",
                };
                let op = match event.op {
                    CacheOp::Read => "read",
                    CacheOp::Write => "write",
                    CacheOp::Prefetch => "prefetch",
                };
                let result = match event.result {
                    CacheResult::Access => "access",
                    CacheResult::Miss => "miss",
                };
                write!(f, "{}-{}-{}", level, op, result)
            }
        }
    }
}
