use perf_counters::CounterBackend;
use sampler::{RunSummary, SampleSink, Sampler, SamplerError};

use crate::{Factorial, MemoryScan, Spin};

/// Every workload the harness knows about.
///
/// The enum is matched once, outside the sampling loop, so the sampler is
/// monomorphized over the concrete workload and no dispatch happens inside a
/// bracket.
#[derive(Debug, Clone)]
pub enum WorkloadKind {
    Factorial(Factorial),
    Spin(Spin),
    MemoryScan(MemoryScan),
}

impl WorkloadKind {
    /// Names accepted by [`WorkloadKind::from_name`]
    pub const NAMES: [&'static str; 3] = ["factorial", "spin", "memory"];

    /// Builds the default configuration of the named workload
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "factorial" => Some(WorkloadKind::Factorial(Factorial::default())),
            "spin" => Some(WorkloadKind::Spin(Spin::default())),
            "memory" => Some(WorkloadKind::MemoryScan(MemoryScan::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkloadKind::Factorial(_) => "factorial",
            WorkloadKind::Spin(_) => "spin",
            WorkloadKind::MemoryScan(_) => "memory",
        }
    }

    /// Runs `sampler` over the concrete workload held by this variant
    pub fn run_with<C, S>(&self, sampler: &mut Sampler<C>, sink: &mut S) -> Result<RunSummary, SamplerError>
    where
        C: CounterBackend,
        S: SampleSink + ?Sized,
    {
        match self {
            WorkloadKind::Factorial(w) => sampler.run(w, sink),
            WorkloadKind::Spin(w) => sampler.run(w, sink),
            WorkloadKind::MemoryScan(w) => sampler.run(w, sink),
        }
    }
}
