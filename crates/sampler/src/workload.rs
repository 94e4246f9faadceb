/// A unit of work with an expensive and a cheap variant.
///
/// Implementations must not carry state from one call to the next; the
/// sampler treats every call as an opaque, self-contained invocation.
pub trait Workload {
    /// Runs the deliberately expensive path
    fn run_slow(&self);

    /// Runs the cheap baseline of the same operation family
    fn run_fast(&self);

    /// Short name for logs
    fn name(&self) -> &str {
        "workload"
    }
}

/// Which variant of a workload an iteration runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Slow,
    Fast,
}

impl Variant {
    /// Slow when `iteration % period == 0`, fast otherwise.
    ///
    /// A period of 0 never selects the slow path.
    pub fn for_iteration(iteration: usize, period: usize) -> Self {
        match iteration.checked_rem(period) {
            Some(0) => Variant::Slow,
            _ => Variant::Fast,
        }
    }

    pub fn is_slow(&self) -> bool {
        matches!(self, Variant::Slow)
    }

    /// Resolves the variant to a plain function pointer for `W`
    pub fn entry_point<W: Workload>(&self) -> fn(&W) {
        match self {
            Variant::Slow => W::run_slow,
            Variant::Fast => W::run_fast,
        }
    }
}
