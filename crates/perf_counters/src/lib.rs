//! # perf_counters
//!
//! Opens a small set of performance counters bound to the calling thread and
//! reads them back as raw 64-bit values. The [`CounterBackend`] trait is the
//! seam between the sampling loop and the platform: [`PerfCounterSet`] is the
//! Linux `perf_event_open` implementation, [`ScriptedCounters`] replays
//! canned snapshots for tests and dry runs.

mod descriptor;
mod error;
mod perf_set;
mod scripted;

pub use descriptor::*;
pub use error::*;
pub use perf_set::*;
pub use scripted::*;

/// Size in bytes of one counter value as returned by the kernel.
pub const COUNTER_VALUE_SIZE: usize = std::mem::size_of::<u64>();

/// A set of open counters that can be read as a group or one at a time.
///
/// Values are reported in the order the counters were opened.
pub trait CounterBackend {
    /// Number of counters in the set
    fn len(&self) -> usize;

    /// Returns true if the set holds no counters
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads every counter into `out`, which must hold exactly `len()` slots.
    fn read_into(&mut self, out: &mut [i64]) -> Result<(), CounterError>;

    /// Reads a single counter by index.
    fn read(&mut self, index: usize) -> Result<i64, CounterError>;

    /// Reads every counter into a freshly allocated vector.
    fn read_all(&mut self) -> Result<Vec<i64>, CounterError> {
        let mut values = vec![0; self.len()];
        self.read_into(&mut values)?;
        Ok(values)
    }

    /// Releases all counter handles. Further reads fail with
    /// [`CounterError::Closed`]. Calling this more than once is a no-op.
    fn close(&mut self);
}

impl<B: CounterBackend + ?Sized> CounterBackend for Box<B> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read_into(&mut self, out: &mut [i64]) -> Result<(), CounterError> {
        (**self).read_into(out)
    }

    fn read(&mut self, index: usize) -> Result<i64, CounterError> {
        (**self).read(index)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
