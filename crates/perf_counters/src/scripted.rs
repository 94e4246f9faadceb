use std::collections::VecDeque;
use std::io;

use crate::{CounterBackend, CounterError, ReadFailure};

/// In-memory counter set that replays scripted snapshots.
///
/// Every call to [`CounterBackend::read_into`] consumes one queued snapshot.
/// Once the queue is empty, a set built with [`ScriptedCounters::monotonic`]
/// keeps producing values by adding its per-counter increments; otherwise the
/// read fails as if the kernel returned no data.
///
/// This is useful for testing the sampling loop without perf access.
pub struct ScriptedCounters {
    width: usize,
    snapshots: VecDeque<Vec<i64>>,
    increments: Option<Vec<i64>>,
    current: Vec<i64>,
    reads: usize,
    fail_on_read: Option<usize>,
    closed: bool,
}

impl ScriptedCounters {
    /// Creates an empty script for `width` counters
    pub fn new(width: usize) -> Self {
        Self {
            width,
            snapshots: VecDeque::new(),
            increments: None,
            current: vec![0; width],
            reads: 0,
            fail_on_read: None,
            closed: false,
        }
    }

    /// Creates a script from a list of snapshots, consumed in order
    pub fn with_snapshots<I>(width: usize, snapshots: I) -> Self
    where
        I: IntoIterator<Item = Vec<i64>>,
    {
        let mut counters = Self::new(width);
        counters.snapshots.extend(snapshots);
        counters
    }

    /// Creates counters that grow by `increments` on every read
    pub fn monotonic(increments: Vec<i64>) -> Self {
        let mut counters = Self::new(increments.len());
        counters.increments = Some(increments);
        counters
    }

    /// Queues one more snapshot
    pub fn push_snapshot(&mut self, snapshot: Vec<i64>) {
        self.snapshots.push_back(snapshot);
    }

    /// Makes the read call with zero-based sequence number `n` fail
    pub fn fail_on_read(mut self, n: usize) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    /// Number of group reads performed so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Returns true once the set has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn next_snapshot(&mut self) -> Result<Vec<i64>, CounterError> {
        let seq = self.reads;
        self.reads += 1;

        if self.fail_on_read == Some(seq) {
            return Err(CounterError::ReadError {
                index: 0,
                reason: ReadFailure::ShortRead { got: 0 },
            });
        }

        if let Some(snapshot) = self.snapshots.pop_front() {
            if snapshot.len() != self.width {
                return Err(CounterError::BufferMismatch {
                    expected: self.width,
                    got: snapshot.len(),
                });
            }
            self.current.clone_from(&snapshot);
            return Ok(snapshot);
        }

        match &self.increments {
            Some(increments) => {
                for (value, step) in self.current.iter_mut().zip(increments) {
                    *value += step;
                }
                Ok(self.current.clone())
            }
            None => Err(CounterError::ReadError {
                index: 0,
                reason: ReadFailure::Os(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "counter script exhausted",
                )),
            }),
        }
    }
}

impl CounterBackend for ScriptedCounters {
    fn len(&self) -> usize {
        self.width
    }

    fn read_into(&mut self, out: &mut [i64]) -> Result<(), CounterError> {
        if self.closed {
            return Err(CounterError::Closed);
        }
        if out.len() != self.width {
            return Err(CounterError::BufferMismatch {
                expected: self.width,
                got: out.len(),
            });
        }

        let snapshot = self.next_snapshot()?;
        out.copy_from_slice(&snapshot);
        Ok(())
    }

    fn read(&mut self, index: usize) -> Result<i64, CounterError> {
        if self.closed {
            return Err(CounterError::Closed);
        }
        if index >= self.width {
            return Err(CounterError::IndexOutOfRange {
                index,
                len: self.width,
            });
        }
        let snapshot = self.next_snapshot()?;
        Ok(snapshot[index])
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
