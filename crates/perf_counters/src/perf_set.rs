//! Linux `perf_event_open` counter set.
//!
//! Each descriptor becomes one perf event file descriptor bound to the calling
//! thread on any CPU, with no group leader and no flags. Counters start
//! enabled and are never reset, so values only grow for the life of the set.

use std::fs::File;
use std::io::{self, Read};

use log::debug;

use crate::{CounterBackend, CounterDescriptor, CounterError, ReadFailure, COUNTER_VALUE_SIZE};

/// Counter set backed by perf event file descriptors.
///
/// Handles are owned `File`s and are released when the set is closed or
/// dropped, whichever comes first.
pub struct PerfCounterSet {
    descriptors: Vec<CounterDescriptor>,
    files: Vec<File>,
    closed: bool,
}

impl PerfCounterSet {
    /// Opens one counter per descriptor for the calling thread.
    ///
    /// Fails as a whole if any single counter cannot be opened; counters
    /// opened before the failure are released before returning.
    pub fn open(descriptors: &[CounterDescriptor]) -> Result<Self, CounterError> {
        Self::open_with(descriptors, platform::open_for_current_thread)
    }

    /// Opens counters using `opener` for the per-descriptor open step.
    ///
    /// `opener` receives each descriptor in order and returns the handle to
    /// read from. Used to substitute the platform call.
    pub fn open_with<F>(descriptors: &[CounterDescriptor], mut opener: F) -> Result<Self, CounterError>
    where
        F: FnMut(&CounterDescriptor) -> io::Result<File>,
    {
        let mut files = Vec::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().enumerate() {
            match opener(descriptor) {
                Ok(file) => {
                    debug!("opened counter {} ({} {})", index, descriptor.domain(), descriptor);
                    files.push(file);
                }
                Err(source) => {
                    if !files.is_empty() {
                        debug!("releasing {} counters opened before failure", files.len());
                    }
                    // `files` is dropped here, closing every handle opened so far
                    return Err(CounterError::from_open(index, *descriptor, source));
                }
            }
        }

        Ok(Self {
            descriptors: descriptors.to_vec(),
            files,
            closed: false,
        })
    }

    /// Descriptors in open order
    pub fn descriptors(&self) -> &[CounterDescriptor] {
        &self.descriptors
    }

    fn read_file(file: &File, index: usize) -> Result<i64, CounterError> {
        let mut buf = [0u8; COUNTER_VALUE_SIZE];
        let mut reader = file;
        match reader.read(&mut buf) {
            Ok(n) if n == COUNTER_VALUE_SIZE => Ok(u64::from_ne_bytes(buf) as i64),
            Ok(got) => Err(CounterError::ReadError {
                index,
                reason: ReadFailure::ShortRead { got },
            }),
            Err(e) => Err(CounterError::ReadError {
                index,
                reason: ReadFailure::Os(e),
            }),
        }
    }
}

impl CounterBackend for PerfCounterSet {
    fn len(&self) -> usize {
        self.descriptors.len()
    }

    fn read_into(&mut self, out: &mut [i64]) -> Result<(), CounterError> {
        if self.closed {
            return Err(CounterError::Closed);
        }
        if out.len() != self.files.len() {
            return Err(CounterError::BufferMismatch {
                expected: self.files.len(),
                got: out.len(),
            });
        }

        for (index, (file, slot)) in self.files.iter().zip(out.iter_mut()).enumerate() {
            *slot = Self::read_file(file, index)?;
        }

        Ok(())
    }

    fn read(&mut self, index: usize) -> Result<i64, CounterError> {
        if self.closed {
            return Err(CounterError::Closed);
        }
        let file = self.files.get(index).ok_or(CounterError::IndexOutOfRange {
            index,
            len: self.files.len(),
        })?;
        Self::read_file(file, index)
    }

    fn close(&mut self) {
        if !self.closed {
            debug!("closing {} counters", self.files.len());
            self.files.clear();
            self.closed = true;
        }
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::fs::File;
    use std::io;
    use std::os::unix::io::FromRawFd;

    use perf_event_open_sys as sys;

    use crate::{CacheEvent, CacheLevel, CacheOp, CacheResult, CounterDescriptor, HardwareEvent, SoftwareEvent};

    /// Returns the perf `(type, config)` pair for a descriptor.
    pub(crate) fn event_code(descriptor: &CounterDescriptor) -> (u32, u64) {
        match descriptor {
            CounterDescriptor::Hardware(event) => {
                let config = match event {
                    HardwareEvent::Cycles => sys::bindings::PERF_COUNT_HW_CPU_CYCLES,
                    HardwareEvent::Instructions => sys::bindings::PERF_COUNT_HW_INSTRUCTIONS,
                    HardwareEvent::CacheReferences => sys::bindings::PERF_COUNT_HW_CACHE_REFERENCES,
                    HardwareEvent::CacheMisses => sys::bindings::PERF_COUNT_HW_CACHE_MISSES,
                    HardwareEvent::BranchInstructions => {
                        sys::bindings::PERF_COUNT_HW_BRANCH_INSTRUCTIONS
                    }
                    HardwareEvent::BranchMisses => sys::bindings::PERF_COUNT_HW_BRANCH_MISSES,
                };
                (sys::bindings::PERF_TYPE_HARDWARE, config as u64)
            }
            CounterDescriptor::Software(event) => {
                let config = match event {
                    SoftwareEvent::CpuClock => sys::bindings::PERF_COUNT_SW_CPU_CLOCK,
                    SoftwareEvent::TaskClock => sys::bindings::PERF_COUNT_SW_TASK_CLOCK,
                    SoftwareEvent::PageFaults => sys::bindings::PERF_COUNT_SW_PAGE_FAULTS,
                    SoftwareEvent::ContextSwitches => sys::bindings::PERF_COUNT_SW_CONTEXT_SWITCHES,
                    SoftwareEvent::CpuMigrations => sys::bindings::PERF_COUNT_SW_CPU_MIGRATIONS,
                };
                (sys::bindings::PERF_TYPE_SOFTWARE, config as u64)
            }
            CounterDescriptor::Cache(event) => (sys::bindings::PERF_TYPE_HW_CACHE, cache_config(event)),
        }
    }

    // level | op << 8 | result << 16
    fn cache_config(event: &CacheEvent) -> u64 {
        let level = match event.level {
            CacheLevel::L1D => sys::bindings::PERF_COUNT_HW_CACHE_L1D,
            CacheLevel::L1I => sys::bindings::PERF_COUNT_HW_CACHE_L1I,
            CacheLevel::LL => sys::bindings::PERF_COUNT_HW_CACHE_LL,
            CacheLevel::DTLB => sys::bindings::PERF_COUNT_HW_CACHE_DTLB,
            CacheLevel::ITLB => sys::bindings::PERF_COUNT_HW_CACHE_ITLB,
            CacheLevel::BPU => sys::bindings::PERF_COUNT_HW_CACHE_BPU,
            CacheLevel::Node => sys::bindings::PERF_COUNT_HW_CACHE_NODE,
        };
        let op = match event.op {
            CacheOp::Read => sys::bindings::PERF_COUNT_HW_CACHE_OP_READ,
            CacheOp::Write => sys::bindings::PERF_COUNT_HW_CACHE_OP_WRITE,
            CacheOp::Prefetch => sys::bindings::PERF_COUNT_HW_CACHE_OP_PREFETCH,
        };
        let result = match event.result {
            CacheResult::Access => sys::bindings::PERF_COUNT_HW_CACHE_RESULT_ACCESS,
            CacheResult::Miss => sys::bindings::PERF_COUNT_HW_CACHE_RESULT_MISS,
        };
        (level as u64) | ((op as u64) << 8) | ((result as u64) << 16)
    }

    pub(crate) fn open_for_current_thread(descriptor: &CounterDescriptor) -> io::Result<File> {
        let (type_, config) = event_code(descriptor);

        let mut attr = sys::bindings::perf_event_attr::default();
        attr.size = std::mem::size_of::<sys::bindings::perf_event_attr>() as u32;
        attr.type_ = type_;
        attr.config = config;

        // The thread id, not the process id: counters follow this thread only
        let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::pid_t;

        let fd = unsafe {
            sys::perf_event_open(
                &mut attr,
                tid,
                -1, // cpu (any)
                -1, // group_fd
                0,
            )
        };

        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(unsafe { File::from_raw_fd(fd) })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_l1d_read_miss_encoding() {
            let (type_, config) = event_code(&CounterDescriptor::L1D_READ_MISS);
            assert_eq!(type_, sys::bindings::PERF_TYPE_HW_CACHE);
            // L1D = 0, READ = 0, MISS = 1
            assert_eq!(config, 1 << 16);
        }

        #[test]
        fn test_llc_prefetch_access_encoding() {
            let event = CacheEvent::new(CacheLevel::LL, CacheOp::Prefetch, CacheResult::Access);
            let (_, config) = event_code(&CounterDescriptor::Cache(event));
            // LL = 2, PREFETCH = 2, ACCESS = 0
            assert_eq!(config, 2 | (2 << 8));
        }

        #[test]
        fn test_hardware_and_software_codes() {
            assert_eq!(
                event_code(&CounterDescriptor::INSTRUCTIONS),
                (sys::bindings::PERF_TYPE_HARDWARE, sys::bindings::PERF_COUNT_HW_INSTRUCTIONS as u64)
            );
            assert_eq!(
                event_code(&CounterDescriptor::TASK_CLOCK),
                (sys::bindings::PERF_TYPE_SOFTWARE, sys::bindings::PERF_COUNT_SW_TASK_CLOCK as u64)
            );
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use std::fs::File;
    use std::io;

    use crate::CounterDescriptor;

    pub(crate) fn open_for_current_thread(_descriptor: &CounterDescriptor) -> io::Result<File> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "perf_event_open is only available on Linux",
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;

    fn dev_null(_: &CounterDescriptor) -> io::Result<File> {
        File::open("/dev/null")
    }

    fn three() -> Vec<CounterDescriptor> {
        vec![
            CounterDescriptor::INSTRUCTIONS,
            CounterDescriptor::TASK_CLOCK,
            CounterDescriptor::L1D_READ_MISS,
        ]
    }

    #[test]
    fn test_open_with_fails_whole_set() {
        let mut calls = 0;
        let result = PerfCounterSet::open_with(&three(), |d| {
            calls += 1;
            if *d == CounterDescriptor::TASK_CLOCK {
                Err(io::Error::from_raw_os_error(libc::EACCES))
            } else {
                File::open("/dev/null")
            }
        });

        // Stops at the failing descriptor
        assert_eq!(calls, 2);
        match result {
            Err(CounterError::PermissionDenied { index, descriptor, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(descriptor, CounterDescriptor::TASK_CLOCK);
            }
            Err(e) => panic!("Expected PermissionDenied, got {:?}", e),
            Ok(_) => panic!("Expected open to fail"),
        }
    }

    #[test]
    fn test_open_with_unavailable_last_counter() {
        let result = PerfCounterSet::open_with(&three(), |d| {
            if *d == CounterDescriptor::L1D_READ_MISS {
                Err(io::Error::from_raw_os_error(libc::ENOENT))
            } else {
                File::open("/dev/null")
            }
        });
        assert!(matches!(result, Err(CounterError::CounterUnavailable { index: 2, .. })));
    }

    #[test]
    fn test_short_read_is_read_error() {
        let mut set = PerfCounterSet::open_with(&three(), dev_null).unwrap();
        assert_eq!(set.len(), 3);

        let err = set.read_all().unwrap_err();
        match err {
            CounterError::ReadError {
                index: 0,
                reason: ReadFailure::ShortRead { got: 0 },
            } => {}
            other => panic!("Expected short read on counter 0, got {:?}", other),
        }
    }

    #[test]
    fn test_read_values_in_open_order() {
        let mut values = tempfile::NamedTempFile::new().unwrap();
        values.write_all(&42u64.to_ne_bytes()).unwrap();
        values.write_all(&u64::MAX.to_ne_bytes()).unwrap();
        values.flush().unwrap();

        let descriptors = [CounterDescriptor::INSTRUCTIONS, CounterDescriptor::TASK_CLOCK];
        let mut set = PerfCounterSet::open_with(&descriptors, |_| File::open(values.path())).unwrap();

        // Each handle has its own offset, so both start at the first value
        assert_eq!(set.read_all().unwrap(), vec![42, 42]);
        // Raw u64 values are reinterpreted as i64
        assert_eq!(set.read(1).unwrap(), -1);
        assert!(matches!(
            set.read(1),
            Err(CounterError::ReadError {
                index: 1,
                reason: ReadFailure::ShortRead { got: 0 }
            })
        ));
        assert!(matches!(
            set.read(5),
            Err(CounterError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_closed_set_rejects_reads() {
        let mut set = PerfCounterSet::open_with(&three(), dev_null).unwrap();
        set.close();
        set.close();
        assert!(matches!(set.read_all(), Err(CounterError::Closed)));
        assert!(matches!(set.read(0), Err(CounterError::Closed)));
        assert_eq!(set.descriptors().len(), 3);
    }

    #[test]
    fn test_buffer_mismatch() {
        let mut set = PerfCounterSet::open_with(&three(), dev_null).unwrap();
        let mut out = [0i64; 2];
        assert!(matches!(
            set.read_into(&mut out),
            Err(CounterError::BufferMismatch { expected: 3, got: 2 })
        ));
    }
}
