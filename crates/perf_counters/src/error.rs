use std::io;

use thiserror::Error;

use crate::{CounterDescriptor, COUNTER_VALUE_SIZE};

/// Why a counter read did not produce a value.
#[derive(Debug, Error)]
pub enum ReadFailure {
    /// The read returned fewer bytes than a counter value
    #[error("short read: got {got} of {} bytes", COUNTER_VALUE_SIZE)]
    ShortRead { got: usize },

    /// The read syscall itself failed
    #[error("{0}")]
    Os(io::Error),
}

/// Errors from opening or reading performance counters
#[derive(Debug, Error)]
pub enum CounterError {
    /// The kernel or CPU does not support the requested event
    #[error("counter {index} ({descriptor}) is not available on this host: {source}")]
    CounterUnavailable {
        index: usize,
        descriptor: CounterDescriptor,
        source: io::Error,
    },

    /// The caller is not allowed to open the requested event
    #[error(
        "permission denied opening counter {index} ({descriptor}): {source}; \
         run with CAP_PERFMON/CAP_SYS_ADMIN or lower /proc/sys/kernel/perf_event_paranoid"
    )]
    PermissionDenied {
        index: usize,
        descriptor: CounterDescriptor,
        source: io::Error,
    },

    /// The open failed for any other reason
    #[error("failed to open counter {index} ({descriptor}): {source}")]
    OpenFailed {
        index: usize,
        descriptor: CounterDescriptor,
        source: io::Error,
    },

    /// A counter read returned malformed data or failed
    #[error("failed to read counter {index}: {reason}")]
    ReadError { index: usize, reason: ReadFailure },

    /// The output buffer length does not match the number of counters
    #[error("read buffer holds {got} values but {expected} counters are open")]
    BufferMismatch { expected: usize, got: usize },

    /// A counter index past the end of the set was requested
    #[error("counter index {index} out of range (set holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The set was closed before the read
    #[error("counter set is closed")]
    Closed,
}

impl CounterError {
    /// Classifies a failed open by its errno.
    pub fn from_open(index: usize, descriptor: CounterDescriptor, source: io::Error) -> Self {
        match source.raw_os_error() {
            Some(libc::EACCES) | Some(libc::EPERM) => Self::PermissionDenied {
                index,
                descriptor,
                source,
            },
            Some(libc::ENOENT)
            | Some(libc::ENODEV)
            | Some(libc::EOPNOTSUPP)
            | Some(libc::EINVAL) => Self::CounterUnavailable {
                index,
                descriptor,
                source,
            },
            _ if source.kind() == io::ErrorKind::Unsupported => Self::CounterUnavailable {
                index,
                descriptor,
                source,
            },
            _ => Self::OpenFailed {
                index,
                descriptor,
                source,
            },
        }
    }

    /// Returns true for errors raised while opening counters
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            Self::CounterUnavailable { .. } | Self::PermissionDenied { .. } | Self::OpenFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(libc::EPERM, "permission")]
    #[case(libc::EACCES, "permission")]
    #[case(libc::ENOENT, "unavailable")]
    #[case(libc::ENODEV, "unavailable")]
    #[case(libc::EINVAL, "unavailable")]
    #[case(libc::EOPNOTSUPP, "unavailable")]
    #[case(libc::EMFILE, "other")]
    fn test_open_errno_classification(#[case] errno: i32, #[case] expected: &str) {
        let err = CounterError::from_open(
            1,
            CounterDescriptor::TASK_CLOCK,
            io::Error::from_raw_os_error(errno),
        );
        let class = match err {
            CounterError::PermissionDenied { .. } => "permission",
            CounterError::CounterUnavailable { .. } => "unavailable",
            CounterError::OpenFailed { .. } => "other",
            _ => panic!("unexpected error variant: {:?}", err),
        };
        assert_eq!(class, expected);
        assert!(err.is_open_error());
    }

    #[test]
    fn test_unsupported_kind_is_unavailable() {
        let err = CounterError::from_open(
            0,
            CounterDescriptor::INSTRUCTIONS,
            io::Error::from(io::ErrorKind::Unsupported),
        );
        assert!(matches!(err, CounterError::CounterUnavailable { index: 0, .. }));
    }

    #[test]
    fn test_permission_message_names_the_fix() {
        let err = CounterError::from_open(
            2,
            CounterDescriptor::L1D_READ_MISS,
            io::Error::from_raw_os_error(libc::EACCES),
        );
        let msg = err.to_string();
        assert!(msg.contains("L1D-read-miss"));
        assert!(msg.contains("perf_event_paranoid"));
    }
}
