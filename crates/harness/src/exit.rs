use perf_counters::CounterError;
use sampler::{ConfigError, SamplerError};

/// Process exit statuses, one per failing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    /// Anything not classified below
    Other = 1,
    /// Invalid run configuration
    Config = 2,
    /// A counter is not supported by the host, or failed to open
    CounterUnavailable = 3,
    /// Not allowed to open hardware counters
    PermissionDenied = 4,
    /// A counter read failed mid-run
    SamplingAborted = 5,
    /// Writing the console dump or the export failed
    Export = 6,
}

impl From<ExitStatus> for u8 {
    fn from(status: ExitStatus) -> u8 {
        status as u8
    }
}

fn counter_status(err: &CounterError) -> ExitStatus {
    match err {
        CounterError::PermissionDenied { .. } => ExitStatus::PermissionDenied,
        CounterError::CounterUnavailable { .. } | CounterError::OpenFailed { .. } => {
            ExitStatus::CounterUnavailable
        }
        _ => ExitStatus::SamplingAborted,
    }
}

/// Picks the exit status for a fatal error by inspecting its chain
pub fn exit_status(err: &anyhow::Error) -> ExitStatus {
    if let Some(e) = err.downcast_ref::<CounterError>() {
        return counter_status(e);
    }
    if let Some(e) = err.downcast_ref::<SamplerError>() {
        return match e {
            SamplerError::Config(_) => ExitStatus::Config,
            SamplerError::SamplingAborted { .. } => ExitStatus::SamplingAborted,
            SamplerError::Sink { .. } | SamplerError::SinkFinish(_) => ExitStatus::Export,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return ExitStatus::Config;
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return ExitStatus::Export;
    }
    ExitStatus::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use perf_counters::{CounterDescriptor, ReadFailure};
    use std::io;

    fn open_error(errno: i32) -> anyhow::Error {
        let err = CounterError::from_open(0, CounterDescriptor::INSTRUCTIONS, io::Error::from_raw_os_error(errno));
        Err::<(), _>(err)
            .context("opening performance counters")
            .unwrap_err()
    }

    #[test]
    fn test_open_failures_are_distinct() {
        assert_eq!(exit_status(&open_error(libc::EACCES)), ExitStatus::PermissionDenied);
        assert_eq!(exit_status(&open_error(libc::ENOENT)), ExitStatus::CounterUnavailable);
    }

    #[test]
    fn test_sampling_aborted() {
        let err = SamplerError::SamplingAborted {
            iteration: 3,
            source: CounterError::ReadError {
                index: 1,
                reason: ReadFailure::ShortRead { got: 4 },
            },
        };
        let err = Err::<(), _>(err).context("sampling").unwrap_err();
        assert_eq!(exit_status(&err), ExitStatus::SamplingAborted);
        assert_eq!(u8::from(exit_status(&err)), 5);
    }

    #[test]
    fn test_config_and_export() {
        let config = anyhow::Error::new(ConfigError::ZeroPeriod);
        assert_eq!(exit_status(&config), ExitStatus::Config);

        let sink = anyhow::Error::new(SamplerError::SinkFinish(io::Error::new(
            io::ErrorKind::Other,
            "broken pipe",
        )));
        assert_eq!(exit_status(&sink), ExitStatus::Export);

        let io = Err::<(), _>(io::Error::new(io::ErrorKind::NotFound, "no dir"))
            .context("writing export")
            .unwrap_err();
        assert_eq!(exit_status(&io), ExitStatus::Export);

        assert_eq!(exit_status(&anyhow::anyhow!("something else")), ExitStatus::Other);
    }
}
