use std::io;
use std::time::Instant;

use log::{debug, trace, warn};
use perf_counters::{CounterBackend, CounterError};
use thiserror::Error;

use crate::{ConfigError, Sample, SampleSink, SamplerConfig, Variant, Workload};

/// Errors that end a sampling run
#[derive(Error, Debug)]
pub enum SamplerError {
    /// The configuration is inconsistent with itself or the counter set
    #[error("invalid sampler configuration: {0}")]
    Config(#[from] ConfigError),

    /// A counter read failed inside a bracket; no further samples are taken
    #[error("sampling aborted at iteration {iteration}: {source}")]
    SamplingAborted {
        iteration: usize,
        source: CounterError,
    },

    /// The sink refused a sample
    #[error("sink rejected sample {iteration}: {source}")]
    Sink { iteration: usize, source: io::Error },

    /// The sink failed to flush after the last sample
    #[error("sink failed to finish: {0}")]
    SinkFinish(io::Error),
}

/// Totals for a completed run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Samples emitted
    pub samples: usize,
    /// Samples taken on the slow variant
    pub slow: usize,
    /// Samples carrying at least one counter anomaly
    pub anomalies: usize,
}

/// Drives the measurement loop.
///
/// The sampler owns its counter set for its whole lifetime. Each iteration
/// starts the wall-clock timer, reads all counters, invokes the selected
/// workload variant once, reads all counters again and stops the timer. The
/// variant is resolved to a function pointer before the timer starts so no
/// selection logic runs inside the bracket.
pub struct Sampler<C: CounterBackend> {
    counters: C,
    config: SamplerConfig,
}

impl<C: CounterBackend> Sampler<C> {
    /// Creates a sampler over an already opened counter set.
    ///
    /// The set must hold exactly one counter per configured metric, in
    /// metric order.
    pub fn new(counters: C, config: SamplerConfig) -> Result<Self, SamplerError> {
        config.validate()?;
        if counters.len() != config.metrics.len() {
            return Err(ConfigError::CounterCountMismatch {
                expected: config.metrics.len(),
                got: counters.len(),
            }
            .into());
        }
        Ok(Self { counters, config })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn counters(&self) -> &C {
        &self.counters
    }

    /// Releases the counter set
    pub fn close(mut self) {
        self.counters.close();
    }

    /// Gives the counter set back to the caller
    pub fn into_counters(self) -> C {
        self.counters
    }

    /// Runs `config.iterations` brackets, streaming each sample to `sink`.
    ///
    /// A read failure aborts the run: samples already handed to the sink stay
    /// there, and the error reports the iteration that failed. Negative
    /// deltas do not abort; they are flagged on the affected sample.
    pub fn run<W, S>(&mut self, workload: &W, sink: &mut S) -> Result<RunSummary, SamplerError>
    where
        W: Workload,
        S: SampleSink + ?Sized,
    {
        let width = self.counters.len();
        let mut before = vec![0i64; width];
        let mut after = vec![0i64; width];
        let mut summary = RunSummary::default();

        debug!(
            "starting {} iterations of {} (slow every {})",
            self.config.iterations,
            workload.name(),
            self.config.slow_period
        );

        for iteration in 0..self.config.iterations {
            let variant = Variant::for_iteration(iteration, self.config.slow_period);
            let invoke = variant.entry_point::<W>();

            let start = Instant::now();
            self.counters
                .read_into(&mut before)
                .map_err(|source| SamplerError::SamplingAborted { iteration, source })?;
            invoke(workload);
            self.counters
                .read_into(&mut after)
                .map_err(|source| SamplerError::SamplingAborted { iteration, source })?;
            let elapsed = start.elapsed();

            let wall_time_us = i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX);
            let sample = Sample::from_bracket(
                variant.is_slow(),
                wall_time_us,
                &self.config.metrics,
                &before,
                &after,
            );

            for anomaly in &sample.anomalies {
                warn!(
                    "counter anomaly at iteration {}: {} went from {} to {}",
                    iteration, anomaly.field, anomaly.before, anomaly.after
                );
            }
            trace!("iteration {}: {:?}", iteration, sample);

            sink.accept(&sample)
                .map_err(|source| SamplerError::Sink { iteration, source })?;

            summary.samples += 1;
            if sample.is_slow {
                summary.slow += 1;
            }
            if sample.has_anomaly() {
                summary.anomalies += 1;
            }
        }

        sink.finish().map_err(SamplerError::SinkFinish)?;

        debug!(
            "finished: {} samples, {} slow, {} with anomalies",
            summary.samples, summary.slow, summary.anomalies
        );

        Ok(summary)
    }
}
