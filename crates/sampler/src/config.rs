use std::collections::HashSet;

use perf_counters::CounterDescriptor;
use thiserror::Error;

use crate::Field;

/// Default number of iterations per run
pub const DEFAULT_ITERATIONS: usize = 50;

/// Default slow-variant period: every sixth iteration runs the slow path
pub const DEFAULT_SLOW_PERIOD: usize = 6;

/// Default divisor applied to instruction and task clock deltas
pub const DEFAULT_DIVISOR: u32 = 1000;

/// Errors in sampler configuration
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("slow period must be at least 1")]
    ZeroPeriod,

    #[error("divisor for {0} must be at least 1")]
    ZeroDivisor(Field),

    #[error("no metrics configured")]
    NoMetrics,

    #[error("field {0} is mapped by more than one counter")]
    DuplicateField(Field),

    #[error("configuration describes {expected} counters but the counter set holds {got}")]
    CounterCountMismatch { expected: usize, got: usize },
}

/// Maps one counter to a field of the sample and the divisor applied to its
/// delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub descriptor: CounterDescriptor,
    pub field: Field,
    pub divisor: u32,
}

impl MetricSpec {
    pub fn new(descriptor: CounterDescriptor, field: Field, divisor: u32) -> Self {
        Self {
            descriptor,
            field,
            divisor,
        }
    }
}

/// Run parameters for a [`Sampler`](crate::Sampler)
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Number of iterations (and samples) per run
    pub iterations: usize,
    /// Iteration `i` runs the slow variant when `i % slow_period == 0`
    pub slow_period: usize,
    /// Counters to read, in open order
    pub metrics: Vec<MetricSpec>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            slow_period: DEFAULT_SLOW_PERIOD,
            metrics: vec![
                MetricSpec::new(CounterDescriptor::INSTRUCTIONS, Field::Instructions, DEFAULT_DIVISOR),
                MetricSpec::new(CounterDescriptor::TASK_CLOCK, Field::CpuTime, DEFAULT_DIVISOR),
                MetricSpec::new(CounterDescriptor::L1D_READ_MISS, Field::CacheMisses, 1),
            ],
        }
    }
}

impl SamplerConfig {
    /// Checks the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slow_period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }

        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.divisor == 0 {
                return Err(ConfigError::ZeroDivisor(metric.field));
            }
            if !seen.insert(metric.field) {
                return Err(ConfigError::DuplicateField(metric.field));
            }
        }

        Ok(())
    }

    /// Descriptors to open, in metric order
    pub fn descriptors(&self) -> Vec<CounterDescriptor> {
        self.metrics.iter().map(|m| m.descriptor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SamplerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.iterations, 50);
        assert_eq!(config.slow_period, 6);
        assert_eq!(
            config.descriptors(),
            vec![
                CounterDescriptor::INSTRUCTIONS,
                CounterDescriptor::TASK_CLOCK,
                CounterDescriptor::L1D_READ_MISS,
            ]
        );
    }

    #[test]
    fn test_zero_period() {
        let config = SamplerConfig {
            slow_period: 0,
            ..SamplerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPeriod));
    }

    #[test]
    fn test_zero_divisor() {
        let mut config = SamplerConfig::default();
        config.metrics[1].divisor = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroDivisor(Field::CpuTime)));
    }

    #[test]
    fn test_duplicate_field() {
        let mut config = SamplerConfig::default();
        config.metrics[2].field = Field::Instructions;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateField(Field::Instructions))
        );
    }

    #[test]
    fn test_no_metrics() {
        let config = SamplerConfig {
            metrics: Vec::new(),
            ..SamplerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoMetrics));
    }
}
