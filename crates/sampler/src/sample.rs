use std::fmt;

use crate::MetricSpec;

/// Numeric field of a [`Sample`] that a counter can be mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Retired instructions, scaled
    Instructions,
    /// Task clock, scaled
    CpuTime,
    /// Cache misses, usually unscaled
    CacheMisses,
}

impl Field {
    /// Column name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Field::Instructions => "instructions",
            Field::CpuTime => "cpu_time",
            Field::CacheMisses => "cache_misses",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A counter went backwards (or overflowed) across one bracket.
///
/// The affected field of the sample is left at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterAnomaly {
    pub field: Field,
    pub before: i64,
    pub after: i64,
}

/// One measurement: the deltas observed around a single workload invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    /// Which workload variant ran
    pub is_slow: bool,
    /// Elapsed wall-clock time of the bracket in microseconds
    pub wall_time_us: i64,
    /// Retired instruction delta divided by the instruction divisor
    pub instructions: i64,
    /// Task clock delta divided by the cpu time divisor
    pub cpu_time: i64,
    /// Cache miss delta
    pub cache_misses: i64,
    /// Fields whose counter went backwards during this bracket
    pub anomalies: Vec<CounterAnomaly>,
}

impl Sample {
    /// Builds a sample from a before/after snapshot pair.
    ///
    /// `before[i]` and `after[i]` are the raw readings of the counter that
    /// `metrics[i]` describes. Deltas are divided by the metric's divisor with
    /// truncation toward zero. A negative delta is recorded as an anomaly and
    /// leaves the field at 0.
    pub fn from_bracket(
        is_slow: bool,
        wall_time_us: i64,
        metrics: &[MetricSpec],
        before: &[i64],
        after: &[i64],
    ) -> Self {
        let mut sample = Sample {
            is_slow,
            wall_time_us,
            ..Default::default()
        };

        for ((metric, &b), &a) in metrics.iter().zip(before).zip(after) {
            match scaled_delta(b, a, metric.divisor) {
                Some(value) => sample.set(metric.field, value),
                None => sample.anomalies.push(CounterAnomaly {
                    field: metric.field,
                    before: b,
                    after: a,
                }),
            }
        }

        sample
    }

    /// Returns the value of a field
    pub fn get(&self, field: Field) -> i64 {
        match field {
            Field::Instructions => self.instructions,
            Field::CpuTime => self.cpu_time,
            Field::CacheMisses => self.cache_misses,
        }
    }

    /// Sets the value of a field
    pub fn set(&mut self, field: Field, value: i64) {
        match field {
            Field::Instructions => self.instructions = value,
            Field::CpuTime => self.cpu_time = value,
            Field::CacheMisses => self.cache_misses = value,
        }
    }

    /// Returns true if any counter went backwards during this bracket
    pub fn has_anomaly(&self) -> bool {
        !self.anomalies.is_empty()
    }

    /// Returns the anomaly recorded for `field`, if any
    pub fn anomaly(&self, field: Field) -> Option<&CounterAnomaly> {
        self.anomalies.iter().find(|a| a.field == field)
    }
}

/// `(after - before) / divisor`, truncated toward zero.
///
/// Returns `None` when the counter went backwards or the subtraction
/// overflows.
pub fn scaled_delta(before: i64, after: i64, divisor: u32) -> Option<i64> {
    let delta = after.checked_sub(before).filter(|d| *d >= 0)?;
    Some(delta / i64::from(divisor.max(1)))
}
