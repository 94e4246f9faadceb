use std::io::{self, Write};

use sampler::{Sample, SampleSink};

/// Prints one parenthesized line per sample, e.g. `(slow, 812, 41, 790, 12345)`.
///
/// Informational only; the format may change.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats a sample the way [`ConsoleSink`] prints it
pub fn format_sample(sample: &Sample) -> String {
    let mut line = format!(
        "({}, {}, {}, {}, {})",
        if sample.is_slow { "slow" } else { "fast" },
        sample.wall_time_us,
        sample.instructions,
        sample.cpu_time,
        sample.cache_misses
    );
    for anomaly in &sample.anomalies {
        line.push_str(&format!(" anomaly: {}", anomaly.field));
    }
    line
}

impl<W: Write> SampleSink for ConsoleSink<W> {
    fn accept(&mut self, sample: &Sample) -> io::Result<()> {
        writeln!(self.out, "{}", format_sample(sample))
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
