use std::io;

use crate::Sample;

/// Consumer of the sample stream.
///
/// The sampler calls [`accept`](SampleSink::accept) once per iteration, in
/// iteration order, and [`finish`](SampleSink::finish) once after the last
/// sample of a completed run.
pub trait SampleSink {
    /// Consumes one sample
    fn accept(&mut self, sample: &Sample) -> io::Result<()>;

    /// Consumes an ordered batch of samples
    fn accept_batch(&mut self, samples: &[Sample]) -> io::Result<()> {
        for sample in samples {
            self.accept(sample)?;
        }
        Ok(())
    }

    /// Flushes any buffered output
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn accept(&mut self, sample: &Sample) -> io::Result<()> {
        (**self).accept(sample)
    }

    fn accept_batch(&mut self, samples: &[Sample]) -> io::Result<()> {
        (**self).accept_batch(samples)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Buffers samples in memory for a final batch export
#[derive(Debug, Default)]
pub struct VecSink {
    samples: Vec<Sample>,
}

impl VecSink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sink with room for `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Samples collected so far, in arrival order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

impl SampleSink for VecSink {
    fn accept(&mut self, sample: &Sample) -> io::Result<()> {
        self.samples.push(sample.clone());
        Ok(())
    }

    fn accept_batch(&mut self, samples: &[Sample]) -> io::Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }
}
