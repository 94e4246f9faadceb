//! # Sampler
//!
//! Runs a workload a fixed number of times, bracketing every invocation with
//! a wall-clock timer and a pair of counter reads, and turns each bracket into
//! a [`Sample`] of counter deltas.
//!
//! The primary interface is [`Sampler`], which owns a
//! [`CounterBackend`](perf_counters::CounterBackend) for the whole run and
//! hands each sample to a [`SampleSink`] as soon as it is computed.
//!
//! ```
//! use perf_counters::ScriptedCounters;
//! use sampler::{Sampler, SamplerConfig, VecSink, Workload};
//!
//! struct Nop;
//!
//! impl Workload for Nop {
//!     fn run_slow(&self) {}
//!     fn run_fast(&self) {}
//! }
//!
//! let config = SamplerConfig {
//!     iterations: 12,
//!     ..SamplerConfig::default()
//! };
//! let counters = ScriptedCounters::monotonic(vec![5000, 2000, 3]);
//! let mut sampler = Sampler::new(counters, config).unwrap();
//!
//! let mut sink = VecSink::new();
//! let summary = sampler.run(&Nop, &mut sink).unwrap();
//!
//! assert_eq!(summary.samples, 12);
//! assert_eq!(summary.slow, 2); // iterations 0 and 6
//! assert_eq!(sink.samples()[1].instructions, 5);
//! ```

pub mod config;
pub mod runner;
pub mod sample;
pub mod sink;
pub mod workload;

pub use config::*;
pub use runner::*;
pub use sample::*;
pub use sink::*;
pub use workload::*;
