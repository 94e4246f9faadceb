use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};

use harness::{exit_status, parse_csv, ConsoleSink, CsvExporter, DEFAULT_EXPORT_FILE};
use perf_counters::{CacheEvent, CacheLevel, CacheOp, CacheResult, CounterDescriptor, PerfCounterSet};
use sampler::{
    Field, MetricSpec, SampleSink, Sampler, SamplerConfig, VecSink, DEFAULT_DIVISOR, DEFAULT_ITERATIONS,
    DEFAULT_SLOW_PERIOD,
};
use workloads::{Factorial, MemoryScan, Spin, WorkloadKind};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkloadArg {
    /// Recursive factorial of 1000 vs 3
    Factorial,
    /// Counting loop to 1e6 vs 1e3
    Spin,
    /// Random scan of a 2 MiB buffer vs sequential scan of a tiny one
    Memory,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CacheLevelArg {
    L1d,
    L1i,
    Ll,
    Dtlb,
    Itlb,
    Bpu,
    Node,
}

/// Measure hardware counter deltas of slow/fast workload pairs
#[derive(Debug, Parser)]
#[command(name = "harness")]
struct Command {
    /// Number of iterations (and samples)
    #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Run the slow variant every PERIOD iterations
    #[arg(short = 'k', long, default_value_t = DEFAULT_SLOW_PERIOD)]
    period: usize,

    /// Workload to measure
    #[arg(short, long, value_enum, default_value_t = WorkloadArg::Factorial)]
    workload: WorkloadArg,

    /// CSV export file
    #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
    output: PathBuf,

    /// Divisor applied to instruction and task clock deltas
    #[arg(long, default_value_t = DEFAULT_DIVISOR)]
    divisor: u32,

    /// Cache whose read misses are counted
    #[arg(long, value_enum, default_value_t = CacheLevelArg::L1d)]
    cache_level: CacheLevelArg,

    /// Skip the per-sample console dump
    #[arg(short, long)]
    quiet: bool,

    /// Read the export back and compare it with the samples taken
    #[arg(long)]
    verify: bool,

    /// Verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Command {
    fn sampler_config(&self) -> SamplerConfig {
        let level = match self.cache_level {
            CacheLevelArg::L1d => CacheLevel::L1D,
            CacheLevelArg::L1i => CacheLevel::L1I,
            CacheLevelArg::Ll => CacheLevel::LL,
            CacheLevelArg::Dtlb => CacheLevel::DTLB,
            CacheLevelArg::Itlb => CacheLevel::ITLB,
            CacheLevelArg::Bpu => CacheLevel::BPU,
            CacheLevelArg::Node => CacheLevel::Node,
        };
        let misses = CounterDescriptor::Cache(CacheEvent::new(level, CacheOp::Read, CacheResult::Miss));

        SamplerConfig {
            iterations: self.iterations,
            slow_period: self.period,
            metrics: vec![
                MetricSpec::new(CounterDescriptor::INSTRUCTIONS, Field::Instructions, self.divisor),
                MetricSpec::new(CounterDescriptor::TASK_CLOCK, Field::CpuTime, self.divisor),
                MetricSpec::new(misses, Field::CacheMisses, 1),
            ],
        }
    }

    fn workload(&self) -> WorkloadKind {
        match self.workload {
            WorkloadArg::Factorial => WorkloadKind::Factorial(Factorial::default()),
            WorkloadArg::Spin => WorkloadKind::Spin(Spin::default()),
            WorkloadArg::Memory => WorkloadKind::MemoryScan(MemoryScan::default()),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn run(opts: &Command) -> Result<()> {
    let config = opts.sampler_config();
    config.validate().context("Invalid run configuration")?;

    // Build workload buffers before any counter is running
    let workload = opts.workload();

    let counters = PerfCounterSet::open(&config.descriptors()).context("Failed to open performance counters")?;
    let mut sampler = Sampler::new(counters, config).context("Failed to set up sampler")?;

    info!(
        "Sampling {} iterations of {} (slow every {})",
        opts.iterations,
        workload.name(),
        opts.period
    );

    let mut samples = VecSink::with_capacity(opts.iterations);
    let summary = workload
        .run_with(&mut sampler, &mut samples)
        .context("Sampling run failed")?;
    sampler.close();

    if summary.anomalies > 0 {
        warn!("{} of {} samples carry counter anomalies", summary.anomalies, summary.samples);
    }

    if !opts.quiet {
        let mut console = ConsoleSink::new(io::stdout().lock());
        console
            .accept_batch(samples.samples())
            .and_then(|_| console.finish())
            .context("Failed to print samples")?;
    }

    let mut exporter = CsvExporter::create(&opts.output)
        .with_context(|| format!("Failed to create export file: {}", opts.output.display()))?;
    exporter
        .accept_batch(samples.samples())
        .and_then(|_| exporter.finish())
        .with_context(|| format!("Failed to write export file: {}", opts.output.display()))?;

    info!("Wrote {} samples to {}", summary.samples, opts.output.display());

    if opts.verify {
        let file = File::open(&opts.output)
            .with_context(|| format!("Failed to reopen export file: {}", opts.output.display()))?;
        let parsed = parse_csv(BufReader::new(file))?;
        let expected: Vec<_> = samples
            .into_samples()
            .into_iter()
            .map(|mut s| {
                s.anomalies.clear();
                s
            })
            .collect();
        if parsed != expected {
            return Err(anyhow!(
                "Export verification failed: {} records read back, {} expected",
                parsed.len(),
                expected.len()
            ));
        }
        info!("Verified {} exported records", parsed.len());
    }

    Ok(())
}

fn main() -> ExitCode {
    let opts = Command::parse();
    init_logging(opts.verbose);

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(u8::from(exit_status(&e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Command::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let opts = Command::parse_from(["harness"]);
        assert_eq!(opts.iterations, 50);
        assert_eq!(opts.period, 6);
        assert_eq!(opts.output, PathBuf::from("troubleSample.csv"));
        assert_eq!(opts.sampler_config(), SamplerConfig::default());
        assert_eq!(opts.workload().name(), "factorial");
    }

    #[rstest]
    #[case("factorial")]
    #[case("spin")]
    #[case("memory")]
    fn test_workload_selection(#[case] name: &str) {
        let opts = Command::parse_from(["harness", "-w", name]);
        assert_eq!(opts.workload().name(), name);
    }

    #[test]
    fn test_cache_level_and_divisor() {
        let opts = Command::parse_from(["harness", "--cache-level", "ll", "--divisor", "1", "-n", "3", "-k", "2"]);
        let config = opts.sampler_config();

        assert_eq!(config.iterations, 3);
        assert_eq!(config.slow_period, 2);
        assert_eq!(config.metrics[0].divisor, 1);
        assert_eq!(config.metrics[2].descriptor.to_string(), "LLC-read-miss");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_zero_period_fails_before_opening_counters() {
        let opts = Command::parse_from(["harness", "-k", "0", "-q"]);
        let err = run(&opts).unwrap_err();
        assert_eq!(exit_status(&err), harness::ExitStatus::Config);
    }
}
