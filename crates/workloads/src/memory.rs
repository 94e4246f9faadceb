use std::hint::black_box;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sampler::Workload;

/// Entries in the large buffer and index tables. 500k `i32`s is about 2 MiB,
/// well past a typical 32 KiB L1D.
pub const LARGE_BUFFER_LEN: usize = 500_000;

/// Entries in the small buffer used by the fast path
pub const SMALL_BUFFER_LEN: usize = 10;

/// Reads performed per invocation
pub const SCAN_READS: usize = 1 << 20;

const DEFAULT_SEED: u64 = 0x5eed;

/// Indexed buffer scan.
///
/// The slow path walks a large buffer through a shuffled index table, so
/// nearly every read lands on a cold line. The fast path walks a tiny buffer
/// through the sequential table. Both perform the same number of reads.
/// Buffers and tables are built once, up front.
#[derive(Debug, Clone)]
pub struct MemoryScan {
    large: Vec<i32>,
    small: Vec<i32>,
    random_index: Vec<usize>,
    linear_index: Vec<usize>,
    reads: usize,
}

impl Default for MemoryScan {
    fn default() -> Self {
        Self::new(LARGE_BUFFER_LEN, SCAN_READS, DEFAULT_SEED)
    }
}

impl MemoryScan {
    /// Builds buffers of `len` entries, shuffling the random index table with
    /// a generator seeded from `seed`.
    pub fn new(len: usize, reads: usize, seed: u64) -> Self {
        let len = len.max(1);
        let linear_index: Vec<usize> = (0..len).collect();
        let mut random_index = linear_index.clone();
        random_index.shuffle(&mut StdRng::seed_from_u64(seed));

        Self {
            large: (0..len as i32).collect(),
            small: (0..SMALL_BUFFER_LEN.min(len) as i32).collect(),
            random_index,
            linear_index,
            reads,
        }
    }

    pub fn random_index(&self) -> &[usize] {
        &self.random_index
    }

    /// Performs `reads` reads of `buf` through `index`, returning the sum of
    /// the values read.
    pub fn scan(buf: &[i32], index: &[usize], reads: usize) -> i64 {
        let mut sum = 0i64;
        for i in 0..reads {
            let value = black_box(buf[index[i % index.len()] % buf.len()]);
            sum += i64::from(value);
        }
        sum
    }
}

impl Workload for MemoryScan {
    fn run_slow(&self) {
        black_box(Self::scan(&self.large, &self.random_index, self.reads));
    }

    fn run_fast(&self) {
        black_box(Self::scan(&self.small, &self.linear_index, self.reads));
    }

    fn name(&self) -> &str {
        "memory"
    }
}
