use std::hint::black_box;

use sampler::Workload;

/// Recursive factorial with a large and a small argument.
///
/// Products wrap on overflow; only the call chain matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Factorial {
    pub slow_n: u64,
    pub fast_n: u64,
}

impl Default for Factorial {
    fn default() -> Self {
        Self {
            slow_n: 1000,
            fast_n: 3,
        }
    }
}

/// Wrapping recursive factorial
pub fn factorial(n: u64) -> u64 {
    if n <= 1 {
        1
    } else {
        n.wrapping_mul(factorial(n - 1))
    }
}

impl Workload for Factorial {
    fn run_slow(&self) {
        black_box(factorial(black_box(self.slow_n)));
    }

    fn run_fast(&self) {
        black_box(factorial(black_box(self.fast_n)));
    }

    fn name(&self) -> &str {
        "factorial"
    }
}

/// Counting loop whose counter is laundered through `black_box` every step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spin {
    pub slow: u64,
    pub fast: u64,
}

impl Default for Spin {
    fn default() -> Self {
        Self {
            slow: 1_000_000,
            fast: 1_000,
        }
    }
}

/// Counts from 0 to `repeat`, returning the final count
pub fn spin(repeat: u64) -> u64 {
    let mut x = 0u64;
    while black_box(x) < repeat {
        x += 1;
    }
    x
}

impl Workload for Spin {
    fn run_slow(&self) {
        black_box(spin(self.slow));
    }

    fn run_fast(&self) {
        black_box(spin(self.fast));
    }

    fn name(&self) -> &str {
        "spin"
    }
}
