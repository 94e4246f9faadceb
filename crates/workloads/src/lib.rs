//! # Workloads
//!
//! Pairs of deliberately expensive and cheap code paths from the same
//! operation family. Each type implements [`sampler::Workload`]; the
//! [`WorkloadKind`] enum lists them so a caller can pick one by name and run
//! the sampler on the concrete type.

mod compute;
mod kind;
mod memory;

pub use compute::*;
pub use kind::*;
pub use memory::*;
