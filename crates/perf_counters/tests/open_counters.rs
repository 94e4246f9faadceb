use perf_counters::{CounterBackend, CounterDescriptor, CounterError, PerfCounterSet};

fn open_or_skip(descriptors: &[CounterDescriptor]) -> Option<PerfCounterSet> {
    match PerfCounterSet::open(descriptors) {
        Ok(set) => Some(set),
        Err(e) if e.is_open_error() => {
            // Containers and CI hosts often forbid perf events
            println!("Skipping test due to error: {}", e);
            None
        }
        Err(e) => panic!("unexpected error opening counters: {:?}", e),
    }
}

#[test]
fn test_task_clock_grows() {
    let Some(mut set) = open_or_skip(&[CounterDescriptor::TASK_CLOCK]) else {
        return;
    };

    let before = set.read_all().unwrap();
    let mut acc = 0u64;
    for i in 0..1_000_000u64 {
        acc = acc.wrapping_add(std::hint::black_box(i));
    }
    std::hint::black_box(acc);
    let after = set.read_all().unwrap();

    assert!(after[0] >= before[0]);
    set.close();
    assert!(matches!(set.read_all(), Err(CounterError::Closed)));
}

#[test]
fn test_default_triple() {
    let descriptors = [
        CounterDescriptor::INSTRUCTIONS,
        CounterDescriptor::TASK_CLOCK,
        CounterDescriptor::L1D_READ_MISS,
    ];
    let Some(mut set) = open_or_skip(&descriptors) else {
        return;
    };

    assert_eq!(set.len(), 3);
    let values = set.read_all().unwrap();
    assert_eq!(values.len(), 3);
    assert!(values.iter().all(|v| *v >= 0));
}
