//! Dispatcher contract tests over the public sequence types.

use std::sync::atomic::{AtomicU64, Ordering};

use dbgraph::GraphError;
use dbgraph::dispatch::{Dispatcher, partition};
use dbgraph::iter::{Cartesian, ListSequence, Sequence, Truncate};

#[test]
fn dispatch_visits_each_element_once() {
    let data: Vec<u64> = (0..1001).collect();
    for workers in [1, 2, 7, 16] {
        let seen: Vec<AtomicU64> = (0..data.len()).map(|_| AtomicU64::new(0)).collect();
        let status = Dispatcher::new(workers)
            .iterate(&ListSequence::new(&data), |x| {
                seen[*x as usize].fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        assert_eq!(status.workers, workers);
        assert_eq!(status.visited, 1001);
        assert!(seen.iter().all(|c| c.load(Ordering::Relaxed) == 1));
    }
}

#[test]
fn dispatch_chunks_are_balanced() {
    for (size, workers) in [(0u64, 3usize), (10, 3), (1001, 16), (5, 8)] {
        let ranges = partition(size, workers);
        assert_eq!(ranges.len(), workers);
        let lens: Vec<u64> = ranges.iter().map(|r| r.end - r.start).collect();
        assert_eq!(lens.iter().sum::<u64>(), size);
        let (min, max) = (lens.iter().min().unwrap(), lens.iter().max().unwrap());
        assert!(max - min <= 1);
    }
}

#[test]
fn dispatch_folds_per_worker_sums() {
    let rows = [1u32, 2, 3, 4, 5];
    let cols = [10u32, 20, 30];
    let product = Cartesian::new(ListSequence::new(&rows), ListSequence::new(&cols));
    assert_eq!(product.size(), Some(15));

    let done = Dispatcher::new(4)
        .iterate_with(&product, || (0u64, 0u64), |acc, (a, b)| {
            acc.0 += 1;
            acc.1 += u64::from(a * b);
            Ok(())
        })
        .unwrap();
    let (count, sum) = done.locals.fold((0, 0), |t, x| (t.0 + x.0, t.1 + x.1));
    assert_eq!(count, 15);
    assert_eq!(sum, 15 * 60);
}

#[test]
fn dispatch_bounded_by_truncate() {
    let data: Vec<u32> = (0..100).collect();
    let bounded = Truncate::new(ListSequence::new(&data), 10);
    let done = Dispatcher::new(3)
        .iterate_with(&bounded, Vec::new, |v, x| {
            v.push(*x);
            Ok(())
        })
        .unwrap();
    let mut all = done.locals.fold(Vec::new(), |mut acc, v| {
        acc.extend(v);
        acc
    });
    all.sort_unstable();
    assert_eq!(all, (0..10).collect::<Vec<_>>());
}

#[test]
fn dispatch_failure_is_reported_once() {
    let data: Vec<u32> = (0..40).collect();
    let err = Dispatcher::new(4)
        .iterate(&ListSequence::new(&data), |x| {
            if *x == 25 {
                anyhow::bail!("rejected {x}");
            }
            Ok(())
        })
        .unwrap_err();
    match err {
        GraphError::WorkerFailure { worker, source, .. } => {
            assert_eq!(worker, 2);
            assert_eq!(source.to_string(), "rejected 25");
        }
        other => panic!("unexpected error {other}"),
    }
}
