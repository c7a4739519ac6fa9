//! Parallel dispatcher over sized sequences.
//!
//! The index range `[0, size)` of the input is cut into one contiguous chunk
//! per worker, chunk lengths differing by at most one. Each worker clones the
//! cursor, jumps to the start of its chunk with [`Sequence::advance_by`] and
//! visits its elements in order. There is no work stealing and no order
//! across workers.
//!
//! Workers run on crossbeam scoped threads, so the per-element operation and
//! the input may borrow from the caller. A worker's accumulator is created on
//! its first element and handed back in [`WorkerLocals`] once every worker has
//! been joined.
//!
//! When an operation fails, the failing worker stops and the other workers
//! stop after the element they are currently processing. The dispatch then
//! reports a single [`GraphError::WorkerFailure`] carrying the first error
//! observed, together with the accumulators built so far. A panic in the
//! operation is reported the same way.

pub mod locals;

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::GraphError;
use crate::iter::Sequence;

pub use locals::WorkerLocals;

// ---------------------------------------------------------------------------
// Status / outcome types
// ---------------------------------------------------------------------------

/// Execution summary of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStatus {
    /// Wall-clock time from partitioning to the last join.
    pub elapsed: Duration,
    /// Number of workers the input was partitioned over.
    pub workers: usize,
    /// Elements whose operation completed successfully.
    pub visited: u64,
}

/// A successful dispatch.
#[derive(Debug)]
pub struct Dispatched<A> {
    pub status: DispatchStatus,
    pub locals: WorkerLocals<A>,
}

/// A failed dispatch. The accumulators built before the failure are kept
/// for inspection.
pub struct DispatchFailure<A> {
    pub error: GraphError,
    pub status: DispatchStatus,
    pub locals: WorkerLocals<A>,
}

impl<A> fmt::Debug for DispatchFailure<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchFailure")
            .field("error", &self.error)
            .field("status", &self.status)
            .field("locals", &self.locals.len())
            .finish()
    }
}

impl<A> fmt::Display for DispatchFailure<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<A> std::error::Error for DispatchFailure<A> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl<A> From<DispatchFailure<A>> for GraphError {
    fn from(failure: DispatchFailure<A>) -> Self {
        failure.error
    }
}

// ---------------------------------------------------------------------------
// Partitioning
// ---------------------------------------------------------------------------

/// Split `[0, size)` into `workers` contiguous ranges whose lengths differ by
/// at most one. The first `size % workers` ranges get the extra element.
pub fn partition(size: u64, workers: usize) -> Vec<Range<u64>> {
    let workers = workers.max(1) as u64;
    let base = size / workers;
    let extra = size % workers;

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut start = 0;
    for w in 0..workers {
        let len = base + u64::from(w < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Resolve a thread count where 0 means "all available cores".
pub fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        threads
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Fixed-size worker pool applying an operation to every element of a
/// sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    workers: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Dispatcher {
    /// A dispatcher with `threads` workers (0 = all available cores).
    pub fn new(threads: usize) -> Self {
        Self {
            workers: resolve_threads(threads),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `op` to every element of `seq`, without per-worker state.
    pub fn iterate<S, F>(&self, seq: &S, op: F) -> Result<DispatchStatus, GraphError>
    where
        S: Sequence + Clone + Send,
        F: Fn(S::Item) -> anyhow::Result<()> + Sync,
    {
        self.iterate_with(seq, || (), |_: &mut (), item| op(item))
            .map(|done| done.status)
            .map_err(GraphError::from)
    }

    /// Apply `op` to every element of `seq`, giving each worker a private
    /// accumulator built by `init` on the worker's first element.
    ///
    /// `seq` must report a `size()`; it is cloned once per worker.
    pub fn iterate_with<S, A, I, F>(
        &self,
        seq: &S,
        init: I,
        op: F,
    ) -> Result<Dispatched<A>, DispatchFailure<A>>
    where
        S: Sequence + Clone + Send,
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, S::Item) -> anyhow::Result<()> + Sync,
    {
        let start = Instant::now();
        let Some(size) = seq.size() else {
            return Err(DispatchFailure {
                error: GraphError::UnsizedSequence,
                status: DispatchStatus {
                    elapsed: start.elapsed(),
                    workers: self.workers,
                    visited: 0,
                },
                locals: WorkerLocals::from_slots(Vec::new()),
            });
        };

        let chunks = partition(size, self.workers);
        let abort = AtomicBool::new(false);
        let first_failed = AtomicUsize::new(usize::MAX);

        let joined = crossbeam::scope(|s| {
            let handles: Vec<_> = chunks
                .iter()
                .enumerate()
                .map(|(worker, range)| {
                    let cursor = seq.clone();
                    let range = range.clone();
                    let (init, op) = (&init, &op);
                    let (abort, first_failed) = (&abort, &first_failed);
                    s.spawn(move |_| {
                        run_chunk(worker, cursor, range, init, op, abort, first_failed)
                    })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(worker, handle)| {
                    handle.join().unwrap_or_else(|panic| {
                        abort.store(true, Ordering::Relaxed);
                        let _ = first_failed.compare_exchange(
                            usize::MAX,
                            worker,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        );
                        ChunkOutcome {
                            worker,
                            local: None,
                            visited: 0,
                            error: Some(anyhow::anyhow!(
                                "worker {worker} panicked: {}",
                                panic_message(panic.as_ref())
                            )),
                        }
                    })
                })
                .collect::<Vec<_>>()
        });

        let outcomes = match joined {
            Ok(outcomes) => outcomes,
            Err(panic) => {
                // Every handle is joined above, so this is unreachable in
                // practice; report it rather than unwinding through the caller.
                let error = GraphError::WorkerFailure {
                    worker: 0,
                    failed_workers: self.workers,
                    source: anyhow::anyhow!("dispatch scope panicked: {}", panic_message(panic.as_ref())),
                };
                return Err(DispatchFailure {
                    error,
                    status: DispatchStatus {
                        elapsed: start.elapsed(),
                        workers: self.workers,
                        visited: 0,
                    },
                    locals: WorkerLocals::from_slots(Vec::new()),
                });
            }
        };

        let mut visited = 0u64;
        let mut slots = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        for outcome in outcomes {
            visited += outcome.visited;
            if let Some(local) = outcome.local {
                slots.push((outcome.worker, local));
            }
            if let Some(e) = outcome.error {
                errors.push((outcome.worker, e));
            }
        }

        let status = DispatchStatus {
            elapsed: start.elapsed(),
            workers: self.workers,
            visited,
        };
        let locals = WorkerLocals::from_slots(slots);

        debug!(
            "dispatched {visited}/{size} elements over {} workers in {:.3}s",
            self.workers,
            status.elapsed.as_secs_f64()
        );

        if errors.is_empty() {
            return Ok(Dispatched { status, locals });
        }

        let failed_workers = errors.len();
        let first = first_failed.load(Ordering::Acquire);
        let idx = errors.iter().position(|(w, _)| *w == first).unwrap_or(0);
        let (worker, source) = errors.swap_remove(idx);
        Err(DispatchFailure {
            error: GraphError::WorkerFailure {
                worker,
                failed_workers,
                source,
            },
            status,
            locals,
        })
    }
}

// ---------------------------------------------------------------------------
// Worker body
// ---------------------------------------------------------------------------

struct ChunkOutcome<A> {
    worker: usize,
    local: Option<A>,
    visited: u64,
    error: Option<anyhow::Error>,
}

fn run_chunk<S, A, I, F>(
    worker: usize,
    mut cursor: S,
    range: Range<u64>,
    init: &I,
    op: &F,
    abort: &AtomicBool,
    first_failed: &AtomicUsize,
) -> ChunkOutcome<A>
where
    S: Sequence,
    I: Fn() -> A,
    F: Fn(&mut A, S::Item) -> anyhow::Result<()>,
{
    let mut outcome = ChunkOutcome {
        worker,
        local: None,
        visited: 0,
        error: None,
    };
    if range.is_empty() {
        return outcome;
    }

    cursor.first();
    cursor.advance_by(range.start);
    for _ in range {
        if cursor.is_done() || abort.load(Ordering::Relaxed) {
            break;
        }
        let local = outcome.local.get_or_insert_with(init);
        let item = cursor.item();
        // A panicking op still leaves the accumulator with the worker.
        let result = panic::catch_unwind(AssertUnwindSafe(|| op(local, item)))
            .unwrap_or_else(|payload| {
                Err(anyhow::anyhow!(
                    "worker {worker} panicked: {}",
                    panic_message(payload.as_ref())
                ))
            });
        if let Err(e) = result {
            abort.store(true, Ordering::Relaxed);
            let _ = first_failed.compare_exchange(
                usize::MAX,
                worker,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            outcome.error = Some(e);
            break;
        }
        outcome.visited += 1;
        cursor.next();
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
