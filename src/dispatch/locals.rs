//! Per-worker accumulators handed back by a dispatch.
//!
//! Each worker owns at most one accumulator, created on the first element
//! it visits, so the hot path never touches shared state. Nothing is merged
//! implicitly: the caller folds the accumulators after the dispatch returns.

/// Accumulators keyed by worker index, in ascending worker order.
///
/// Workers that visited no element have no entry.
#[derive(Debug, Clone)]
pub struct WorkerLocals<A> {
    slots: Vec<(usize, A)>,
}

impl<A> WorkerLocals<A> {
    pub(crate) fn from_slots(mut slots: Vec<(usize, A)>) -> Self {
        slots.sort_unstable_by_key(|(worker, _)| *worker);
        Self { slots }
    }

    /// Number of workers that created an accumulator.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The accumulator owned by `worker`, if it visited anything.
    pub fn get(&self, worker: usize) -> Option<&A> {
        self.slots
            .binary_search_by_key(&worker, |(w, _)| *w)
            .ok()
            .map(|i| &self.slots[i].1)
    }

    /// `(worker, accumulator)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &A)> {
        self.slots.iter().map(|(w, a)| (*w, a))
    }

    /// Fold every accumulator into one value, in worker order.
    pub fn fold<B>(self, init: B, mut f: impl FnMut(B, A) -> B) -> B {
        self.slots.into_iter().fold(init, |acc, (_, a)| f(acc, a))
    }

    /// Merge into a single accumulator with an in-place combine, as with
    /// `+=`. Returns `A::default()` when no worker visited anything.
    pub fn merge(self, mut combine: impl FnMut(&mut A, A)) -> A
    where
        A: Default,
    {
        self.fold(A::default(), |mut total, a| {
            combine(&mut total, a);
            total
        })
    }

    pub fn into_inner(self) -> Vec<(usize, A)> {
        self.slots
    }
}
