//! The fixed set of sequence variants.
//!
//! - [`Empty`]: always done.
//! - [`ListSequence`]: a borrowed slice, in slice order.
//! - [`Cartesian`]: every `(a, b)` pair, `b` varying fastest.
//! - [`Compound`]: an outer sequence that reconfigures and replays an inner
//!   one for each of its elements.
//! - [`Truncate`]: at most `n` elements of another sequence.
//! - [`Paired`]: two sequences zipped, stopping with the shorter.
//! - [`Filter`] and [`Map`]: predicate and projection, used by the graph to
//!   derive branching-node sequences from node sequences.

use std::marker::PhantomData;

use super::Sequence;

#[track_caller]
fn assert_live(done: bool, op: &str) {
    assert!(!done, "{op}() called on a done sequence");
}

// ---------------------------------------------------------------------------
// Empty
// ---------------------------------------------------------------------------

/// A sequence with no elements.
pub struct Empty<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Empty<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Empty<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Empty<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Sequence for Empty<T> {
    type Item = T;

    fn first(&mut self) {}

    fn is_done(&self) -> bool {
        true
    }

    fn next(&mut self) {
        assert_live(true, "next");
    }

    fn item(&self) -> T {
        assert_live(true, "item");
        unreachable!()
    }

    fn size(&self) -> Option<u64> {
        Some(0)
    }
}

// ---------------------------------------------------------------------------
// ListSequence
// ---------------------------------------------------------------------------

/// Cursor over a borrowed slice. Yields references in slice order.
pub struct ListSequence<'a, T> {
    items: &'a [T],
    pos: usize,
}

impl<'a, T> ListSequence<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            pos: items.len(),
        }
    }
}

// Manual impls: the cursor is copyable whatever `T` is.
impl<T> Clone for ListSequence<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ListSequence<'_, T> {}

impl<'a, T> Sequence for ListSequence<'a, T> {
    type Item = &'a T;

    fn first(&mut self) {
        self.pos = 0;
    }

    #[inline]
    fn is_done(&self) -> bool {
        self.pos >= self.items.len()
    }

    #[inline]
    fn next(&mut self) {
        assert_live(self.is_done(), "next");
        self.pos += 1;
    }

    #[inline]
    fn item(&self) -> &'a T {
        assert_live(self.is_done(), "item");
        &self.items[self.pos]
    }

    fn size(&self) -> Option<u64> {
        Some(self.items.len() as u64)
    }

    fn advance_by(&mut self, n: u64) {
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        self.pos = self.pos.saturating_add(n).min(self.items.len());
    }
}

// ---------------------------------------------------------------------------
// Cartesian
// ---------------------------------------------------------------------------

/// Row-major product of two sequences: for each `a`, every `b`.
#[derive(Clone)]
pub struct Cartesian<A, B> {
    outer: A,
    inner: B,
    exhausted: bool,
}

impl<A: Sequence, B: Sequence> Cartesian<A, B> {
    pub fn new(outer: A, inner: B) -> Self {
        Self {
            outer,
            inner,
            exhausted: true,
        }
    }
}

impl<A: Sequence, B: Sequence> Sequence for Cartesian<A, B> {
    type Item = (A::Item, B::Item);

    fn first(&mut self) {
        self.outer.first();
        self.inner.first();
        self.exhausted = self.outer.is_done() || self.inner.is_done();
    }

    fn is_done(&self) -> bool {
        self.exhausted
    }

    fn next(&mut self) {
        assert_live(self.exhausted, "next");
        self.inner.next();
        if self.inner.is_done() {
            self.outer.next();
            self.inner.first();
            self.exhausted = self.outer.is_done() || self.inner.is_done();
        }
    }

    fn item(&self) -> Self::Item {
        assert_live(self.exhausted, "item");
        (self.outer.item(), self.inner.item())
    }

    fn size(&self) -> Option<u64> {
        self.outer.size()?.checked_mul(self.inner.size()?)
    }
}

// ---------------------------------------------------------------------------
// Compound
// ---------------------------------------------------------------------------

/// Dependent nesting: each outer element reconfigures the inner sequence,
/// which is then replayed from its first element.
///
/// `update` runs once per outer element, before the inner sequence's
/// `first()`. Outer elements whose reconfigured inner sequence is empty
/// contribute nothing. The total length depends on the data, so `size()`
/// is unknown.
#[derive(Clone)]
pub struct Compound<O, I, U> {
    outer: O,
    inner: I,
    update: U,
}

impl<O, I, U> Compound<O, I, U>
where
    O: Sequence,
    I: Sequence,
    U: FnMut(&mut I, O::Item),
{
    pub fn new(outer: O, inner: I, update: U) -> Self {
        Self {
            outer,
            inner,
            update,
        }
    }

    /// Move the outer cursor forward until an inner pass is non-empty.
    fn settle(&mut self) {
        while !self.outer.is_done() {
            (self.update)(&mut self.inner, self.outer.item());
            self.inner.first();
            if !self.inner.is_done() {
                return;
            }
            self.outer.next();
        }
    }
}

impl<O, I, U> Sequence for Compound<O, I, U>
where
    O: Sequence,
    I: Sequence,
    U: FnMut(&mut I, O::Item),
{
    type Item = I::Item;

    fn first(&mut self) {
        self.outer.first();
        self.settle();
    }

    fn is_done(&self) -> bool {
        self.outer.is_done()
    }

    fn next(&mut self) {
        assert_live(self.is_done(), "next");
        self.inner.next();
        if self.inner.is_done() {
            self.outer.next();
            self.settle();
        }
    }

    fn item(&self) -> I::Item {
        assert_live(self.is_done(), "item");
        self.inner.item()
    }
}

// ---------------------------------------------------------------------------
// Truncate
// ---------------------------------------------------------------------------

/// At most `limit` elements of the underlying sequence.
#[derive(Clone)]
pub struct Truncate<S> {
    inner: S,
    limit: u64,
    taken: u64,
}

impl<S: Sequence> Truncate<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            limit,
            taken: limit,
        }
    }
}

impl<S: Sequence> Sequence for Truncate<S> {
    type Item = S::Item;

    fn first(&mut self) {
        self.inner.first();
        self.taken = 0;
    }

    fn is_done(&self) -> bool {
        self.taken >= self.limit || self.inner.is_done()
    }

    fn next(&mut self) {
        assert_live(self.is_done(), "next");
        self.inner.next();
        self.taken += 1;
    }

    fn item(&self) -> S::Item {
        assert_live(self.is_done(), "item");
        self.inner.item()
    }

    fn size(&self) -> Option<u64> {
        self.inner.size().map(|n| n.min(self.limit))
    }

    fn advance_by(&mut self, n: u64) {
        let n = n.min(self.limit.saturating_sub(self.taken));
        self.inner.advance_by(n);
        self.taken += n;
    }
}

// ---------------------------------------------------------------------------
// Paired
// ---------------------------------------------------------------------------

/// Two sequences advanced together; done as soon as either is.
#[derive(Clone)]
pub struct Paired<A, B> {
    left: A,
    right: B,
}

impl<A: Sequence, B: Sequence> Paired<A, B> {
    pub fn new(left: A, right: B) -> Self {
        Self { left, right }
    }
}

impl<A: Sequence, B: Sequence> Sequence for Paired<A, B> {
    type Item = (A::Item, B::Item);

    fn first(&mut self) {
        self.left.first();
        self.right.first();
    }

    fn is_done(&self) -> bool {
        self.left.is_done() || self.right.is_done()
    }

    fn next(&mut self) {
        assert_live(self.is_done(), "next");
        self.left.next();
        self.right.next();
    }

    fn item(&self) -> Self::Item {
        assert_live(self.is_done(), "item");
        (self.left.item(), self.right.item())
    }

    fn size(&self) -> Option<u64> {
        Some(self.left.size()?.min(self.right.size()?))
    }

    fn advance_by(&mut self, n: u64) {
        self.left.advance_by(n);
        self.right.advance_by(n);
    }
}

// ---------------------------------------------------------------------------
// Filter / Map
// ---------------------------------------------------------------------------

/// Elements of the underlying sequence that satisfy a predicate.
#[derive(Clone)]
pub struct Filter<S, P> {
    inner: S,
    keep: P,
}

impl<S, P> Filter<S, P>
where
    S: Sequence,
    P: Fn(&S::Item) -> bool,
{
    pub fn new(inner: S, keep: P) -> Self {
        Self { inner, keep }
    }

    fn skip_rejected(&mut self) {
        while !self.inner.is_done() && !(self.keep)(&self.inner.item()) {
            self.inner.next();
        }
    }
}

impl<S, P> Sequence for Filter<S, P>
where
    S: Sequence,
    P: Fn(&S::Item) -> bool,
{
    type Item = S::Item;

    fn first(&mut self) {
        self.inner.first();
        self.skip_rejected();
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn next(&mut self) {
        assert_live(self.is_done(), "next");
        self.inner.next();
        self.skip_rejected();
    }

    fn item(&self) -> S::Item {
        assert_live(self.is_done(), "item");
        self.inner.item()
    }
}

/// Elements of the underlying sequence passed through a projection.
#[derive(Clone)]
pub struct Map<S, F> {
    inner: S,
    project: F,
}

impl<S, F, T> Map<S, F>
where
    S: Sequence,
    F: Fn(S::Item) -> T,
{
    pub fn new(inner: S, project: F) -> Self {
        Self { inner, project }
    }
}

impl<S, F, T> Sequence for Map<S, F>
where
    S: Sequence,
    F: Fn(S::Item) -> T,
{
    type Item = T;

    fn first(&mut self) {
        self.inner.first();
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn next(&mut self) {
        self.inner.next();
    }

    fn item(&self) -> T {
        (self.project)(self.inner.item())
    }

    fn size(&self) -> Option<u64> {
        self.inner.size()
    }

    fn advance_by(&mut self, n: u64) {
        self.inner.advance_by(n);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
