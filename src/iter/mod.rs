//! Lazy sequences with an explicit cursor.
//!
//! Every source the graph walks, whether a slice, the solid k-mer set, or a
//! product or nesting of other sequences, is consumed through the same four
//! calls:
//!
//! ```text
//! seq.first();
//! while !seq.is_done() {
//!     let x = seq.item();
//!     seq.next();
//! }
//! ```
//!
//! A freshly built sequence reports done until `first()` positions it.
//! `item()` and `next()` on a done sequence are contract violations and
//! panic. `size()` is the number of elements a full pass would yield, when
//! that is known without walking.
//!
//! The variants live in [`wrappers`]; [`Sequence::items`] bridges any of them
//! to a std [`Iterator`].

pub mod wrappers;

pub use wrappers::{Cartesian, Compound, Empty, Filter, ListSequence, Map, Paired, Truncate};

/// Cursor over a finite run of elements.
pub trait Sequence {
    type Item;

    /// Reset the cursor onto the first element (or onto the done state).
    fn first(&mut self);

    /// Whether the cursor currently references no element.
    fn is_done(&self) -> bool;

    /// Advance exactly one element. Panics if done.
    fn next(&mut self);

    /// The current element. Panics if done.
    fn item(&self) -> Self::Item;

    /// Element count of a full pass, if computable without traversal.
    fn size(&self) -> Option<u64> {
        None
    }

    /// Skip up to `n` elements, stopping early at the end.
    ///
    /// Sequences with random access override this so that a dispatcher
    /// worker can jump straight to its chunk.
    fn advance_by(&mut self, n: u64) {
        for _ in 0..n {
            if self.is_done() {
                break;
            }
            self.next();
        }
    }

    /// Restart the cursor and walk it as a std iterator.
    fn items(self) -> Items<Self>
    where
        Self: Sized,
    {
        Items::new(self)
    }
}

impl<S: Sequence + ?Sized> Sequence for &mut S {
    type Item = S::Item;

    fn first(&mut self) {
        (**self).first()
    }
    fn is_done(&self) -> bool {
        (**self).is_done()
    }
    fn next(&mut self) {
        (**self).next()
    }
    fn item(&self) -> S::Item {
        (**self).item()
    }
    fn size(&self) -> Option<u64> {
        (**self).size()
    }
    fn advance_by(&mut self, n: u64) {
        (**self).advance_by(n)
    }
}

impl<S: Sequence + ?Sized> Sequence for Box<S> {
    type Item = S::Item;

    fn first(&mut self) {
        (**self).first()
    }
    fn is_done(&self) -> bool {
        (**self).is_done()
    }
    fn next(&mut self) {
        (**self).next()
    }
    fn item(&self) -> S::Item {
        (**self).item()
    }
    fn size(&self) -> Option<u64> {
        (**self).size()
    }
    fn advance_by(&mut self, n: u64) {
        (**self).advance_by(n)
    }
}

// ---------------------------------------------------------------------------
// Iterator bridge
// ---------------------------------------------------------------------------

/// A sequence walked as a std [`Iterator`], from its first element.
pub struct Items<S> {
    seq: S,
    primed: bool,
}

impl<S: Sequence> Items<S> {
    fn new(mut seq: S) -> Self {
        seq.first();
        Self { seq, primed: true }
    }

    /// Give the underlying cursor back.
    pub fn into_inner(self) -> S {
        self.seq
    }
}

impl<S: Sequence> Iterator for Items<S> {
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        if self.primed {
            self.primed = false;
        } else if !self.seq.is_done() {
            self.seq.next();
        }
        if self.seq.is_done() {
            None
        } else {
            Some(self.seq.item())
        }
    }
}

/// Walk `seq` once and collect every element.
///
/// This is how a sequence of unknown size is made dispatchable: wrap the
/// result in a [`ListSequence`].
pub fn materialize<S: Sequence>(mut seq: S) -> Vec<S::Item> {
    let mut out = Vec::with_capacity(seq.size().unwrap_or(0) as usize);
    seq.first();
    while !seq.is_done() {
        out.push(seq.item());
        seq.next();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_bridge_matches_cursor() {
        let values = [1, 2, 3, 5, 8];
        let seen: Vec<i32> = ListSequence::new(&values).items().copied().collect();
        assert_eq!(seen, values);
    }

    #[test]
    fn test_items_restarts_borrowed_cursor() {
        let values = [4, 5, 6];
        let mut seq = ListSequence::new(&values);
        seq.first();
        seq.next();
        seq.next();
        // items() always starts over.
        assert_eq!((&mut seq).items().count(), 3);
        assert!(seq.is_done());
    }

    #[test]
    fn test_materialize_filter() {
        let values: Vec<u32> = (0..10).collect();
        let evens = Filter::new(ListSequence::new(&values), |x| **x % 2 == 0);
        let out: Vec<u32> = materialize(evens).into_iter().copied().collect();
        assert_eq!(out, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_boxed_variants_share_one_interface() {
        let a = [1u32, 2, 3];
        let b = [10u32, 20];
        let seqs: Vec<Box<dyn Sequence<Item = &u32> + '_>> = vec![
            Box::new(Empty::<&u32>::new()),
            Box::new(ListSequence::new(&a)),
            Box::new(Truncate::new(ListSequence::new(&a), 2)),
            Box::new(Map::new(
                Paired::new(ListSequence::new(&a), ListSequence::new(&b)),
                |(x, _)| x,
            )),
        ];
        let counts: Vec<usize> = seqs.into_iter().map(|s| s.items().count()).collect();
        assert_eq!(counts, vec![0, 3, 2, 2]);
    }
}
