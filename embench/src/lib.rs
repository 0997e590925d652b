use std::sync::Arc;

pub mod cfg;
pub mod cmd;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod logging;
pub mod progress;
pub mod recorder;
pub mod report;
pub mod runtime;
pub mod sink;
pub mod stat;

/// Thread-safe producing iterators.
///
/// Unlike the [`Iterator`] this trait accepts `self` by reference and never
/// runs out of items.
///
/// Think of it as an infinite thread-safe iterator, shared between all
/// engine slots.
pub trait Produce {
    /// The type of the elements being produced.
    type Item;

    /// Advances this producer and returns the next value.
    fn next(&self) -> Self::Item;
}

impl<P> Produce for Arc<P>
where
    P: Produce + ?Sized,
{
    type Item = P::Item;

    #[inline]
    fn next(&self) -> Self::Item {
        P::next(self)
    }
}

/// Infinite cycle producing iterator, that yields the same value.
#[derive(Debug)]
pub struct OneProduce<T> {
    v: T,
}

impl<T> OneProduce<T> {
    /// Constructs a new [`OneProduce`] from the given value.
    #[inline]
    pub const fn new(v: T) -> Self {
        Self { v }
    }
}

impl<T> Produce for OneProduce<T>
where
    T: Clone,
{
    type Item = T;

    #[inline]
    fn next(&self) -> Self::Item {
        self.v.clone()
    }
}
