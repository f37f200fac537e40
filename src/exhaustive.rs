use std::hash::Hash;
use std::marker::PhantomData;

use crate::utils::axis::*;
use crate::utils::dist::*;
use crate::utils::query_memo::*;
use crate::utils::traits::*;
use crate::utils::NearestNeighbour;

/// Exhaustive (linear scan) nearest neighbour index
///
/// The reference baseline: stores the points untouched and scans all of them
/// for every query that misses the cache. Ties resolve to the point that
/// comes first in storage order.
///
/// ### Fields
///
/// * `points` - The stored points in build order
/// * `axes` - The axes defining the coordinate space
/// * `memo` - Query cache, selected set and result log
pub struct NaiveIndex<P, T, A> {
    points: Vec<P>,
    axes: Vec<A>,
    memo: QueryMemo<P>,
    _scalar: PhantomData<T>,
}

impl<P, T, A> NaiveIndex<P, T, A>
where
    P: Eq + Hash + Clone,
    T: IndexFloat,
    A: Axis<P, T>,
{
    /// Generate a new exhaustive index
    ///
    /// ### Params
    ///
    /// * `points` - The point multiset to index
    /// * `axes` - The axes defining the coordinate space. Must not be empty.
    ///
    /// ### Returns
    ///
    /// Initialised exhaustive index
    pub fn new(points: Vec<P>, axes: Vec<A>) -> Self {
        assert!(!axes.is_empty(), "An index needs at least one axis");

        Self {
            points,
            axes,
            memo: QueryMemo::new(),
            _scalar: PhantomData,
        }
    }

    /// Returns the size of the index in bytes
    ///
    /// Excludes heap memory owned by the points themselves.
    ///
    /// ### Returns
    ///
    /// Number of bytes used by the index
    pub fn memory_usage_bytes(&self) -> usize {
        std::mem::size_of_val(self)
            + self.points.capacity() * std::mem::size_of::<P>()
            + self.axes.capacity() * std::mem::size_of::<A>()
            + self.memo.history().len() * std::mem::size_of::<usize>()
    }
}

//////////////////////
// NearestNeighbour //
//////////////////////

impl<P, T, A> NearestNeighbour<P, T> for NaiveIndex<P, T, A>
where
    P: Eq + Hash + Clone,
    T: IndexFloat,
    A: Axis<P, T>,
{
    type AxisType = A;

    fn points(&self) -> &[P] {
        &self.points
    }

    fn axes(&self) -> &[A] {
        &self.axes
    }

    fn memo(&self) -> &QueryMemo<P> {
        &self.memo
    }

    fn memo_mut(&mut self) -> &mut QueryMemo<P> {
        &mut self.memo
    }

    fn search(&self, query: &P) -> Option<usize> {
        let mut best: Option<(usize, T)> = None;

        for (idx, point) in self.points.iter().enumerate() {
            let dist: T = squared_euclidean_distance(&self.axes, query, point);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((idx, dist)),
            }
        }

        best.map(|(idx, _)| idx)
    }
}

///////////
// Tests //
///////////
