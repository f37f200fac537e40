pub mod axis;
pub mod dist;
pub mod heap_structs;
pub mod k_means;
pub mod query_memo;
pub mod traits;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::hash::Hash;

use crate::utils::axis::*;
use crate::utils::dist::*;
use crate::utils::query_memo::*;
use crate::utils::traits::*;

//////////////////////
// NearestNeighbour //
//////////////////////

/// Shared contract of the nearest neighbour indices
///
/// Implementors provide storage access and an uncached search; the cached
/// query path, the selected set and the result log come for free.
pub trait NearestNeighbour<P, T>
where
    P: Eq + Hash + Clone,
    T: IndexFloat,
{
    /// The axis type the index was built with
    type AxisType: Axis<P, T>;

    /// Get the stored points (in build order)
    fn points(&self) -> &[P];

    /// Get the axes defining the coordinate space
    fn axes(&self) -> &[Self::AxisType];

    /// Get the query memo
    fn memo(&self) -> &QueryMemo<P>;

    /// Get the query memo mutably
    fn memo_mut(&mut self) -> &mut QueryMemo<P>;

    /// Uncached nearest neighbour search
    ///
    /// Leaves the memo untouched, so it can run on shared references.
    ///
    /// ### Params
    ///
    /// * `query` - The query point
    ///
    /// ### Returns
    ///
    /// Position of the nearest stored point, `None` only for an empty index
    fn search(&self, query: &P) -> Option<usize>;

    /// Number of stored points
    fn len(&self) -> usize {
        self.points().len()
    }

    /// Is the index empty
    fn is_empty(&self) -> bool {
        self.points().is_empty()
    }

    /// Euclidean distance between two points in this index's space
    ///
    /// ### Params
    ///
    /// * `a` - Point a
    /// * `b` - Point b
    ///
    /// ### Returns
    ///
    /// The distance over all axes
    #[inline]
    fn distance(&self, a: &P, b: &P) -> T {
        euclidean_distance(self.axes(), a, b)
    }

    /// Memoised nearest neighbour query returning the storage position
    ///
    /// Identical queries are answered from the cache. Every call appends to
    /// the result log; only cache misses grow the selected set.
    ///
    /// ### Params
    ///
    /// * `query` - The query point
    ///
    /// ### Returns
    ///
    /// Position of the nearest stored point in build order
    ///
    /// ### Panics
    ///
    /// Querying an empty index is a caller bug and panics.
    fn nearest_neighbour_idx(&mut self, query: &P) -> usize {
        assert!(
            !self.is_empty(),
            "Nearest neighbour query on an empty index"
        );

        if let Some(idx) = self.memo().lookup(query) {
            self.memo_mut().record_hit(idx);
            return idx;
        }

        let Some(idx) = self.search(query) else {
            unreachable!("search on a non-empty index always yields a candidate")
        };
        let result = self.points()[idx].clone();
        self.memo_mut().record_miss(query.clone(), idx, result);
        idx
    }

    /// Memoised nearest neighbour query
    ///
    /// ### Params
    ///
    /// * `query` - The query point
    ///
    /// ### Returns
    ///
    /// The nearest stored point
    ///
    /// ### Panics
    ///
    /// Querying an empty index is a caller bug and panics.
    fn nearest_neighbour(&mut self, query: &P) -> &P {
        let idx = self.nearest_neighbour_idx(query);
        &self.points()[idx]
    }

    /// Distinct points ever returned as a result
    fn selected(&self) -> &FxHashSet<P> {
        self.memo().selected()
    }

    /// Every result ever returned, in query order
    fn history(&self) -> Vec<&P> {
        let points = self.points();
        self.memo().history().iter().map(|&idx| &points[idx]).collect()
    }

    /// Number of queries answered so far (cache hits included)
    fn n_queries(&self) -> usize {
        self.memo().history().len()
    }

    /// Number of queries answered from the cache
    fn cache_hits(&self) -> usize {
        self.memo().hits()
    }
}

////////////////
// Validation //
////////////////

/// Outcome of comparing an index against a reference index
///
/// ### Fields
///
/// * `n_queries` - Number of queries compared
/// * `n_agree` - Queries where both answers lie at the same distance
/// * `agreement` - `n_agree / n_queries`
/// * `max_dist_err` - Largest excess distance of the index over the
///   reference
/// * `first_mismatch` - Position (in the query slice) of the first query the
///   two disagree on
#[derive(Clone, Debug)]
pub struct ValidationReport<T> {
    pub n_queries: usize,
    pub n_agree: usize,
    pub agreement: f64,
    pub max_dist_err: T,
    pub first_mismatch: Option<usize>,
}

/// Validate an index against a reference (usually the exhaustive one)
///
/// Both indices are searched uncached, so the memos of neither are touched.
/// Ties may resolve to different points; only the distances are compared.
///
/// ### Params
///
/// * `index` - The index under test
/// * `reference` - The ground truth index
/// * `queries` - Query points
///
/// ### Returns
///
/// The `ValidationReport`
pub fn validate_against<P, T, I, R>(index: &I, reference: &R, queries: &[P]) -> ValidationReport<T>
where
    P: Eq + Hash + Clone + Sync,
    T: IndexFloat,
    I: NearestNeighbour<P, T> + Sync,
    R: NearestNeighbour<P, T> + Sync,
{
    assert!(
        !index.is_empty() && !reference.is_empty(),
        "Cannot validate against an empty index"
    );

    let dists: Vec<(T, T)> = queries
        .par_iter()
        .map(|query| {
            let got = index.search(query).map(|i| &index.points()[i]);
            let truth = reference.search(query).map(|i| &reference.points()[i]);
            match (got, truth) {
                (Some(got), Some(truth)) => (
                    index.distance(query, got),
                    reference.distance(query, truth),
                ),
                _ => (T::infinity(), T::zero()),
            }
        })
        .collect();

    let rel_tol = T::epsilon().sqrt();
    let mut n_agree = 0;
    let mut first_mismatch = None;
    let mut max_dist_err = T::zero();

    for (i, &(d_got, d_truth)) in dists.iter().enumerate() {
        let err = d_got - d_truth;
        if err.abs() <= rel_tol * (T::one() + d_truth) {
            n_agree += 1;
        } else if first_mismatch.is_none() {
            first_mismatch = Some(i);
        }
        if err > max_dist_err {
            max_dist_err = err;
        }
    }

    let agreement = if queries.is_empty() {
        1.0
    } else {
        n_agree as f64 / queries.len() as f64
    };

    ValidationReport {
        n_queries: queries.len(),
        n_agree,
        agreement,
        max_dist_err,
        first_mismatch,
    }
}
