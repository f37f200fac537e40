#![allow(clippy::needless_range_loop)] // I want these loops!

pub mod error;
pub mod exhaustive;
pub mod kd_tree;
pub mod palette;
pub mod synthetic;
pub mod utils;

use rayon::prelude::*;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub use crate::error::*;
pub use crate::exhaustive::NaiveIndex;
pub use crate::kd_tree::{KdTreeIndex, PartitionViolation};
pub use crate::palette::*;
pub use crate::utils::axis::{projection_axes, Axis, Coords, Projection};
pub use crate::utils::k_means::*;
pub use crate::utils::traits::IndexFloat;
pub use crate::utils::{validate_against, NearestNeighbour, ValidationReport};

/// Report progress every this many queries
const PROGRESS_EVERY: usize = 100_000;

/////////////
// KD tree //
/////////////

/// Build a kd-tree index
///
/// ### Params
///
/// * `points` - The points to index
/// * `axes` - The axes defining the coordinate space
///
/// ### Returns
///
/// The `KdTreeIndex`
pub fn build_kd_tree_index<P, T, A>(points: Vec<P>, axes: Vec<A>) -> KdTreeIndex<P, T, A>
where
    P: Eq + Hash + Clone,
    T: IndexFloat,
    A: Axis<P, T>,
{
    KdTreeIndex::new(points, axes)
}

///////////
// Naive //
///////////

/// Build an exhaustive (linear scan) index
///
/// ### Params
///
/// * `points` - The points to index
/// * `axes` - The axes defining the coordinate space
///
/// ### Returns
///
/// The `NaiveIndex`
pub fn build_naive_index<P, T, A>(points: Vec<P>, axes: Vec<A>) -> NaiveIndex<P, T, A>
where
    P: Eq + Hash + Clone,
    T: IndexFloat,
    A: Axis<P, T>,
{
    NaiveIndex::new(points, axes)
}

//////////////
// Querying //
//////////////

/// Query an index sequentially through its cache
///
/// Every query is recorded in the index's history and selected set.
///
/// ### Params
///
/// * `index` - Either index
/// * `queries` - The query points
///
/// ### Returns
///
/// Positions of the nearest stored points, one per query
pub fn query_index<P, T, I>(index: &mut I, queries: &[P]) -> Vec<usize>
where
    P: Eq + Hash + Clone,
    T: IndexFloat,
    I: NearestNeighbour<P, T>,
{
    let n_queries = queries.len();
    let res: Vec<usize> = queries
        .iter()
        .enumerate()
        .map(|(i, query)| {
            let idx = index.nearest_neighbour_idx(query);
            if (i + 1) % PROGRESS_EVERY == 0 {
                debug!("  Processed {} / {} queries.", i + 1, n_queries);
            }
            idx
        })
        .collect();

    debug!(
        "Answered {} queries, {} from cache",
        n_queries,
        index.cache_hits()
    );

    res
}

/// Query an index in parallel, bypassing its cache
///
/// The index is left untouched: no history, no selected set.
///
/// ### Params
///
/// * `index` - Either index
/// * `queries` - The query points
///
/// ### Returns
///
/// Positions of the nearest stored points, one per query
pub fn query_index_parallel<P, T, I>(index: &I, queries: &[P]) -> Vec<usize>
where
    P: Eq + Hash + Clone + Sync,
    T: IndexFloat,
    I: NearestNeighbour<P, T> + Sync,
{
    assert!(!index.is_empty(), "Nearest neighbour query on an empty index");

    let n_queries = queries.len();
    let counter = Arc::new(AtomicUsize::new(0));

    queries
        .par_iter()
        .map(|query| {
            let Some(idx) = index.search(query) else {
                unreachable!("Search on a non-empty index always finds a point")
            };

            let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
            if count % PROGRESS_EVERY == 0 {
                debug!("  Processed {} / {} queries.", count, n_queries);
            }

            idx
        })
        .collect()
}

///////////
// Tests //
///////////
