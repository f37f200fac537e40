use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::error::*;
use crate::kd_tree::KdTreeIndex;
use crate::utils::axis::*;
use crate::utils::traits::*;
use crate::utils::NearestNeighbour;

////////////////////////
// k-means clustering //
////////////////////////

/// Hard cap on the number of Lloyd iterations
pub const MAX_ITERS: usize = 1000;

/// Default seed of the initial centroid shuffle
pub const DEFAULT_SEED: u64 = 1337;

/// Default number of clusters
pub const DEFAULT_K: usize = 8;

/// Parameters of a k-means run
///
/// ### Fields
///
/// * `k` - Number of clusters. Must lie in `1..=distinct input points`.
/// * `seed` - Seed for the initial centroid shuffle
/// * `max_iters` - Maximum Lloyd iterations, clamped to `MAX_ITERS`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub max_iters: usize,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            seed: DEFAULT_SEED,
            max_iters: MAX_ITERS,
        }
    }
}

impl KMeansParams {
    /// Parameters for `k` clusters with default seed and iteration cap
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Iteration budget after applying the hard cap
    pub fn effective_max_iters(&self) -> usize {
        self.max_iters.min(MAX_ITERS)
    }
}

/// Outcome of a k-means run
///
/// ### Fields
///
/// * `centroids` - Final centroids. Can hold fewer than `k` entries if
///   clusters ran empty along the way.
/// * `converged` - `true` if the centroids stopped changing before the
///   iteration budget ran out
/// * `iterations` - Number of updates that changed the centroids
#[derive(Clone, Debug)]
pub struct KMeansResult<T> {
    pub centroids: Vec<Coords<T>>,
    pub converged: bool,
    pub iterations: usize,
}

/////////////
// Helpers //
/////////////

/// Pick the initial centroids
///
/// Deduplicates the values (keeping first occurrences), shuffles the
/// distinct values with a seeded generator and takes the first `k`.
///
/// ### Params
///
/// * `values` - Input coordinate tuples
/// * `k` - Number of clusters
/// * `seed` - Random seed
///
/// ### Returns
///
/// `k` distinct starting centroids, or `InvalidK` if `k` is zero or exceeds
/// the number of distinct values
fn initial_means<T>(values: &[Coords<T>], k: usize, seed: u64) -> ClusterResult<Vec<Coords<T>>>
where
    T: IndexFloat,
{
    let mut seen: FxHashSet<&Coords<T>> = FxHashSet::default();
    let mut candidates = Vec::new();
    for value in values {
        if seen.insert(value) {
            candidates.push(value.clone());
        }
    }

    if k == 0 || k > candidates.len() {
        return Err(ClusterError::InvalidK {
            k,
            n_distinct: candidates.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    candidates.shuffle(&mut rng);
    candidates.truncate(k);

    Ok(candidates)
}

/// One Lloyd iteration
///
/// Builds a kd-tree over the current centroids, assigns every value to its
/// nearest centroid and returns the per-cluster means. Clusters that ran
/// empty are dropped; the rest keep the order of `means`.
///
/// ### Params
///
/// * `values` - Input coordinate tuples
/// * `means` - Current centroids
/// * `dim` - Dimensionality
///
/// ### Returns
///
/// The updated centroids
fn lloyd_step<T>(values: &[Coords<T>], means: &[Coords<T>], dim: usize) -> Vec<Coords<T>>
where
    T: IndexFloat,
{
    let k = means.len();
    let mut tree = KdTreeIndex::new(means.to_vec(), projection_axes(dim));

    let mut sums = vec![T::zero(); k * dim];
    let mut counts = vec![T::zero(); k];
    let mut sizes = vec![0usize; k];

    for value in values {
        let cluster = tree.nearest_neighbour_idx(value);
        sizes[cluster] += 1;
        counts[cluster] = counts[cluster] + T::one();
        for d in 0..dim {
            sums[cluster * dim + d] = sums[cluster * dim + d] + value[d];
        }
    }

    (0..k)
        .filter(|&c| sizes[c] > 0)
        .map(|c| {
            Coords(
                (0..dim)
                    .map(|d| sums[c * dim + d] / counts[c])
                    .collect(),
            )
        })
        .collect()
}

//////////
// Main //
//////////

/// Run k-means on coordinate tuples
///
/// Lloyd iterations until the centroids are exactly equal to those of the
/// previous iteration (no tolerance) or the iteration budget is spent.
/// Running out of iterations is not an error: the last centroids come back
/// with `converged = false`.
///
/// ### Params
///
/// * `values` - Input coordinate tuples, all of the same dimensionality
/// * `params` - The `KMeansParams`
///
/// ### Returns
///
/// The `KMeansResult`
pub fn kmeans_coords<T>(values: &[Coords<T>], params: &KMeansParams) -> ClusterResult<KMeansResult<T>>
where
    T: IndexFloat,
{
    let Some(first) = values.first() else {
        return Err(ClusterError::EmptyInput);
    };
    let dim = first.dim();
    if dim == 0 {
        return Err(ClusterError::NoAxes);
    }
    assert!(
        values.iter().all(|v| v.dim() == dim),
        "All values need the same dimensionality"
    );

    let mut means = initial_means(values, params.k, params.seed)?;
    let max_iters = params.effective_max_iters();

    for iter in 0..max_iters {
        let new_means = lloyd_step(values, &means, dim);
        debug!(
            "k-means iteration {}: {} centroids from {} values",
            iter,
            new_means.len(),
            values.len()
        );

        if new_means == means {
            info!("k-means converged after {} iterations", iter);
            return Ok(KMeansResult {
                centroids: new_means,
                converged: true,
                iterations: iter,
            });
        }
        means = new_means;
    }

    warn!(
        "k-means ran out of iterations ({}) before converging",
        max_iters
    );

    Ok(KMeansResult {
        centroids: means,
        converged: false,
        iterations: max_iters,
    })
}

/// Run k-means on arbitrary points
///
/// Points are projected into coordinate tuples via the axes first; only the
/// geometry is used from there on.
///
/// ### Params
///
/// * `points` - The input points
/// * `axes` - The axes defining the coordinate space
/// * `params` - The `KMeansParams`
///
/// ### Returns
///
/// The `KMeansResult`
pub fn kmeans<P, T, A>(points: &[P], axes: &[A], params: &KMeansParams) -> ClusterResult<KMeansResult<T>>
where
    T: IndexFloat,
    A: Axis<P, T>,
{
    if axes.is_empty() {
        return Err(ClusterError::NoAxes);
    }
    let values: Vec<Coords<T>> = points.iter().map(|p| Coords::from_point(p, axes)).collect();
    kmeans_coords(&values, params)
}

/// Run k-means on a weighted histogram of points
///
/// Every `(point, count)` entry counts as `count` copies of the point.
///
/// ### Params
///
/// * `histogram` - The `(point, count)` pairs
/// * `axes` - The axes defining the coordinate space
/// * `params` - The `KMeansParams`
///
/// ### Returns
///
/// The `KMeansResult`
pub fn kmeans_weighted<P, T, A>(
    histogram: &[(P, usize)],
    axes: &[A],
    params: &KMeansParams,
) -> ClusterResult<KMeansResult<T>>
where
    T: IndexFloat,
    A: Axis<P, T>,
{
    if axes.is_empty() {
        return Err(ClusterError::NoAxes);
    }
    let values: Vec<Coords<T>> = histogram
        .iter()
        .flat_map(|(point, count)| {
            let coords = Coords::from_point(point, axes);
            std::iter::repeat_n(coords, *count)
        })
        .collect();
    kmeans_coords(&values, params)
}

///////////
// Tests //
///////////
