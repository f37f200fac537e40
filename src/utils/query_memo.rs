use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

/// Query memoisation owned by a single index
///
/// Keeps the result of every distinct query ever answered, the set of
/// distinct points handed out as results and the ordered log of all results
/// (cache hits included). Results are stored as positions into the index's
/// point storage.
///
/// ### Fields
///
/// * `cache` - Query point -> position of its nearest neighbour
/// * `selected` - Distinct points ever returned as a result
/// * `history` - Positions of every result returned, in query order
/// * `hits` - Number of queries answered from the cache
#[derive(Clone, Debug)]
pub struct QueryMemo<P> {
    cache: FxHashMap<P, usize>,
    selected: FxHashSet<P>,
    history: Vec<usize>,
    hits: usize,
}

impl<P> Default for QueryMemo<P> {
    fn default() -> Self {
        Self {
            cache: FxHashMap::default(),
            selected: FxHashSet::default(),
            history: Vec::new(),
            hits: 0,
        }
    }
}

impl<P> QueryMemo<P>
where
    P: Eq + Hash + Clone,
{
    /// Generate an empty memo
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previous answer
    ///
    /// ### Params
    ///
    /// * `query` - The query point
    ///
    /// ### Returns
    ///
    /// The cached result position, if the query was seen before
    #[inline]
    pub fn lookup(&self, query: &P) -> Option<usize> {
        self.cache.get(query).copied()
    }

    /// Record an answer served from the cache
    ///
    /// ### Params
    ///
    /// * `idx` - Position of the cached result
    #[inline]
    pub fn record_hit(&mut self, idx: usize) {
        self.hits += 1;
        self.history.push(idx);
    }

    /// Record a freshly computed answer
    ///
    /// ### Params
    ///
    /// * `query` - The query point (becomes a cache key)
    /// * `idx` - Position of the result
    /// * `result` - The result point itself
    pub fn record_miss(&mut self, query: P, idx: usize, result: P) {
        self.cache.insert(query, idx);
        self.selected.insert(result);
        self.history.push(idx);
    }

    /// Distinct points returned so far
    pub fn selected(&self) -> &FxHashSet<P> {
        &self.selected
    }

    /// Result positions in query order
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Number of distinct queries answered
    pub fn n_cached(&self) -> usize {
        self.cache.len()
    }

    /// Number of queries answered from the cache
    pub fn hits(&self) -> usize {
        self.hits
    }
}

///////////
// Tests //
///////////
