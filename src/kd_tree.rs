use std::hash::Hash;
use std::marker::PhantomData;
use thousands::*;
use tracing::debug;

use crate::utils::axis::*;
use crate::utils::heap_structs::*;
use crate::utils::query_memo::*;
use crate::utils::traits::*;
use crate::utils::NearestNeighbour;

/// Sentinel for a missing child
pub const NO_CHILD: u32 = u32::MAX;

////////////////
// Main types //
////////////////

/// Node representation in the flattened kd-tree
///
/// ### Fields
///
/// * `pivot` - Position of the pivot point in the point storage
/// * `left` - Node index of the subtree with smaller axis values, or
///   `NO_CHILD`
/// * `right` - Node index of the subtree with greater or equal axis values,
///   or `NO_CHILD`
#[derive(Clone, Copy, Debug)]
#[repr(C)]
struct KdNode {
    pivot: u32,
    left: u32,
    right: u32,
}

/// A node whose subtree breaks the split rule
///
/// ### Fields
///
/// * `node` - Index of the offending node
/// * `depth` - Depth of the node (decides the split axis)
/// * `point` - Position of the misplaced point in the point storage
/// * `in_left` - Whether the point sits in the left subtree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionViolation {
    pub node: usize,
    pub depth: usize,
    pub point: usize,
    pub in_left: bool,
}

/////////////////
// KdTreeIndex //
/////////////////

/// KdTreeIndex
///
/// Balanced binary space partitioning tree over a list of axes. The tree is
/// built once by recursive median splits, cycling through the axes by depth,
/// and is immutable afterwards. Queries are exact and memoised per query
/// value.
///
/// ### Fields
///
/// * `points` - The stored points in build order
/// * `axes` - The axes defining the coordinate space
/// * `nodes` - Flattened tree structure
/// * `root` - Index of the root node, `NO_CHILD` for an empty tree
/// * `memo` - Query cache, selected set and result log
pub struct KdTreeIndex<P, T, A> {
    points: Vec<P>,
    axes: Vec<A>,
    nodes: Vec<KdNode>,
    root: u32,
    memo: QueryMemo<P>,
    _scalar: PhantomData<T>,
}

impl<P, T, A> KdTreeIndex<P, T, A>
where
    P: Eq + Hash + Clone,
    T: IndexFloat,
    A: Axis<P, T>,
{
    //////////////////////
    // Index generation //
    //////////////////////

    /// Generate a new KdTreeIndex
    ///
    /// ### Params
    ///
    /// * `points` - The point multiset to index. Duplicates are kept; every
    ///   point ends up in exactly one node.
    /// * `axes` - The axes defining the coordinate space. Must not be empty.
    ///   The axis at position `d % axes.len()` splits tree depth `d`.
    ///
    /// ### Returns
    ///
    /// Index ready for querying
    pub fn new(points: Vec<P>, axes: Vec<A>) -> Self {
        assert!(!axes.is_empty(), "An index needs at least one axis");
        assert!(
            points.len() < NO_CHILD as usize,
            "Too many points for a kd-tree: {}",
            points.len()
        );

        let mut items: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let root = Self::build_node(&points, &axes, &mut items, &mut nodes, 0);

        let index = KdTreeIndex {
            points,
            axes,
            nodes,
            root,
            memo: QueryMemo::new(),
            _scalar: PhantomData,
        };

        debug!(
            "Built kd-tree over {} points with depth {}",
            index.points.len().separate_with_underscores(),
            index.depth()
        );

        index
    }

    /// Build a subtree
    ///
    /// Sorts the items along the depth's axis and takes the median as pivot.
    /// The median is moved left to the start of any run of axis-equal values,
    /// so everything in the left subtree is strictly smaller than the pivot.
    /// The right edge of the run is not adjusted.
    ///
    /// ### Params
    ///
    /// * `points` - The point storage
    /// * `axes` - The axes
    /// * `items` - Positions of the points in this subtree. Gets reordered.
    /// * `nodes` - Node arena, appended to
    /// * `depth` - The current depth
    ///
    /// ### Returns
    ///
    /// Index of the subtree root, `NO_CHILD` if `items` is empty
    fn build_node(
        points: &[P],
        axes: &[A],
        items: &mut [usize],
        nodes: &mut Vec<KdNode>,
        depth: usize,
    ) -> u32 {
        if items.is_empty() {
            return NO_CHILD;
        }

        let axis = &axes[depth % axes.len()];
        items.sort_unstable_by_key(|&i| OrderedFloat(axis.extract(&points[i])));

        let mut median = items.len() / 2;
        while median > 0
            && axis.extract(&points[items[median]]) == axis.extract(&points[items[median - 1]])
        {
            median -= 1;
        }

        let node_idx = nodes.len();
        nodes.push(KdNode {
            pivot: items[median] as u32,
            left: NO_CHILD,
            right: NO_CHILD,
        });

        let (left_items, rest) = items.split_at_mut(median);
        let right_items = &mut rest[1..];

        let left = Self::build_node(points, axes, left_items, nodes, depth + 1);
        let right = Self::build_node(points, axes, right_items, nodes, depth + 1);

        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        node_idx as u32
    }

    ///////////
    // Query //
    ///////////

    /// Backtracking nearest neighbour search below one node
    ///
    /// Descends into the side of the split the query falls on first, then
    /// visits the other side only if the best distance so far reaches the
    /// splitting hyperplane.
    ///
    /// ### Params
    ///
    /// * `node_idx` - The node to search from
    /// * `query` - The query point
    /// * `depth` - Depth of `node_idx`
    ///
    /// ### Returns
    ///
    /// Position of the best point in the subtree, `None` for an empty
    /// subtree
    fn search_node(&self, node_idx: u32, query: &P, depth: usize) -> Option<usize> {
        if node_idx == NO_CHILD {
            return None;
        }

        let node = self.nodes[node_idx as usize];
        let pivot_idx = node.pivot as usize;
        let pivot = &self.points[pivot_idx];
        let axis = &self.axes[depth % self.axes.len()];

        let query_val = axis.extract(query);
        let pivot_val = axis.extract(pivot);

        let (near, far) = if query_val < pivot_val {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        let mut best = self
            .search_node(near, query, depth + 1)
            .unwrap_or(pivot_idx);
        let mut best_dist = self.distance(query, &self.points[best]);

        let pivot_dist = self.distance(query, pivot);
        if pivot_dist < best_dist {
            best = pivot_idx;
            best_dist = pivot_dist;
        }

        // the far side can only hold something closer if the hypersphere
        // around the query reaches the splitting plane
        if best_dist >= (query_val - pivot_val).abs() {
            if let Some(other) = self.search_node(far, query, depth + 1) {
                let other_dist = self.distance(query, &self.points[other]);
                if other_dist < best_dist {
                    best = other;
                }
            }
        }

        Some(best)
    }

    ////////////////
    // Inspection //
    ////////////////

    /// Number of levels in the tree
    ///
    /// ### Returns
    ///
    /// `0` for an empty tree, otherwise the length of the longest root to
    /// leaf path
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = Vec::new();
        if self.root != NO_CHILD {
            stack.push((self.root, 1));
        }

        while let Some((node_idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            let node = self.nodes[node_idx as usize];
            for child in [node.left, node.right] {
                if child != NO_CHILD {
                    stack.push((child, depth + 1));
                }
            }
        }

        max_depth
    }

    /// Pivots in in-order sequence
    ///
    /// ### Returns
    ///
    /// References to all stored points, left subtree before pivot before
    /// right subtree
    pub fn in_order(&self) -> Vec<&P> {
        let mut result = Vec::with_capacity(self.points.len());
        let mut stack = Vec::new();
        let mut current = self.root;

        while current != NO_CHILD || !stack.is_empty() {
            while current != NO_CHILD {
                stack.push(current);
                current = self.nodes[current as usize].left;
            }
            if let Some(node_idx) = stack.pop() {
                let node = self.nodes[node_idx as usize];
                result.push(&self.points[node.pivot as usize]);
                current = node.right;
            }
        }

        result
    }

    /// Render the tree as nested text
    ///
    /// Every node renders as `(left)<v1,v2,...>(right)` where the values are
    /// the pivot's axis coordinates.
    ///
    /// ### Returns
    ///
    /// The rendering, empty for an empty tree
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root, &mut out);
        out
    }

    fn render_node(&self, node_idx: u32, out: &mut String) {
        if node_idx == NO_CHILD {
            return;
        }
        let node = self.nodes[node_idx as usize];
        let pivot = &self.points[node.pivot as usize];

        out.push('(');
        self.render_node(node.left, out);
        out.push_str(")<");
        let coords: Vec<String> = self
            .axes
            .iter()
            .map(|axis| format!("{:?}", axis.extract(pivot)))
            .collect();
        out.push_str(&coords.join(","));
        out.push_str(">(");
        self.render_node(node.right, out);
        out.push(')');
    }

    /// Check the split rule on every node
    ///
    /// Everything in a left subtree must lie strictly below the pivot on the
    /// node's axis, everything in a right subtree at or above it.
    ///
    /// ### Returns
    ///
    /// All violations found; empty for a well-formed tree
    pub fn check_partition(&self) -> Vec<PartitionViolation> {
        let mut violations = Vec::new();
        self.collect_members(self.root, 0, &mut violations);
        violations
    }

    fn collect_members(
        &self,
        node_idx: u32,
        depth: usize,
        violations: &mut Vec<PartitionViolation>,
    ) -> Vec<usize> {
        if node_idx == NO_CHILD {
            return Vec::new();
        }
        let node = self.nodes[node_idx as usize];
        let left = self.collect_members(node.left, depth + 1, violations);
        let right = self.collect_members(node.right, depth + 1, violations);

        let axis = &self.axes[depth % self.axes.len()];
        let pivot_val = axis.extract(&self.points[node.pivot as usize]);

        for (members, in_left) in [(&left, true), (&right, false)] {
            for &point in members {
                let val = axis.extract(&self.points[point]);
                let ok = if in_left {
                    val < pivot_val
                } else {
                    val >= pivot_val
                };
                if !ok {
                    violations.push(PartitionViolation {
                        node: node_idx as usize,
                        depth,
                        point,
                        in_left,
                    });
                }
            }
        }

        let mut members = left;
        members.push(node.pivot as usize);
        members.extend(right);
        members
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
            + self.nodes.capacity() * std::mem::size_of::<KdNode>()
            + self.memo.history().len() * std::mem::size_of::<usize>()
    }
}

//////////////////////
// NearestNeighbour //
//////////////////////

impl<P, T, A> NearestNeighbour<P, T> for KdTreeIndex<P, T, A>
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
        self.search_node(self.root, query, 0)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exhaustive::NaiveIndex;
    use crate::utils::validate_against;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    type Axis1d = fn(&i64) -> f64;

    fn identity(x: &i64) -> f64 {
        *x as f64
    }

    fn tree_1d(points: Vec<i64>) -> KdTreeIndex<i64, f64, Axis1d> {
        KdTreeIndex::new(points, vec![identity as Axis1d])
    }

    fn random_coords(rng: &mut StdRng, n: usize, dim: usize, max: i32) -> Vec<Coords<f64>> {
        (0..n)
            .map(|_| {
                Coords(
                    (0..dim)
                        .map(|_| rng.random_range(0..=max) as f64)
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_kd_tree_index_creation() {
        let index = tree_1d((0..10).collect());
        assert_eq!(index.len(), 10);
        assert_eq!(index.depth(), 4);
        assert!(index.check_partition().is_empty());
    }

    #[test]
    fn test_kd_tree_in_order_is_sorted_in_1d() {
        let index = tree_1d(vec![5, 3, 9, 1, 7, 2, 8]);
        let ordered: Vec<i64> = index.in_order().into_iter().copied().collect();
        assert_eq!(ordered, vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_kd_tree_render() {
        let index = tree_1d(vec![1, 2, 3]);
        assert_eq!(index.render(), "(()<1.0>())<2.0>(()<3.0>())");
        assert_eq!(tree_1d(Vec::new()).render(), "");
    }

    #[test]
    fn test_kd_tree_median_moves_to_run_start() {
        // sorted: 1 4 4 4 9 -> median 2 moves left to position 1
        let index = tree_1d(vec![4, 9, 4, 1, 4]);
        assert_eq!(index.render(), "(()<1.0>())<4.0>(()<4.0>((()<4.0>())<9.0>()))");
        assert!(index.check_partition().is_empty());
    }

    #[test]
    fn test_kd_tree_query_spaced_points() {
        let mut index = tree_1d((0..100).map(|i| i * 10).collect());
        assert_eq!(*index.nearest_neighbour(&503), 500);
        assert_eq!(*index.nearest_neighbour(&507), 510);
        assert_eq!(*index.nearest_neighbour(&-1000), 0);
        assert_eq!(*index.nearest_neighbour(&1000), 990);
    }

    #[test]
    fn test_kd_tree_finds_self_1d() {
        let mut index = tree_1d((0..100).collect());
        for i in 0..100 {
            assert_eq!(*index.nearest_neighbour(&i), i);
        }
        assert_eq!(index.selected().len(), 100);
    }

    #[test]
    fn test_kd_tree_finds_self_all_axis_orders() {
        let mut rng = StdRng::seed_from_u64(42);
        let points = random_coords(&mut rng, 200, 3, 255);
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in orders {
            let axes: Vec<Projection> = order.iter().map(|&d| Projection(d)).collect();
            let mut index = KdTreeIndex::new(points.clone(), axes);
            for p in &points {
                let found = index.nearest_neighbour(p).clone();
                assert_eq!(&found, p);
            }
        }
    }

    #[test]
    fn test_kd_tree_agrees_with_naive_random_1d() {
        let mut rng = StdRng::seed_from_u64(1337);
        for _ in 0..20 {
            let points: Vec<i64> = (0..10).map(|_| rng.random_range(0..=255)).collect();
            let mut tree = tree_1d(points.clone());
            let mut naive = NaiveIndex::new(points, vec![identity as Axis1d]);

            for q in 0..1000 {
                let a = *tree.nearest_neighbour(&q);
                let b = *naive.nearest_neighbour(&q);
                assert_eq!((q - a).abs(), (q - b).abs(), "query {}: {} vs {}", q, a, b);
            }
        }
    }

    #[test]
    fn test_kd_tree_agrees_with_naive_random_3d() {
        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..10 {
            // small coordinate range forces plenty of duplicates on each axis
            let max = if round % 2 == 0 { 255 } else { 8 };
            let points = random_coords(&mut rng, 150, 3, max);
            let queries = random_coords(&mut rng, 500, 3, max + 10);

            let tree = KdTreeIndex::new(points.clone(), projection_axes(3));
            let naive = NaiveIndex::new(points, projection_axes(3));
            assert!(tree.check_partition().is_empty());

            let report = validate_against(&tree, &naive, &queries);
            assert_eq!(report.n_agree, queries.len());
            assert_eq!(report.first_mismatch, None);
            assert_relative_eq!(report.agreement, 1.0);
        }
    }

    #[test]
    fn test_kd_tree_partition_invariant_distinct_values() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let points: Vec<Coords<f64>> = (0..300)
                .map(|_| {
                    Coords(vec![
                        rng.random::<f64>(),
                        rng.random::<f64>(),
                        rng.random::<f64>(),
                    ])
                })
                .collect();
            let index = KdTreeIndex::new(points, projection_axes(3));
            assert!(index.check_partition().is_empty());
            assert_eq!(index.in_order().len(), 300);
            // balanced for distinct values
            assert!(index.depth() <= 9);
        }
    }

    #[test]
    fn test_kd_tree_duplicate_points_all_stored() {
        let mut index = tree_1d(vec![3, 3, 3, 3]);
        assert_eq!(index.in_order().len(), 4);
        assert_eq!(index.depth(), 4);
        assert_eq!(*index.nearest_neighbour(&100), 3);
    }

    #[test]
    fn test_kd_tree_cache_behaviour() {
        let mut index = tree_1d(vec![0, 10, 20, 30]);

        let first = *index.nearest_neighbour(&12);
        let again = *index.nearest_neighbour(&12);
        assert_eq!(first, again);
        assert_eq!(index.selected().len(), 1);
        assert_eq!(index.cache_hits(), 1);

        index.nearest_neighbour(&13);
        assert_eq!(index.selected().len(), 1);
        index.nearest_neighbour(&29);
        assert_eq!(index.selected().len(), 2);

        let history: Vec<i64> = index.history().into_iter().copied().collect();
        assert_eq!(history, vec![10, 10, 10, 30]);
        assert_eq!(index.n_queries(), 4);
    }

    #[test]
    fn test_kd_tree_search_is_uncached() {
        let index = tree_1d(vec![0, 10, 20]);
        assert_eq!(index.search(&11), Some(1));
        assert_eq!(index.n_queries(), 0);
        assert!(index.selected().is_empty());
    }

    #[test]
    fn test_kd_tree_empty_search_is_none() {
        let index = tree_1d(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.search(&1), None);
        assert_eq!(index.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "empty index")]
    fn test_kd_tree_empty_query_panics() {
        let mut index = tree_1d(Vec::new());
        index.nearest_neighbour(&1);
    }

    #[test]
    fn test_kd_tree_distance() {
        let index = KdTreeIndex::new(vec![Coords(vec![0.0_f32, 0.0])], projection_axes(2));
        let d = index.distance(&Coords(vec![0.0, 0.0]), &Coords(vec![3.0, 4.0]));
        assert_relative_eq!(d, 5.0);
    }

    #[test]
    fn test_kd_tree_memory_usage() {
        let index = tree_1d((0..64).collect());
        assert!(index.memory_usage_bytes() >= 64 * std::mem::size_of::<i64>());
    }
}
