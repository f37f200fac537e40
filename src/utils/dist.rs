use num_traits::Float;

use crate::utils::axis::Axis;

////////////////////
// Axis distances //
////////////////////

/// Squared Euclidean distance between two points over the given axes
///
/// ### Params
///
/// * `axes` - The axes that define the coordinate space
/// * `a` - Point a
/// * `b` - Point b
///
/// ### Returns
///
/// The squared Euclidean distance between the two points
#[inline(always)]
pub fn squared_euclidean_distance<P, T, A>(axes: &[A], a: &P, b: &P) -> T
where
    T: Float,
    A: Axis<P, T>,
{
    axes.iter()
        .map(|axis| {
            let diff = axis.extract(a) - axis.extract(b);
            diff * diff
        })
        .fold(T::zero(), |acc, x| acc + x)
}

/// Euclidean distance between two points over the given axes
///
/// ### Params
///
/// * `axes` - The axes that define the coordinate space
/// * `a` - Point a
/// * `b` - Point b
///
/// ### Returns
///
/// The Euclidean distance between the two points
#[inline(always)]
pub fn euclidean_distance<P, T, A>(axes: &[A], a: &P, b: &P) -> T
where
    T: Float,
    A: Axis<P, T>,
{
    squared_euclidean_distance(axes, a, b).sqrt()
}

/// Euclidean distance between two plain coordinate slices
///
/// ### Params
///
/// * `a` - Slice a
/// * `b` - Slice b
///
/// ### Returns
///
/// The Euclidean distance
#[inline(always)]
pub fn euclidean_distance_static<T>(a: &[T], b: &[T]) -> T
where
    T: Float,
{
    assert_eq!(a.len(), b.len(), "Slices differ in dimensionality");
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .fold(T::zero(), |acc, x| acc + x)
        .sqrt()
}

///////////
// Tests //
///////////
