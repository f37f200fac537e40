use num_traits::Float;
use std::hash::{Hash, Hasher};
use std::ops::Index;

//////////
// Axis //
//////////

/// Scalar extraction along one dimension of the coordinate space
///
/// An index is built over an ordered list of axes; the list length is the
/// dimensionality and the order decides which axis splits which tree level.
/// Axes must be total over the points they are applied to.
pub trait Axis<P, T> {
    /// Extract the coordinate of `point` along this axis
    ///
    /// ### Params
    ///
    /// * `point` - The point to project
    ///
    /// ### Returns
    ///
    /// The scalar coordinate
    fn extract(&self, point: &P) -> T;
}

/// Every plain function or closure over a point is an axis
impl<P, T, F> Axis<P, T> for F
where
    F: Fn(&P) -> T,
{
    #[inline(always)]
    fn extract(&self, point: &P) -> T {
        self(point)
    }
}

////////////
// Coords //
////////////

/// A point represented purely by its coordinate tuple
///
/// Equality and hashing work on the values, so coordinate tuples can serve
/// as query keys and as tree points. `-0.0` and `0.0` are treated as the
/// same value; NaN coordinates are not supported.
#[derive(Clone, Debug)]
pub struct Coords<T>(pub Vec<T>);

impl<T: Float> Coords<T> {
    /// Project a point into a coordinate tuple via the given axes
    ///
    /// ### Params
    ///
    /// * `point` - The point to project
    /// * `axes` - The axes defining the coordinate space
    ///
    /// ### Returns
    ///
    /// The coordinate tuple (one value per axis)
    pub fn from_point<P, A>(point: &P, axes: &[A]) -> Self
    where
        A: Axis<P, T>,
    {
        Coords(axes.iter().map(|axis| axis.extract(point)).collect())
    }

    /// Dimensionality of the tuple
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// The raw coordinate values
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> Index<usize> for Coords<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.0[idx]
    }
}

impl<T: Float> PartialEq for Coords<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }
}

impl<T: Float> Eq for Coords<T> {}

impl<T: Float> Hash for Coords<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for &v in &self.0 {
            // fold -0.0 into 0.0 so that Hash agrees with ==
            let v = if v == T::zero() { T::zero() } else { v };
            v.integer_decode().hash(state);
        }
    }
}

impl<T> From<Vec<T>> for Coords<T> {
    fn from(values: Vec<T>) -> Self {
        Coords(values)
    }
}

////////////////
// Projection //
////////////////

/// Axis that projects dimension `self.0` of a coordinate tuple
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Projection(pub usize);

impl<T: Copy> Axis<Coords<T>, T> for Projection {
    #[inline(always)]
    fn extract(&self, point: &Coords<T>) -> T {
        point.0[self.0]
    }
}

/// Generate one projection axis per dimension
///
/// ### Params
///
/// * `dim` - Dimensionality of the coordinate tuples
///
/// ### Returns
///
/// `[Projection(0), ..., Projection(dim - 1)]`
pub fn projection_axes(dim: usize) -> Vec<Projection> {
    (0..dim).map(Projection).collect()
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_closure_axis() {
        let axis = |p: &(i32, i32)| p.1 as f64;
        assert_eq!(axis.extract(&(3, 7)), 7.0);
    }

    #[test]
    fn test_projection_axes() {
        let point = Coords(vec![1.0_f32, 2.0, 3.0]);
        let axes = projection_axes(3);
        let values: Vec<f32> = axes.iter().map(|a| a.extract(&point)).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_coords_from_point() {
        let axes: [fn(&[u8; 3]) -> f64; 2] = [|p| p[2] as f64, |p| p[0] as f64];
        let coords = Coords::from_point(&[10_u8, 20, 30], &axes);
        assert_eq!(coords.as_slice(), &[30.0, 10.0]);
        assert_eq!(coords.dim(), 2);
    }

    #[test]
    fn test_coords_hash_eq_by_value() {
        let mut set = FxHashSet::default();
        set.insert(Coords(vec![0.0_f64, 1.5]));
        set.insert(Coords(vec![-0.0_f64, 1.5]));
        set.insert(Coords(vec![0.0_f64, 1.5]));
        set.insert(Coords(vec![0.0_f64, 2.5]));
        assert_eq!(set.len(), 2);
    }
}
