use num_traits::{Float, FromPrimitive, ToPrimitive};
use std::fmt::Debug;
use std::iter::Sum;

/// Trait for the floating-point scalars the axes of an index produce. Has all
/// of the common floating-point operations and traits.
pub trait IndexFloat: Float + FromPrimitive + ToPrimitive + Send + Sync + Sum + Debug {}

impl<T> IndexFloat for T where T: Float + FromPrimitive + ToPrimitive + Send + Sync + Sum + Debug {}
