use num_traits::Float;

///////////////////
// Float ordering //
///////////////////

/// Wrapper for floats that implements Ord
///
/// Used as sort key when partitioning points along an axis and whenever
/// distances need a total order.
#[derive(Clone, Copy, Debug)]
pub struct OrderedFloat<T>(pub T);

/// Partial equality trait
impl<T: Float> PartialEq for OrderedFloat<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Equality trait
impl<T: Float> Eq for OrderedFloat<T> {}

/// Partial ordering trait
impl<T: Float> PartialOrd for OrderedFloat<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Comparing one to the other
impl<T: Float> Ord for OrderedFloat<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_float_sorting() {
        let mut values = vec![
            OrderedFloat(3.0_f64),
            OrderedFloat(-1.5),
            OrderedFloat(0.0),
            OrderedFloat(2.25),
        ];
        values.sort();
        let raw: Vec<f64> = values.into_iter().map(|v| v.0).collect();
        assert_eq!(raw, vec![-1.5, 0.0, 2.25, 3.0]);
    }

    #[test]
    fn test_ordered_float_nan_is_equal() {
        let a = OrderedFloat(f32::NAN);
        let b = OrderedFloat(1.0_f32);
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
    }
}
