//! The numerical policy: "almost equal" comparisons and the snapping grid.
//!
//! All coordinates that reach the sweep are snapped to a grid of spacing
//! `1 / scale`. With the default power-of-two scale, snapping a value that is
//! already on the grid is exact, so snapped points can be compared with `==`.

use serde::{Deserialize, Serialize};

use crate::{geom::Point, Error};

const MAX_ULPS: u64 = 4;
const SIGN_BIT: u64 = 1 << 63;

// Maps the sign-and-magnitude representation of a float onto an unsigned
// scale on which neighbouring floats are neighbouring integers.
fn biased(x: f64) -> u64 {
    let bits = x.to_bits();
    if bits & SIGN_BIT != 0 {
        (!bits).wrapping_add(1)
    } else {
        bits | SIGN_BIT
    }
}

/// Are `x` and `y` within a few ULPs of one another?
///
/// NaN is never equal to anything.
pub fn values_are_equal(x: f64, y: f64) -> bool {
    if x.is_nan() || y.is_nan() {
        return false;
    }
    biased(x).abs_diff(biased(y)) <= MAX_ULPS
}

/// Is `x` less than `y` by more than the almost-equal tolerance?
pub fn less_than(x: f64, y: f64) -> bool {
    !values_are_equal(x, y) && x < y
}

/// Is `x` greater than `y` by more than the almost-equal tolerance?
pub fn greater_than(x: f64, y: f64) -> bool {
    !values_are_equal(x, y) && x > y
}

/// The grid that every vertex and intersection point is snapped to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    scale: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Grid {
            scale: crate::ClipOptions::DEFAULT_SCALE,
        }
    }
}

impl Grid {
    /// A grid with spacing `1 / scale`.
    pub fn new(scale: f64) -> Result<Self, Error> {
        if scale.is_finite() && scale > 0.0 {
            Ok(Grid { scale })
        } else {
            Err(Error::InvalidScale(scale))
        }
    }

    /// The number of grid cells per unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Half the grid spacing.
    pub fn half_pixel(&self) -> f64 {
        0.5 / self.scale
    }

    /// Rounds to the nearest grid value, halfway cases away from zero.
    pub fn round(&self, v: f64) -> f64 {
        // Adding zero turns a negative zero into a positive one, so that
        // equal grid points also have equal bit patterns.
        (v * self.scale).round() / self.scale + 0.0
    }

    /// Rounds to the nearest grid value, halfway cases towards negative infinity.
    pub fn round_towards_min(&self, v: f64) -> f64 {
        (v * self.scale - 0.5).ceil() / self.scale + 0.0
    }

    /// Rounds to the nearest grid value, halfway cases towards positive infinity.
    pub fn round_towards_max(&self, v: f64) -> f64 {
        (v * self.scale + 0.5).floor() / self.scale + 0.0
    }

    /// Snaps both coordinates of a point.
    pub fn round_point(&self, p: Point) -> Point {
        Point::new(self.round(p.x), self.round(p.y))
    }
}

/// A stable insertion sort driven by a "less than" predicate.
///
/// Unlike `slice::sort_by`, this tolerates predicates that are only
/// approximately transitive (like ones built on [`values_are_equal`]).
pub(crate) fn insertion_sort_by<T>(v: &mut [T], mut less: impl FnMut(&T, &T) -> bool) {
    for i in 1..v.len() {
        let mut j = i;
        while j > 0 && less(&v[j], &v[j - 1]) {
            v.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    // Kind of like Arbitrary, but
    // - it's a local trait, so we can impl it for whatever we want, and
    // - it only returns "reasonable" values.
    pub trait Reasonable {
        type Strategy: Strategy<Value = Self>;
        fn reasonable() -> Self::Strategy;
    }

    impl<S: Reasonable, T: Reasonable> Reasonable for (S, T) {
        type Strategy = (S::Strategy, T::Strategy);

        fn reasonable() -> Self::Strategy {
            (S::reasonable(), T::reasonable())
        }
    }

    impl Reasonable for f64 {
        type Strategy = BoxedStrategy<f64>;

        fn reasonable() -> Self::Strategy {
            (-1e6..1e6).boxed()
        }
    }

    fn next_up(x: f64) -> f64 {
        f64::from_bits(x.to_bits() + 1)
    }

    #[test]
    fn almost_equal_within_ulps() {
        let x = 1.5;
        let mut y = x;
        for _ in 0..4 {
            y = next_up(y);
        }
        assert!(values_are_equal(x, y));
        assert!(!values_are_equal(x, next_up(y)));
        assert!(values_are_equal(0.0, -0.0));
        assert!(!values_are_equal(f64::NAN, f64::NAN));
        assert!(!less_than(x, y));
        assert!(less_than(x, next_up(y)));
        assert!(greater_than(next_up(y), x));
    }

    #[test]
    fn grid_rounding() {
        let grid = Grid::new(2.0).unwrap();
        assert_eq!(grid.round(0.25), 0.5);
        assert_eq!(grid.round(-0.25), -0.5);
        assert_eq!(grid.round_towards_min(0.25), 0.0);
        assert_eq!(grid.round_towards_max(0.25), 0.5);
        assert_eq!(grid.round_towards_min(0.3), 0.5);
        assert_eq!(grid.half_pixel(), 0.25);
        assert!(grid.round(-0.1).is_sign_positive());
    }

    #[test]
    fn invalid_scale() {
        assert_eq!(Grid::new(0.0), Err(Error::InvalidScale(0.0)));
        assert!(Grid::new(f64::INFINITY).is_err());
        assert!(Grid::new(f64::NAN).is_err());
    }

    #[test]
    fn stable_insertion_sort() {
        let mut v = vec![(3, 'a'), (1, 'b'), (3, 'c'), (2, 'd'), (1, 'e')];
        insertion_sort_by(&mut v, |a, b| a.0 < b.0);
        assert_eq!(v, vec![(1, 'b'), (1, 'e'), (2, 'd'), (3, 'a'), (3, 'c')]);
    }

    proptest! {
    #[test]
    fn rounding_is_idempotent(x in f64::reasonable()) {
        let grid = Grid::default();
        let r = grid.round(x);
        prop_assert_eq!(grid.round(r), r);
        prop_assert!((r - x).abs() <= grid.half_pixel());
        prop_assert!(grid.round_towards_min(x) <= grid.round_towards_max(x));
    }
    }
}
