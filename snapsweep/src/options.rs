use serde::{Deserialize, Serialize};

use crate::{num::Grid, Error};

/// The rule for deciding, given a winding number, whether a point is inside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillRule {
    /// A point is inside if its winding number is odd.
    #[default]
    EvenOdd,
    /// A point is inside if its winding number is non-zero.
    NonZero,
    /// A point is inside if its winding number is positive.
    Positive,
    /// A point is inside if its winding number is negative.
    Negative,
}

/// Binary operations between sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    /// A point is in the result if it is in both the subject and the clip.
    Intersection,
    /// A point is in the result if it is in the subject, the clip, or both.
    Union,
    /// A point is in the result if it is in the subject but not the clip.
    Difference,
    /// A point is in the result if it is in exactly one of the subject and the clip.
    Xor,
}

/// Which operand of a boolean operation a ring belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolygonKind {
    /// The first operand.
    Subject,
    /// The second operand.
    Clip,
}

/// Configuration for a [`Clipper`](crate::Clipper).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipOptions {
    /// Emit solid rings clockwise (in a y-up frame) instead of counter-clockwise.
    pub reverse_output: bool,
    /// The number of snapping grid cells per unit of distance.
    ///
    /// Every input vertex and every intersection is rounded to a multiple of
    /// `1 / scale`. Powers of two make that rounding exact for values that
    /// are already on the grid.
    pub scale: f64,
}

impl ClipOptions {
    /// The default grid scale, `2^20`.
    pub const DEFAULT_SCALE: f64 = 1048576.0;

    // The number of bits of precision kept across the input extent by
    // `for_magnitude`.
    const MAGNITUDE_BITS: f64 = 40.0;

    /// Sets [`ClipOptions::reverse_output`].
    pub fn with_reverse_output(mut self, reverse_output: bool) -> Self {
        self.reverse_output = reverse_output;
        self
    }

    /// Sets [`ClipOptions::scale`].
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Options with a power-of-two grid scale suited to coordinates of at
    /// most `max_abs` in absolute value.
    ///
    /// Very large geometries get a coarser grid and very small ones a finer
    /// grid, so that snapped coordinates keep a fixed number of bits.
    pub fn for_magnitude(max_abs: f64) -> Self {
        let mut ret = ClipOptions::default();
        if max_abs.is_finite() && max_abs > 0.0 {
            let exp = (Self::MAGNITUDE_BITS - max_abs.log2()).floor().clamp(-60.0, 60.0);
            ret.scale = 2.0f64.powi(exp as i32);
        }
        ret
    }

    /// The snapping grid described by these options.
    pub fn grid(&self) -> Result<Grid, Error> {
        Grid::new(self.scale)
    }
}

impl Default for ClipOptions {
    fn default() -> Self {
        ClipOptions {
            reverse_output: false,
            scale: Self::DEFAULT_SCALE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_scale() {
        assert_eq!(ClipOptions::for_magnitude(1e6).scale, ClipOptions::DEFAULT_SCALE);
        assert_eq!(ClipOptions::for_magnitude(1.0).scale, 2.0f64.powi(40));
        assert_eq!(ClipOptions::for_magnitude(0.0), ClipOptions::default());
        assert_eq!(
            ClipOptions::for_magnitude(f64::INFINITY),
            ClipOptions::default()
        );
    }

    #[test]
    fn invalid_grid() {
        let opts = ClipOptions::default().with_scale(-1.0);
        assert_eq!(opts.grid(), Err(Error::InvalidScale(-1.0)));
        assert!(ClipOptions::default().grid().is_ok());
    }

    #[test]
    fn defaults() {
        insta::assert_debug_snapshot!(ClipOptions::default(), @r"
        ClipOptions {
            reverse_output: false,
            scale: 1048576.0,
        }
        ");
    }
}
