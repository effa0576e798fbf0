//! Winding numbers and the fill rules that interpret them.

use crate::{
    active_bounds::ActiveBounds,
    bound::Bound,
    BooleanOp, Error, FillRule, PolygonKind,
};

/// The parameters of one boolean operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rules {
    pub op: BooleanOp,
    pub subject_fill: FillRule,
    pub clip_fill: FillRule,
}

impl Rules {
    pub fn new(op: BooleanOp, subject_fill: FillRule, clip_fill: FillRule) -> Self {
        Rules {
            op,
            subject_fill,
            clip_fill,
        }
    }

    /// The fill rule of a bound's own polygon kind.
    pub fn fill(&self, kind: PolygonKind) -> FillRule {
        match kind {
            PolygonKind::Subject => self.subject_fill,
            PolygonKind::Clip => self.clip_fill,
        }
    }

    /// The fill rule of the other polygon kind.
    pub fn other_fill(&self, kind: PolygonKind) -> FillRule {
        match kind {
            PolygonKind::Subject => self.clip_fill,
            PolygonKind::Clip => self.subject_fill,
        }
    }

    /// The bound's own winding count, as seen by its fill rule.
    pub fn own_count(&self, bound: &Bound) -> i32 {
        match self.fill(bound.poly_type) {
            FillRule::Positive => bound.winding_count,
            FillRule::Negative => -bound.winding_count,
            FillRule::EvenOdd | FillRule::NonZero => bound.winding_count.abs(),
        }
    }

    /// The bound's winding count of the other kind, as seen by that kind's fill rule.
    pub fn other_count(&self, bound: &Bound) -> i32 {
        match self.other_fill(bound.poly_type) {
            FillRule::Positive => bound.winding_count2,
            FillRule::Negative => -bound.winding_count2,
            FillRule::EvenOdd | FillRule::NonZero => bound.winding_count2.abs(),
        }
    }

    /// Does this bound separate a region in the result from one outside it?
    pub fn is_contributing(&self, bound: &Bound) -> bool {
        let wc = bound.winding_count;
        let wc2 = bound.winding_count2;
        match self.fill(bound.poly_type) {
            FillRule::EvenOdd => {}
            FillRule::NonZero if wc.abs() != 1 => return false,
            FillRule::Positive if wc != 1 => return false,
            FillRule::Negative if wc != -1 => return false,
            _ => {}
        }
        let other = self.other_fill(bound.poly_type);
        let inside_other = || match other {
            FillRule::EvenOdd | FillRule::NonZero => wc2 != 0,
            FillRule::Positive => wc2 > 0,
            FillRule::Negative => wc2 < 0,
        };
        let outside_other = || match other {
            FillRule::EvenOdd | FillRule::NonZero => wc2 == 0,
            FillRule::Positive => wc2 <= 0,
            FillRule::Negative => wc2 >= 0,
        };
        match (self.op, bound.poly_type) {
            (BooleanOp::Intersection, _) => inside_other(),
            (BooleanOp::Union, _) => outside_other(),
            (BooleanOp::Difference, PolygonKind::Subject) => outside_other(),
            (BooleanOp::Difference, PolygonKind::Clip) => inside_other(),
            (BooleanOp::Xor, _) => true,
        }
    }

    /// Recomputes both winding counts of the bound at `pos` from the bounds
    /// to its left.
    pub fn set_winding_count(
        &self,
        abl: &ActiveBounds,
        bounds: &mut [Bound],
        pos: usize,
    ) -> Result<(), Error> {
        let idx = abl.get(pos)?;
        let kind = bounds[idx.0].poly_type;
        let delta = bounds[idx.0].winding_delta;

        let same_kind_to_left = (0..pos)
            .rev()
            .find(|&p| abl.slot(p).is_some_and(|b| bounds[b.0].poly_type == kind));

        let (wc, mut wc2, start) = match same_kind_to_left {
            None => (delta, 0, 0),
            Some(p) => {
                let rev = abl.get(p)?;
                let rev = &bounds[rev.0];
                let wc = if self.fill(kind) == FillRule::EvenOdd {
                    delta
                } else if rev.winding_count * rev.winding_delta < 0 {
                    // The bound to the left is heading back out of its region.
                    if rev.winding_count.abs() > 1 {
                        if rev.winding_delta * delta < 0 {
                            rev.winding_count
                        } else {
                            rev.winding_count + delta
                        }
                    } else {
                        delta
                    }
                } else if rev.winding_delta * delta < 0 {
                    rev.winding_count
                } else {
                    rev.winding_count + delta
                };
                (wc, rev.winding_count2, p + 1)
            }
        };

        let alt_even_odd = self.other_fill(kind) == FillRule::EvenOdd;
        for p in start..pos {
            if let Some(b) = abl.slot(p) {
                if alt_even_odd {
                    wc2 = if wc2 == 0 { 1 } else { 0 };
                } else {
                    wc2 += bounds[b.0].winding_delta;
                }
            }
        }

        let bound = &mut bounds[idx.0];
        bound.winding_count = wc;
        bound.winding_count2 = wc2;
        Ok(())
    }
}
