//! Finding and applying the crossings between active bounds.
//!
//! Each scanbeam is handled in two phases. Detection works on a copy of the
//! active bound list and produces a batch of [`IntersectNode`]s. Application
//! then walks the batch in order, crossing one adjacent pair at a time.

use tracing::trace;

use crate::{
    active_bounds::ActiveBounds,
    bound::{Bound, BoundIdx},
    geom::{slopes_equal, Point},
    num::{insertion_sort_by, values_are_equal},
    sweep::Sweep,
    BooleanOp, Error, PolygonKind,
};

/// Two bounds that cross between the previous scanline and the current one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectNode {
    /// The bound on the left before the crossing.
    pub bound1: BoundIdx,
    pub bound2: BoundIdx,
    pub point: Point,
}

/// Bubble-sorts a copy of the active bounds by their current x, recording
/// every swap as an intersection. Returns the intersections and the new order.
///
/// Bounds whose edges are parallel are never swapped.
pub(crate) fn detect_intersections(
    abl: &ActiveBounds,
    bounds: &[Bound],
) -> Result<(Vec<IntersectNode>, Vec<BoundIdx>), Error> {
    let mut order = abl.live();
    let mut nodes = Vec::new();
    if order.len() < 2 {
        return Ok((nodes, order));
    }
    loop {
        let mut modified = false;
        for i in 0..order.len() - 1 {
            let b1 = &bounds[order[i].0];
            let b2 = &bounds[order[i + 1].0];
            let e1 = b1.current_edge()?;
            let e2 = b2.current_edge()?;
            if b1.current_x > b2.current_x && !slopes_equal(e1, e2) {
                nodes.push(IntersectNode {
                    bound1: order[i],
                    bound2: order[i + 1],
                    point: e1.intersection(e2),
                });
                order.swap(i, i + 1);
                modified = true;
            }
        }
        if !modified {
            break;
        }
    }
    Ok((nodes, order))
}

/// Orders intersections from the bottom of the scanbeam upwards; among
/// intersections at the same height, those between bounds with smaller
/// opposite-kind winding counts come first.
pub(crate) fn sort_intersections(nodes: &mut [IntersectNode], bounds: &[Bound]) {
    let wc2 = |n: &IntersectNode| {
        bounds[n.bound1.0].winding_count2 + bounds[n.bound2.0].winding_count2
    };
    insertion_sort_by(nodes, |a, b| {
        if !values_are_equal(a.point.y, b.point.y) {
            a.point.y > b.point.y
        } else {
            wc2(a) < wc2(b)
        }
    });
}

impl Sweep {
    pub(crate) fn update_current_x(&mut self, y: f64) -> Result<(), Error> {
        for b in self.abl.live() {
            let bound = &mut self.bounds[b.0];
            bound.current_x = bound.current_edge()?.current_x(y);
        }
        Ok(())
    }

    /// Finds the crossings in the scanbeam ending at `top_y` and applies them.
    pub(crate) fn process_intersections(&mut self, top_y: f64) -> Result<(), Error> {
        if self.abl.len() < 2 {
            return Ok(());
        }
        self.update_current_x(top_y)?;
        let (mut nodes, _) = detect_intersections(&self.abl, &self.bounds)?;
        if nodes.is_empty() {
            return Ok(());
        }
        sort_intersections(&mut nodes, &self.bounds);
        self.process_intersect_list(&mut nodes)
    }

    fn bounds_adjacent(&self, node: &IntersectNode) -> bool {
        self.abl
            .position_of(node.bound1)
            .is_some_and(|pos| self.abl.slot(pos + 1) == Some(node.bound2))
    }

    fn process_intersect_list(&mut self, nodes: &mut [IntersectNode]) -> Result<(), Error> {
        for i in 0..nodes.len() {
            if !self.bounds_adjacent(&nodes[i]) {
                let j = (i + 1..nodes.len())
                    .find(|&j| self.bounds_adjacent(&nodes[j]))
                    .ok_or(Error::IntersectionOrder)?;
                nodes.swap(i, j);
            }
            let node = nodes[i];
            let pos = self
                .abl
                .position_of(node.bound1)
                .ok_or(Error::IntersectionOrder)?;
            let pt = self.grid.round_point(node.point);
            self.cross_bounds(pos, pos + 1, pt)?;
        }
        Ok(())
    }

    /// Crosses the bound at `left_pos` over the bound at `right_pos` at `pt`.
    ///
    /// The two bounds swap places in the active bound list, their winding
    /// counts are recomputed, and their rings are updated according to the
    /// fill rules.
    pub(crate) fn cross_bounds(
        &mut self,
        left_pos: usize,
        right_pos: usize,
        pt: Point,
    ) -> Result<(), Error> {
        let b1 = self.abl.get(left_pos)?;
        let b2 = self.abl.get(right_pos)?;
        trace!(?b1, ?b2, ?pt, "crossing bounds");
        let b1_contributing = self.bounds[b1.0].ring.is_some();
        let b2_contributing = self.bounds[b2.0].ring.is_some();

        self.abl.swap(left_pos, right_pos);
        self.rules
            .set_winding_count(&self.abl, &mut self.bounds, left_pos)?;
        self.rules
            .set_winding_count(&self.abl, &mut self.bounds, right_pos)?;

        let rules = self.rules;
        let bound1 = &self.bounds[b1.0];
        let bound2 = &self.bounds[b2.0];
        let b1_wc = rules.own_count(bound1);
        let b2_wc = rules.own_count(bound2);
        let zero_or_one = |wc: i32| wc == 0 || wc == 1;
        let same_kind = bound1.poly_type == bound2.poly_type;

        match (b1_contributing, b2_contributing) {
            (true, true) => {
                if !zero_or_one(b1_wc)
                    || !zero_or_one(b2_wc)
                    || (!same_kind && rules.op != BooleanOp::Xor)
                {
                    self.rings
                        .add_local_maximum_point(&mut self.bounds, &self.abl, b1, b2, pt)?;
                } else {
                    self.rings.add_point(&mut self.bounds, &self.abl, b1, pt)?;
                    self.rings.add_point(&mut self.bounds, &self.abl, b2, pt)?;
                    self.swap_sides(b1, b2);
                    self.swap_rings(b1, b2);
                }
            }
            (true, false) => {
                if zero_or_one(b2_wc) {
                    self.rings.add_point(&mut self.bounds, &self.abl, b1, pt)?;
                    self.bounds[b2.0].last_point = self.bounds[b1.0].last_point;
                    self.swap_sides(b1, b2);
                    self.swap_rings(b1, b2);
                }
            }
            (false, true) => {
                if zero_or_one(b1_wc) {
                    self.rings.add_point(&mut self.bounds, &self.abl, b2, pt)?;
                    self.bounds[b1.0].last_point = self.bounds[b2.0].last_point;
                    self.swap_sides(b1, b2);
                    self.swap_rings(b1, b2);
                }
            }
            (false, false) => {
                if zero_or_one(b1_wc) && zero_or_one(b2_wc) {
                    let b1_wc2 = rules.other_count(bound1);
                    let b2_wc2 = rules.other_count(bound2);
                    let b1_kind = bound1.poly_type;
                    if !same_kind {
                        self.rings
                            .add_local_minimum_point(&mut self.bounds, &self.abl, b1, b2, pt)?;
                    } else if b1_wc == 1 && b2_wc == 1 {
                        let starts_ring = match rules.op {
                            BooleanOp::Intersection => b1_wc2 > 0 && b2_wc2 > 0,
                            BooleanOp::Union => b1_wc2 <= 0 && b2_wc2 <= 0,
                            BooleanOp::Difference => match b1_kind {
                                PolygonKind::Clip => b1_wc2 > 0 && b2_wc2 > 0,
                                PolygonKind::Subject => b1_wc2 <= 0 && b2_wc2 <= 0,
                            },
                            BooleanOp::Xor => true,
                        };
                        if starts_ring {
                            self.rings.add_local_minimum_point(
                                &mut self.bounds,
                                &self.abl,
                                b1,
                                b2,
                                pt,
                            )?;
                        }
                    } else {
                        self.swap_sides(b1, b2);
                    }
                }
            }
        }
        Ok(())
    }

    fn swap_sides(&mut self, b1: BoundIdx, b2: BoundIdx) {
        let side = self.bounds[b1.0].side;
        self.bounds[b1.0].side = self.bounds[b2.0].side;
        self.bounds[b2.0].side = side;
    }

    fn swap_rings(&mut self, b1: BoundIdx, b2: BoundIdx) {
        let ring = self.bounds[b1.0].ring;
        self.bounds[b1.0].ring = self.bounds[b2.0].ring;
        self.bounds[b2.0].ring = ring;
    }
}
