//! The sweep-line driver.
//!
//! The sweep line moves from the largest y to the smallest, stopping at every
//! height in the [`Scanbeam`]. At each stop it applies the crossings found
//! in the scanbeam just finished, handles the edges that end there, and starts
//! the bounds of the local minima that begin there.

use tracing::{debug, instrument};

use crate::{
    active_bounds::ActiveBounds,
    bound::{Bound, Side},
    local_minimum::{LocalMinimum, LocalMinimumList},
    num::Grid,
    ring::RingManager,
    scanbeam::Scanbeam,
    winding::Rules,
    Error,
};

/// The state of one run of the sweep.
#[derive(Clone, Debug)]
pub(crate) struct Sweep {
    pub bounds: Vec<Bound>,
    /// Sorted in sweep order.
    pub minima: Vec<LocalMinimum>,
    /// The first local minimum that has not been inserted yet.
    pub next_minimum: usize,
    pub abl: ActiveBounds,
    pub scanbeam: Scanbeam,
    /// The scanbeam each pass starts from: one stop per local minimum.
    pub initial_scanbeam: Scanbeam,
    pub rings: RingManager,
    pub rules: Rules,
    pub grid: Grid,
}

impl Sweep {
    pub fn new(list: &LocalMinimumList, rules: Rules, grid: Grid) -> Self {
        Sweep {
            bounds: list.bounds.clone(),
            minima: list.sorted(),
            next_minimum: 0,
            abl: ActiveBounds::default(),
            scanbeam: Scanbeam::default(),
            initial_scanbeam: list.scanbeam(),
            rings: RingManager::new(grid),
            rules,
            grid,
        }
    }

    /// Runs both passes of the sweep and returns the rings it built.
    ///
    /// The rings are not corrected yet: they may touch or intersect themselves.
    #[instrument(skip(self), fields(bounds = self.bounds.len(), minima = self.minima.len()))]
    pub fn run(mut self) -> Result<RingManager, Error> {
        self.build_hot_pixels()?;
        self.execute_vatti()?;
        debug!(rings = self.rings.live_rings().len(), "sweep finished");
        Ok(self.rings)
    }

    fn execute_vatti(&mut self) -> Result<(), Error> {
        self.abl.clear();
        self.next_minimum = 0;
        self.scanbeam = self.initial_scanbeam.clone();
        while let Some(y) = self.scanbeam.pop() {
            self.process_intersections(y)?;
            self.rings.hot_pixels.advance(y);
            self.process_edges_at_top_of_scanbeam(y)?;
            self.insert_local_minima(y)?;
        }
        Ok(())
    }

    fn insert_local_minima(&mut self, y: f64) -> Result<(), Error> {
        while let Some(lm) = self.minima.get(self.next_minimum).copied() {
            if lm.y != y {
                break;
            }
            self.next_minimum += 1;
            self.insert_minimum_pair(lm)?;
        }
        Ok(())
    }

    /// Inserts the minima at `y` that start with a horizontal edge, so that
    /// the horizontal gets processed along with the others at this height.
    fn insert_horizontal_local_minima(&mut self, y: f64) -> Result<(), Error> {
        while let Some(lm) = self.minima.get(self.next_minimum).copied() {
            if lm.y != y || !lm.minimum_has_horizontal {
                break;
            }
            self.next_minimum += 1;
            self.insert_minimum_pair(lm)?;
        }
        Ok(())
    }

    fn insert_minimum_pair(&mut self, lm: LocalMinimum) -> Result<(), Error> {
        self.bounds[lm.left.0].reset(Side::Left);
        self.bounds[lm.right.0].reset(Side::Right);
        let pos = self.abl.insert_pair(&self.bounds, lm.left, lm.right)?;
        self.rules
            .set_winding_count(&self.abl, &mut self.bounds, pos)?;
        let (wc, wc2) = {
            let left = &self.bounds[lm.left.0];
            (left.winding_count, left.winding_count2)
        };
        let right = &mut self.bounds[lm.right.0];
        right.winding_count = wc;
        right.winding_count2 = wc2;

        if self.rules.is_contributing(&self.bounds[lm.left.0]) {
            let pt = self.bounds[lm.left.0].current_edge()?.bot;
            self.rings
                .add_local_minimum_point(&mut self.bounds, &self.abl, lm.left, lm.right, pt)?;
        }

        for b in [lm.left, lm.right] {
            let edge = self.bounds[b.0].current_edge()?;
            if !edge.is_horizontal() {
                self.scanbeam.push(edge.top.y);
            }
        }
        Ok(())
    }

    fn process_edges_at_top_of_scanbeam(&mut self, y: f64) -> Result<(), Error> {
        let mut pos = 0;
        while pos < self.abl.len() {
            let Some(b) = self.abl.slot(pos) else {
                pos += 1;
                continue;
            };
            let bound = &self.bounds[b.0];
            let edge = *bound.current_edge()?;

            if bound.is_maxima(y)? && !edge.is_horizontal() {
                let pair_pos = bound.maximum_bound.and_then(|m| self.abl.position_of(m));
                let pair_ready = match pair_pos.and_then(|p| self.abl.slot(p)) {
                    Some(pair) => {
                        let pair = &self.bounds[pair.0];
                        !pair.current_edge()?.is_horizontal() && pair.is_maxima(y)?
                    }
                    // A missing pair can only be a bound that never contributed.
                    None => true,
                };
                if pair_ready {
                    pos = self.do_maxima(pos, pair_pos)?;
                    continue;
                }
            }

            if bound.is_intermediate(y)? && bound.next_edge_is_horizontal() {
                let has_ring = bound.ring.is_some();
                if has_ring {
                    self.rings
                        .insert_hot_pixels_in_path(&mut self.bounds[b.0], edge.top, false)?;
                }
                self.bounds[b.0].advance(&mut self.scanbeam);
                if has_ring {
                    let bot = self.bounds[b.0].current_edge()?.bot;
                    self.rings
                        .add_point_to_ring(&mut self.bounds[b.0], bot)?;
                }
            } else {
                self.bounds[b.0].current_x = edge.current_x(y);
            }
            pos += 1;
        }
        self.abl.compact();

        self.insert_horizontal_local_minima(y)?;
        self.process_horizontals(y)?;

        for b in self.abl.live() {
            if self.bounds[b.0].is_intermediate(y)? {
                if self.bounds[b.0].ring.is_some() {
                    let top = self.bounds[b.0].current_edge()?.top;
                    self.rings
                        .add_point_to_ring(&mut self.bounds[b.0], top)?;
                }
                self.bounds[b.0].advance(&mut self.scanbeam);
            }
        }
        Ok(())
    }

    /// Ends the two bounds meeting at a local maximum, crossing every bound
    /// that lies between them. Returns the position at which to continue.
    fn do_maxima(&mut self, pos: usize, pair_pos: Option<usize>) -> Result<usize, Error> {
        let b = self.abl.get(pos)?;
        let Some(pair_pos) = pair_pos else {
            // The pair already left the active list, so the ring just ends here.
            if self.bounds[b.0].ring.is_some() {
                let top = self.bounds[b.0].current_edge()?.top;
                self.rings.add_point_to_ring(&mut self.bounds[b.0], top)?;
            }
            self.abl.retire(pos);
            return Ok(pos + 1);
        };
        let pair = self.abl.get(pair_pos)?;
        let top = self.bounds[b.0].current_edge()?.top;

        let mut cur = pos;
        let mut skipped = false;
        for next in pos + 1..pair_pos {
            if self.abl.slot(next).is_some() {
                self.cross_bounds(cur, next, top)?;
                cur = next;
                skipped = true;
            }
        }

        match (self.bounds[b.0].ring, self.bounds[pair.0].ring) {
            (Some(_), Some(_)) => {
                self.rings
                    .add_local_maximum_point(&mut self.bounds, &self.abl, b, pair, top)?;
            }
            (None, None) => {}
            _ => return Err(Error::UnpairedMaximum),
        }
        self.abl.retire(pair_pos);
        self.abl.retire(cur);
        Ok(if skipped { pos } else { pos + 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geom::tests::p, geom::Point, BooleanOp, FillRule, PolygonKind};

    fn run(rings: &[(Vec<Point>, PolygonKind)], op: BooleanOp) -> RingManager {
        let grid = Grid::default();
        let mut list = LocalMinimumList::default();
        for (pts, kind) in rings {
            list.add_ring(pts, *kind, &grid).unwrap();
        }
        let rules = Rules::new(op, FillRule::NonZero, FillRule::NonZero);
        Sweep::new(&list, rules, grid).run().unwrap()
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)]
    }

    fn total_area(rings: &mut RingManager) -> f64 {
        rings
            .live_rings()
            .into_iter()
            .map(|r| rings.area(r))
            .sum()
    }

    #[test]
    fn single_square() {
        let mut rings = run(&[(square(0.0, 0.0, 2.0, 2.0), PolygonKind::Subject)], BooleanOp::Union);
        let live = rings.live_rings();
        assert_eq!(live.len(), 1);
        assert_eq!(rings.area(live[0]).abs(), 4.0);
        let mut pts = rings.ring_points(live[0]);
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        assert_eq!(pts, vec![p(0.0, 0.0), p(0.0, 2.0), p(2.0, 0.0), p(2.0, 2.0)]);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let mut rings = run(
            &[
                (square(0.0, 0.0, 1.0, 1.0), PolygonKind::Subject),
                (square(5.0, 5.0, 6.0, 6.0), PolygonKind::Clip),
            ],
            BooleanOp::Intersection,
        );
        assert_eq!(total_area(&mut rings), 0.0);
    }

    #[test]
    fn overlapping_intersection_area() {
        let mut rings = run(
            &[
                (square(0.0, 0.0, 4.0, 4.0), PolygonKind::Subject),
                (square(2.0, 2.0, 6.0, 6.0), PolygonKind::Clip),
            ],
            BooleanOp::Intersection,
        );
        assert_eq!(total_area(&mut rings).abs(), 4.0);
    }

    #[test]
    fn maximum_without_its_pair_ends_the_ring() {
        let grid = Grid::default();
        let mut list = LocalMinimumList::default();
        let diamond = [p(1.0, 0.0), p(2.0, 1.0), p(1.0, 2.0), p(0.0, 1.0)];
        list.add_ring(&diamond, PolygonKind::Subject, &grid).unwrap();
        let rules = Rules::new(BooleanOp::Union, FillRule::NonZero, FillRule::NonZero);
        let mut sweep = Sweep::new(&list, rules, grid);

        let b = sweep.minima[0].left;
        let edge = *sweep.bounds[b.0].current_edge().unwrap();
        sweep.abl.set_order(vec![b]);
        sweep
            .rings
            .add_first_point(&mut sweep.bounds, &sweep.abl, b, edge.bot)
            .unwrap();

        assert_eq!(sweep.do_maxima(0, None).unwrap(), 1);
        assert_eq!(sweep.abl.slot(0), None);
        let ring = sweep.bounds[b.0].ring.unwrap();
        let pts = sweep.rings.ring_points(ring);
        assert_eq!(pts.len(), 2);
        assert!(pts.contains(&edge.bot));
        assert!(pts.contains(&edge.top));
    }
}
