//! Hot pixels: grid points that every output path passing close by must visit.
//!
//! Before the main sweep, a pre-pass collects every vertex and every snapped
//! intersection. While building rings, each time a bound moves along its edge
//! the hot pixels that the edge passes within half a pixel of are inserted
//! into the ring. This is what keeps snapped output free of new crossings.

use std::ops::Range;

use tracing::debug;

use crate::{
    bound::{Bound, BoundIdx, Side},
    geom::Point,
    intersect::detect_intersections,
    ring::RingManager,
    sweep::Sweep,
    Error,
};

/// Sorted hot pixels: rows from the largest y down, each row by increasing x.
#[derive(Clone, Debug, Default)]
pub struct HotPixels {
    pixels: Vec<Point>,
    cursor: usize,
}

impl HotPixels {
    pub fn push(&mut self, p: Point) {
        self.pixels.push(p);
    }

    /// Sorts and deduplicates the collected pixels, and rewinds the cursor.
    pub fn finish(&mut self) {
        self.pixels
            .sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));
        self.pixels.dedup();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[Point] {
        &self.pixels
    }

    pub fn get(&self, idx: usize) -> Result<Point, Error> {
        self.pixels
            .get(idx)
            .copied()
            .ok_or_else(|| Error::out_of_range("hot pixel", idx, self.pixels.len()))
    }

    /// The index of the first pixel in the current scanline's row (or later).
    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor past all rows strictly above `y`.
    pub fn advance(&mut self, y: f64) {
        while self.cursor < self.pixels.len() && self.pixels[self.cursor].y > y {
            self.cursor += 1;
        }
    }

    /// The pixels whose y is in `[bottom, top]`.
    pub fn rows_between(&self, top: f64, bottom: f64) -> Range<usize> {
        let start = self.pixels.partition_point(|p| p.y > top);
        let end = self.pixels.partition_point(|p| p.y >= bottom);
        start..end.max(start)
    }

    /// The pixels in the row at `y`.
    ///
    /// Once the cursor has been advanced to `y`, the row starts at the cursor.
    pub fn row(&self, y: f64) -> Range<usize> {
        match self.pixels.get(self.cursor) {
            Some(p) if p.y == y => {
                let len = self.pixels[self.cursor..].partition_point(|p| p.y >= y);
                self.cursor..self.cursor + len
            }
            _ => self.rows_between(y, y),
        }
    }
}

impl RingManager {
    /// Adds to the bound's ring all the hot pixels its current edge passes
    /// between the bound's last point and `end`.
    ///
    /// `end` itself is only added if `add_end` is set.
    pub fn insert_hot_pixels_in_path(
        &mut self,
        bound: &mut Bound,
        end: Point,
        add_end: bool,
    ) -> Result<(), Error> {
        if end == bound.last_point {
            return Ok(());
        }
        let start = bound.last_point;
        if bound.ring.is_some() {
            let edge = *bound.current_edge()?;
            let grid = self.grid;
            let rows = self.hot_pixels.rows_between(start.y, end.y);
            let mut row_start = rows.start;
            while row_start < rows.end {
                let y = self.hot_pixels.get(row_start)?.y;
                let mut row_end = row_start;
                while row_end < rows.end && self.hot_pixels.get(row_end)?.y == y {
                    row_end += 1;
                }
                let add_end_here = y != end.y || add_end;
                let edge_min = edge.min_x(y, &grid);
                let edge_max = edge.max_x(y, &grid);
                if start.x <= end.x {
                    let lo = edge_min.max(start.x);
                    let hi = edge_max.min(end.x);
                    for idx in row_start..row_end {
                        let p = self.hot_pixels.get(idx)?;
                        if p.x < lo || p.x > hi || (!add_end_here && p.x == end.x) {
                            continue;
                        }
                        self.push_point(bound, p)?;
                    }
                } else {
                    let lo = edge_min.max(end.x);
                    let hi = edge_max.min(start.x);
                    for idx in (row_start..row_end).rev() {
                        let p = self.hot_pixels.get(idx)?;
                        if p.x < lo || p.x > hi || (!add_end_here && p.x == end.x) {
                            continue;
                        }
                        self.push_point(bound, p)?;
                    }
                }
                row_start = row_end;
            }
        }
        bound.last_point = end;
        Ok(())
    }
}

impl Sweep {
    /// Runs the sweep once without building rings, collecting hot pixels.
    pub(crate) fn build_hot_pixels(&mut self) -> Result<(), Error> {
        self.abl.clear();
        self.next_minimum = 0;
        self.scanbeam = self.initial_scanbeam.clone();
        while let Some(y) = self.scanbeam.pop() {
            self.process_hot_pixel_intersections(y)?;
            self.insert_local_minima_hot_pixels(y)?;
            self.process_hot_pixel_edges_at_top_of_scanbeam(y)?;
        }
        self.rings.hot_pixels.finish();
        debug!(count = self.rings.hot_pixels.len(), "built hot pixels");
        Ok(())
    }

    fn process_hot_pixel_intersections(&mut self, y: f64) -> Result<(), Error> {
        if self.abl.len() < 2 {
            return Ok(());
        }
        self.update_current_x(y)?;
        let (nodes, order) = detect_intersections(&self.abl, &self.bounds)?;
        for node in nodes {
            self.rings.hot_pixels.push(self.grid.round_point(node.point));
        }
        self.abl.set_order(order);
        Ok(())
    }

    fn insert_local_minima_hot_pixels(&mut self, y: f64) -> Result<(), Error> {
        while let Some(lm) = self.minima.get(self.next_minimum).copied() {
            if lm.y != y {
                break;
            }
            self.next_minimum += 1;
            self.bounds[lm.left.0].reset(Side::Left);
            self.bounds[lm.right.0].reset(Side::Right);
            self.rings
                .hot_pixels
                .push(self.bounds[lm.left.0].current_edge()?.bot);
            self.abl.insert_pair(&self.bounds, lm.left, lm.right)?;
            for b in [lm.left, lm.right] {
                let edge = self.bounds[b.0].current_edge()?;
                if !edge.is_horizontal() {
                    self.scanbeam.push(edge.top.y);
                }
            }
        }
        Ok(())
    }

    fn process_hot_pixel_edges_at_top_of_scanbeam(&mut self, y: f64) -> Result<(), Error> {
        let mut pos = 0;
        while pos < self.abl.len() {
            let Some(b) = self.abl.slot(pos) else {
                pos += 1;
                continue;
            };
            let mut cur = pos;
            let mut shifted_right = false;
            while let Some(edge) = self.bounds[b.0].current_edge().ok().copied() {
                if edge.top.y != y {
                    break;
                }
                self.rings.hot_pixels.push(edge.top);
                if edge.is_horizontal() {
                    if edge.bot.x > edge.top.x {
                        cur = self.hot_pixel_horizontal_right_to_left(cur, edge.top.x, y)?;
                    } else {
                        let (new_pos, moved) =
                            self.hot_pixel_horizontal_left_to_right(cur, edge.top.x, y)?;
                        cur = new_pos;
                        shifted_right |= moved;
                    }
                }
                self.bounds[b.0].advance(&mut self.scanbeam);
            }
            if self.bounds[b.0].is_retired() {
                self.abl.retire(cur);
            }
            if !shifted_right {
                pos += 1;
            }
        }
        self.abl.compact();
        Ok(())
    }

    // Moves a horizontal edge's bound rightwards past the bounds it crosses,
    // recording the crossings. Returns the new position and whether it moved.
    fn hot_pixel_horizontal_left_to_right(
        &mut self,
        mut cur: usize,
        top_x: f64,
        y: f64,
    ) -> Result<(usize, bool), Error> {
        let mut moved = false;
        let mut next = cur + 1;
        while next < self.abl.len() {
            let Some(other) = self.abl.slot(next) else {
                next += 1;
                continue;
            };
            if self.bounds[other.0].current_x >= top_x {
                break;
            }
            self.record_horizontal_crossing(other, y)?;
            self.abl.swap(cur, next);
            cur = next;
            moved = true;
            next += 1;
        }
        Ok((cur, moved))
    }

    fn hot_pixel_horizontal_right_to_left(
        &mut self,
        mut cur: usize,
        top_x: f64,
        y: f64,
    ) -> Result<usize, Error> {
        while cur > 0 {
            let prev = cur - 1;
            if let Some(other) = self.abl.slot(prev) {
                if self.bounds[other.0].current_x <= top_x {
                    break;
                }
                self.record_horizontal_crossing(other, y)?;
            }
            self.abl.swap(prev, cur);
            cur = prev;
        }
        Ok(cur)
    }

    // A horizontal edge crossing a bound in the middle of one of its edges
    // makes a hot pixel there.
    fn record_horizontal_crossing(&mut self, other: BoundIdx, y: f64) -> Result<(), Error> {
        let other = &self.bounds[other.0];
        let edge = other.current_edge()?;
        if edge.top.y != y && edge.bot.y != y {
            let pixel = Point::new(self.grid.round(other.current_x), y);
            self.rings.hot_pixels.push(pixel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geom::{tests::p, Edge},
        num::Grid,
        ring::RingIdx,
        PolygonKind,
    };

    fn pixels(pts: &[Point]) -> HotPixels {
        let mut hp = HotPixels::default();
        for &pt in pts {
            hp.push(pt);
        }
        hp.finish();
        hp
    }

    #[test]
    fn sorted_rows() {
        let hp = pixels(&[
            p(1.0, 0.0),
            p(0.0, 2.0),
            p(3.0, 1.0),
            p(1.0, 1.0),
            p(0.0, 2.0),
        ]);
        assert_eq!(
            hp.as_slice(),
            &[p(0.0, 2.0), p(1.0, 1.0), p(3.0, 1.0), p(1.0, 0.0)]
        );
        assert_eq!(hp.row(1.0), 1..3);
        assert_eq!(hp.row(0.5), 3..3);
        assert_eq!(hp.rows_between(2.0, 1.0), 0..3);
    }

    #[test]
    fn cursor_advances_by_row() {
        let mut hp = pixels(&[p(0.0, 2.0), p(1.0, 1.0), p(3.0, 1.0), p(1.0, 0.0)]);
        hp.advance(2.0);
        assert_eq!(hp.cursor(), 0);
        hp.advance(1.0);
        assert_eq!(hp.cursor(), 1);
        assert_eq!(hp.row(1.0), 1..3);
        hp.advance(-5.0);
        assert_eq!(hp.cursor(), 4);
        assert!(hp.get(4).is_err());
    }

    #[test]
    fn path_picks_up_nearby_pixels() {
        let grid = Grid::new(1.0).unwrap();
        let mut rings = RingManager::new(grid);
        for pt in [p(0.0, 4.0), p(1.0, 3.0), p(3.0, 3.0), p(2.0, 2.0), p(4.0, 0.0)] {
            rings.hot_pixels.push(pt);
        }
        rings.hot_pixels.finish();

        let mut bound = Bound::new(vec![Edge::new(p(0.0, 4.0), p(4.0, 0.0))], PolygonKind::Subject);
        bound.side = Side::Right;
        let ring = rings.create_ring();
        bound.ring = Some(ring);
        let first = rings.create_point(ring, p(0.0, 4.0), None);
        rings.rings[ring.0].points = Some(first);

        rings
            .insert_hot_pixels_in_path(&mut bound, p(4.0, 0.0), false)
            .unwrap();
        assert_eq!(bound.last_point, p(4.0, 0.0));
        // (3, 3) is too far from the edge; the end point is left out.
        assert_eq!(
            rings.ring_points(RingIdx(0)),
            vec![p(0.0, 4.0), p(1.0, 3.0), p(2.0, 2.0)]
        );
    }

    #[test]
    fn ringless_path_only_moves() {
        let mut rings = RingManager::new(Grid::default());
        let mut bound = Bound::new(vec![Edge::new(p(0.0, 1.0), p(0.0, 0.0))], PolygonKind::Clip);
        rings
            .insert_hot_pixels_in_path(&mut bound, p(0.0, 0.0), true)
            .unwrap();
        assert_eq!(bound.last_point, p(0.0, 0.0));
        assert_eq!(rings.hot_pixels.len(), 0);
    }
}
