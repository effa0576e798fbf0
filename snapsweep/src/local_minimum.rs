//! Turning input rings into bounds and local minima.

use tracing::warn;

use crate::{
    bound::{
        create_bound_towards_maximum, create_bound_towards_minimum, fix_horizontals,
        move_horizontals, Bound, BoundIdx, Side,
    },
    geom::{points_collinear, BBox, Edge, Point},
    num::{insertion_sort_by, Grid},
    scanbeam::Scanbeam,
    Error, PolygonKind,
};

/// A place where two bounds start, one on each side of the ring's interior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalMinimum {
    pub left: BoundIdx,
    pub right: BoundIdx,
    pub y: f64,
    pub minimum_has_horizontal: bool,
}

/// All the bounds and local minima of the rings added so far.
#[derive(Clone, Debug, Default)]
pub struct LocalMinimumList {
    pub bounds: Vec<Bound>,
    pub minima: Vec<LocalMinimum>,
}

impl LocalMinimumList {
    pub fn is_empty(&self) -> bool {
        self.minima.is_empty()
    }

    pub fn len(&self) -> usize {
        self.minima.len()
    }

    pub fn clear(&mut self) {
        self.bounds.clear();
        self.minima.clear();
    }

    /// The bounding box of everything added so far.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(
            self.bounds
                .iter()
                .flat_map(|b| b.edges.iter())
                .flat_map(|e| [e.bot, e.top]),
        )
    }

    /// The local minima in sweep order: largest y first and, at equal
    /// heights, the ones starting with a horizontal edge first.
    pub fn sorted(&self) -> Vec<LocalMinimum> {
        let mut ret = self.minima.clone();
        insertion_sort_by(&mut ret, |a, b| {
            if a.y != b.y {
                a.y > b.y
            } else {
                a.minimum_has_horizontal && !b.minimum_has_horizontal
            }
        });
        ret
    }

    /// A scanbeam with a stop at every local minimum.
    pub fn scanbeam(&self) -> Scanbeam {
        self.minima.iter().map(|lm| lm.y).collect()
    }

    /// Adds a closed ring, snapping its vertices to `grid`.
    ///
    /// Returns `false` (and adds nothing) if the ring is degenerate.
    pub fn add_ring(
        &mut self,
        points: &[Point],
        kind: PolygonKind,
        grid: &Grid,
    ) -> Result<bool, Error> {
        let mut edges = build_edges(points, grid)?;
        if edges.is_empty() {
            return Ok(false);
        }
        start_list_on_local_maximum(&mut edges);

        let base = self.bounds.len();
        let mut bounds: Vec<Bound> = Vec::new();
        let mut minima = Vec::new();
        let mut first_minimum: Option<BoundIdx> = None;
        let mut last_maximum: Option<BoundIdx> = None;

        while !edges.is_empty() {
            let mut to_min = create_bound_towards_minimum(&mut edges);
            if edges.is_empty() {
                warn!(?points, "ring has a local minimum without a matching maximum");
                return Ok(false);
            }
            let mut to_max = create_bound_towards_maximum(&mut edges);
            fix_horizontals(&mut to_min);
            fix_horizontals(&mut to_max);

            let max_non_horizontal = to_max.iter().position(|e| !e.is_horizontal());
            let min_non_horizontal = to_min.iter().position(|e| !e.is_horizontal());
            let (Some(max_nh), Some(min_nh)) = (max_non_horizontal, min_non_horizontal) else {
                warn!(?points, "ring has a bound made only of horizontal edges");
                return Ok(false);
            };
            let minimum_has_horizontal = max_nh > 0 || min_nh > 0;
            let minimum_is_left = if minimum_has_horizontal {
                if to_max[max_nh].bot.x > to_min[min_nh].bot.x {
                    move_horizontals(&mut to_min, &mut to_max);
                    true
                } else {
                    move_horizontals(&mut to_max, &mut to_min);
                    false
                }
            } else {
                to_max[max_nh].dx <= to_min[min_nh].dx
            };

            let y = to_min[0].bot.y;
            let min_idx = BoundIdx(base + bounds.len());
            let max_idx = BoundIdx(min_idx.0 + 1);
            let mut min_bound = Bound::new(to_min, kind);
            let mut max_bound = Bound::new(to_max, kind);
            min_bound.winding_delta = -1;
            max_bound.winding_delta = 1;
            min_bound.maximum_bound = last_maximum;
            let (left, right) = if minimum_is_left {
                min_bound.side = Side::Left;
                max_bound.side = Side::Right;
                (min_idx, max_idx)
            } else {
                min_bound.side = Side::Right;
                max_bound.side = Side::Left;
                (max_idx, min_idx)
            };
            bounds.push(min_bound);
            bounds.push(max_bound);
            minima.push(LocalMinimum {
                left,
                right,
                y,
                minimum_has_horizontal,
            });

            match last_maximum {
                None => first_minimum = Some(min_idx),
                Some(last) => bounds[last.0 - base].maximum_bound = Some(min_idx),
            }
            last_maximum = Some(max_idx);
        }

        if let (Some(first), Some(last)) = (first_minimum, last_maximum) {
            bounds[last.0 - base].maximum_bound = Some(first);
            bounds[first.0 - base].maximum_bound = Some(last);
        }
        self.bounds.append(&mut bounds);
        self.minima.append(&mut minima);
        Ok(true)
    }
}

/// Snaps and cleans up a ring, and returns its edges.
///
/// The ring is closed implicitly. Duplicate vertices and vertices on the line
/// through their neighbours are removed; if fewer than three vertices remain
/// the ring is degenerate and has no edges.
pub(crate) fn build_edges(points: &[Point], grid: &Grid) -> Result<Vec<Edge>, Error> {
    let mut pts: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if !p.is_finite() {
            return Err(Error::NonFinite { x: p.x, y: p.y });
        }
        let p = grid.round_point(*p);
        if pts.last() != Some(&p) {
            pts.push(p);
        }
    }
    while pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }

    let mut i = 0;
    let mut unchanged = 0;
    while pts.len() >= 3 && unchanged < pts.len() {
        let n = pts.len();
        let prev = pts[(i + n - 1) % n];
        let next = pts[(i + 1) % n];
        if pts[i] == next || points_collinear(prev, pts[i], next) {
            pts.remove(i);
            // Removing a vertex can make its predecessor removable.
            i = if i == 0 { pts.len() - 1 } else { i - 1 };
            unchanged = 0;
        } else {
            i = (i + 1) % n;
            unchanged += 1;
        }
    }
    if pts.len() < 3 {
        return Ok(Vec::new());
    }
    let n = pts.len();
    Ok((0..n).map(|i| Edge::new(pts[i], pts[(i + 1) % n])).collect())
}

/// Rotates a cyclic edge list so that it starts just after a local maximum.
fn start_list_on_local_maximum(edges: &mut [Edge]) {
    if edges.len() <= 2 {
        return;
    }
    let mut prev = edges[edges.len() - 1];
    let mut y_decreasing_before_last_horizontal = false;
    let mut index = 0;
    while index < edges.len() {
        let edge = edges[index];
        let edge_horizontal = edge.is_horizontal();
        let prev_horizontal = prev.is_horizontal();
        if !prev_horizontal && !edge_horizontal && edge.top == prev.top {
            break;
        }
        if !edge_horizontal && prev_horizontal {
            if y_decreasing_before_last_horizontal && (edge.top == prev.bot || edge.top == prev.top)
            {
                break;
            }
        } else if !y_decreasing_before_last_horizontal
            && !prev_horizontal
            && edge_horizontal
            && (prev.top == edge.top || prev.top == edge.bot)
        {
            y_decreasing_before_last_horizontal = true;
        }
        prev = edge;
        index += 1;
    }
    edges.rotate_left(index % edges.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::tests::p;
    use assert_matches::assert_matches;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)]
    }

    #[test]
    fn degenerate_rings() {
        let grid = Grid::default();
        let mut list = LocalMinimumList::default();
        assert!(!list.add_ring(&[], PolygonKind::Subject, &grid).unwrap());
        assert!(!list
            .add_ring(&[p(0.0, 0.0), p(1.0, 1.0)], PolygonKind::Subject, &grid)
            .unwrap());
        assert!(!list
            .add_ring(
                &[p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0), p(0.0, 0.0)],
                PolygonKind::Subject,
                &grid
            )
            .unwrap());
        assert!(list.is_empty());
        assert!(list.bbox().is_none());
    }

    #[test]
    fn non_finite() {
        let mut list = LocalMinimumList::default();
        let res = list.add_ring(
            &[p(0.0, 0.0), p(f64::NAN, 1.0), p(1.0, 1.0)],
            PolygonKind::Clip,
            &Grid::default(),
        );
        assert_matches!(res, Err(Error::NonFinite { .. }));
    }

    #[test]
    fn cleanup() {
        let grid = Grid::default();
        // A spike, a duplicate, a collinear vertex and a closing point.
        let pts = [
            p(0.0, 0.0),
            p(1.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 2.0),
            p(2.0, 2.0),
            p(2.0, 3.0),
            p(2.0, 2.0),
            p(0.0, 2.0),
            p(0.0, 0.0),
        ];
        let edges = build_edges(&pts, &grid).unwrap();
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn square_minimum() {
        let grid = Grid::default();
        let mut list = LocalMinimumList::default();
        assert!(list
            .add_ring(&square(0.0, 0.0, 1.0, 1.0), PolygonKind::Subject, &grid)
            .unwrap());
        assert_eq!(list.len(), 1);
        assert_eq!(list.bounds.len(), 2);
        let lm = list.minima[0];
        assert_eq!(lm.y, 1.0);
        assert!(lm.minimum_has_horizontal);

        let left = &list.bounds[lm.left.0];
        let right = &list.bounds[lm.right.0];
        // The horizontal at the minimum belongs to the right bound.
        assert!(!left.edges[0].is_horizontal());
        assert!(right.edges[0].is_horizontal());
        assert_eq!(left.edges[0].bot, p(0.0, 1.0));
        assert_eq!(left.maximum_bound, Some(lm.right));
        assert_eq!(right.maximum_bound, Some(lm.left));
        assert_eq!(left.winding_delta + right.winding_delta, 0);

        assert_eq!(
            list.bbox(),
            Some(BBox {
                min: p(0.0, 0.0),
                max: p(1.0, 1.0)
            })
        );
    }

    #[test]
    fn two_minima() {
        // A "W" shape upside down: two minima (largest y) at x = 1 and x = 3.
        let grid = Grid::default();
        let mut list = LocalMinimumList::default();
        let pts = [p(0.0, 0.0), p(1.0, 4.0), p(2.0, 1.0), p(3.0, 3.0), p(4.0, 0.0)];
        assert!(list.add_ring(&pts, PolygonKind::Clip, &grid).unwrap());
        assert_eq!(list.len(), 2);
        let sorted = list.sorted();
        assert_eq!(sorted[0].y, 4.0);
        assert_eq!(sorted[1].y, 3.0);

        let mut sb = list.scanbeam();
        assert_eq!(sb.pop(), Some(4.0));
        assert_eq!(sb.pop(), Some(3.0));
        assert_eq!(sb.pop(), None);

        // Every bound is paired with another bound ending at the same maximum.
        for (i, b) in list.bounds.iter().enumerate() {
            let pair = b.maximum_bound.unwrap();
            assert_eq!(list.bounds[pair.0].maximum_bound, Some(BoundIdx(i)));
            let top = b.edges.last().unwrap().top;
            assert_eq!(list.bounds[pair.0].edges.last().unwrap().top, top);
        }
    }
}
