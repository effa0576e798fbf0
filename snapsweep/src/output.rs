//! The polygons produced by a boolean operation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    geom::{BBox, Point},
    ring::{RingIdx, RingManager},
};

/// Twice the signed area enclosed by a closed sequence of points, positive
/// when it runs counter-clockwise in a y-up frame.
fn doubled_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// The signed area of a ring, positive for counter-clockwise rings (in a
/// y-up frame). The ring may or may not repeat its first point at the end.
pub fn ring_area(ring: &[Point]) -> f64 {
    doubled_area(ring) / 2.0
}

/// A solid ring followed by the holes cut out of it, in the order the sweep
/// reaches them.
///
/// Every ring is closed: its last point repeats its first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// The exterior ring, then the holes.
    pub rings: Vec<Vec<Point>>,
}

impl Polygon {
    /// A polygon made of an exterior ring followed by holes.
    pub fn new(rings: Vec<Vec<Point>>) -> Self {
        Polygon { rings }
    }

    /// The outer boundary, unless the polygon is empty.
    pub fn exterior(&self) -> Option<&[Point]> {
        self.rings.first().map(Vec::as_slice)
    }

    /// The rings after the exterior.
    pub fn holes(&self) -> &[Vec<Point>] {
        self.rings.get(1..).unwrap_or_default()
    }

    /// The area of the exterior minus the areas of the holes.
    pub fn area(&self) -> f64 {
        let exterior = self.exterior().map_or(0.0, |r| ring_area(r).abs());
        let holes: f64 = self.holes().iter().map(|r| ring_area(r).abs()).sum();
        exterior - holes
    }

    /// The bounding box of the exterior ring.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.exterior().into_iter().flatten().copied())
    }
}

/// The result of a boolean operation: disjoint polygons, any of which may sit
/// inside a hole of another.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon {
    /// The polygons, in the order the sweep reaches their exteriors: the
    /// exterior with the highest top-most point comes first.
    pub polygons: Vec<Polygon>,
}

impl MultiPolygon {
    /// Is the result empty?
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// The number of polygons.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Iterates over the polygons.
    pub fn iter(&self) -> std::slice::Iter<'_, Polygon> {
        self.polygons.iter()
    }

    /// The total area covered.
    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }

    /// The bounding box of all the polygons.
    pub fn bbox(&self) -> Option<BBox> {
        self.polygons
            .iter()
            .filter_map(Polygon::bbox)
            .reduce(|a, b| a.union(&b))
    }
}

impl<'a> IntoIterator for &'a MultiPolygon {
    type Item = &'a Polygon;
    type IntoIter = std::slice::Iter<'a, Polygon>;

    fn into_iter(self) -> Self::IntoIter {
        self.polygons.iter()
    }
}

impl RingManager {
    /// Collects the corrected ring tree into polygons.
    ///
    /// Rings are read along their `prev` links, which makes solids
    /// counter-clockwise (in a y-up frame). With `reverse_output` they are
    /// read along `next` instead.
    pub fn build_result(&self, reverse_output: bool) -> MultiPolygon {
        let mut ret = MultiPolygon::default();
        self.collect_polygons(self.children_of(None), reverse_output, &mut ret.polygons);
        ret
    }

    // The live rings among `slots`, ordered by where the sweep first reached them.
    fn in_sweep_order(&self, slots: &[Option<RingIdx>]) -> Vec<RingIdx> {
        let mut rings: Vec<RingIdx> = slots
            .iter()
            .flatten()
            .copied()
            .filter(|r| self.rings[r.0].points.is_some())
            .collect();
        rings.sort_by(|a, b| {
            match (self.rings[a.0].bottom_point, self.rings[b.0].bottom_point) {
                (Some(pa), Some(pb)) => {
                    let (pa, pb) = (self.point(pa), self.point(pb));
                    pb.y.total_cmp(&pa.y).then(pa.x.total_cmp(&pb.x))
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        rings
    }

    fn collect_polygons(&self, roots: &[Option<RingIdx>], reverse_output: bool, out: &mut Vec<Polygon>) {
        for root in self.in_sweep_order(roots) {
            let Some(exterior) = self.output_ring(root, reverse_output) else {
                continue;
            };
            let holes = self.in_sweep_order(self.children_of(Some(root)));
            let mut rings = vec![exterior];
            rings.extend(holes.iter().filter_map(|&h| self.output_ring(h, reverse_output)));
            out.push(Polygon { rings });
            for hole in holes {
                self.collect_polygons(self.children_of(Some(hole)), reverse_output, out);
            }
        }
    }

    fn output_ring(&self, ring: RingIdx, reverse_output: bool) -> Option<Vec<Point>> {
        let head = self.rings[ring.0].points?;
        let mut pts = Vec::new();
        let mut cur = head;
        loop {
            pts.push(self.point(cur));
            let node = &self.points[cur.0];
            cur = if reverse_output { node.next } else { node.prev };
            if cur == head {
                break;
            }
        }
        pts.push(pts[0]);
        Some(pts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geom::tests::p,
        num::Grid,
        ring::tests::{ring_from, solid_square},
    };

    #[test]
    fn areas() {
        let square = vec![p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0), p(0.0, 0.0)];
        assert_eq!(ring_area(&square), 4.0);
        let mut reversed = square.clone();
        reversed.reverse();
        assert_eq!(ring_area(&reversed), -4.0);

        let hole = vec![p(1.0, 1.0), p(1.0, 1.5), p(1.5, 1.5), p(1.5, 1.0), p(1.0, 1.0)];
        let poly = Polygon::new(vec![square, hole]);
        assert_eq!(poly.area(), 3.75);
        assert_eq!(poly.holes().len(), 1);
        assert_eq!(Polygon::default().area(), 0.0);
        assert!(Polygon::default().holes().is_empty());
    }

    #[test]
    fn tree_to_polygons() {
        let mut rings = RingManager::new(Grid::default());
        let outer = solid_square(&mut rings, 0.0, 0.0, 10.0, 10.0);
        let hole = ring_from(&mut rings, &[p(1.0, 1.0), p(9.0, 1.0), p(9.0, 9.0), p(1.0, 9.0)]);
        let island = solid_square(&mut rings, 2.0, 2.0, 3.0, 3.0);
        rings.assign_as_child(outer, None).unwrap();
        rings.assign_as_child(hole, Some(outer)).unwrap();
        rings.assign_as_child(island, Some(hole)).unwrap();

        let result = rings.build_result(false);
        assert_eq!(result.len(), 2);
        assert_eq!(result.polygons[0].rings.len(), 2);
        assert_eq!(result.polygons[1].rings.len(), 1);
        assert_eq!(result.area(), 100.0 - 64.0 + 1.0);
        assert!(ring_area(&result.polygons[0].rings[0]) > 0.0);
        assert!(ring_area(&result.polygons[0].rings[1]) < 0.0);
        insta::assert_debug_snapshot!(result.polygons[1].rings[0], @r"
        [
            (2.0, 2.0),
            (3.0, 2.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 2.0),
        ]
        ");

        let reversed = rings.build_result(true);
        assert!(ring_area(&reversed.polygons[0].rings[0]) < 0.0);
        assert_eq!(reversed.area(), result.area());
        assert_eq!(
            result.bbox(),
            Some(BBox {
                min: p(0.0, 0.0),
                max: p(10.0, 10.0)
            })
        );
    }

    #[test]
    fn polygons_come_in_sweep_order() {
        let mut rings = RingManager::new(Grid::default());
        let low = solid_square(&mut rings, 0.0, 0.0, 1.0, 1.0);
        let high = solid_square(&mut rings, 5.0, 0.0, 6.0, 3.0);
        let left = solid_square(&mut rings, -4.0, 0.0, -3.0, 3.0);
        for r in [low, high, left] {
            rings.assign_as_child(r, None).unwrap();
        }
        rings.correct_topology().unwrap();

        let result = rings.build_result(false);
        let tops: Vec<_> = result
            .iter()
            .filter_map(|poly| poly.bbox())
            .map(|b| (b.min.x, b.max.y))
            .collect();
        assert_eq!(tops, vec![(-4.0, 3.0), (5.0, 3.0), (0.0, 1.0)]);
    }
}
