use serde::{Deserialize, Serialize};

use crate::num::Grid;

/// A two-dimensional point.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl Point {
    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Are both coordinates finite?
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// A hashable key for a point on the grid.
    ///
    /// Grid points never carry a negative zero, so equal points have equal keys.
    pub(crate) fn key(&self) -> (u64, u64) {
        (self.x.to_bits(), self.y.to_bits())
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Is `b` on the line through `a` and `c`? Uses an exact orientation test.
pub fn points_collinear(a: Point, b: Point, c: Point) -> bool {
    orientation(a, b, c) == 0.0
}

/// Twice the signed area of the triangle `a, b, c`, computed robustly.
///
/// Positive when the points turn counter-clockwise in a y-up frame.
pub fn orientation(a: Point, b: Point, c: Point) -> f64 {
    robust::orient2d(
        robust::Coord { x: a.x, y: a.y },
        robust::Coord { x: b.x, y: b.y },
        robust::Coord { x: c.x, y: c.y },
    )
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// The corner with the smallest coordinates.
    pub min: Point,
    /// The corner with the largest coordinates.
    pub max: Point,
}

impl BBox {
    /// The empty box at `p`.
    pub fn from_point(p: Point) -> Self {
        BBox { min: p, max: p }
    }

    /// The smallest box containing all the points, if there are any.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<BBox> {
        let mut iter = points.into_iter();
        let mut bbox = BBox::from_point(iter.next()?);
        for p in iter {
            bbox.extend(p);
        }
        Some(bbox)
    }

    /// Grows the box to contain `p`.
    pub fn extend(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// The smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        let mut ret = *self;
        ret.extend(other.min);
        ret.extend(other.max);
        ret
    }

    /// Does this box contain `other`, boundaries included?
    pub fn contains(&self, other: &BBox) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }
}

/// A straight piece of a ring's boundary.
///
/// The sweep line moves from large y to small y, and `bot` is the end that it
/// reaches first: `bot.y >= top.y` always holds.
#[derive(Clone, Copy, PartialEq)]
pub struct Edge {
    pub bot: Point,
    pub top: Point,
    /// The inverse slope, `+inf` for horizontal edges.
    pub dx: f64,
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} -- {:?}", self.bot, self.top)
    }
}

impl Edge {
    /// The edge from `current` to `next`, oriented for the sweep.
    ///
    /// For horizontal edges `bot` is `current`.
    pub fn new(current: Point, next: Point) -> Self {
        let (bot, top) = if current.y >= next.y {
            (current, next)
        } else {
            (next, current)
        };
        let dy = top.y - bot.y;
        let dx = if dy == 0.0 {
            f64::INFINITY
        } else {
            (top.x - bot.x) / dy
        };
        Edge { bot, top, dx }
    }

    pub fn is_horizontal(&self) -> bool {
        self.dx.is_infinite()
    }

    /// Swaps the x coordinates of the two ends of a horizontal edge.
    pub fn reverse_horizontal(&mut self) {
        std::mem::swap(&mut self.bot.x, &mut self.top.x);
    }

    /// The x coordinate of this edge's line at height `y`.
    pub fn current_x(&self, y: f64) -> f64 {
        if y == self.top.y {
            self.top.x
        } else {
            self.bot.x + self.dx * (y - self.bot.y)
        }
    }

    /// The smallest grid x that this edge passes through within half a pixel of `y`.
    pub fn min_x(&self, y: f64, grid: &Grid) -> f64 {
        if self.is_horizontal() {
            return self.bot.x.min(self.top.x);
        }
        let half = grid.half_pixel();
        if self.dx > 0.0 {
            if y == self.top.y {
                self.top.x
            } else {
                grid.round_towards_min(self.bot.x + self.dx * ((y - self.bot.y) - half))
            }
        } else if y == self.bot.y {
            self.bot.x
        } else {
            grid.round_towards_min(self.bot.x + self.dx * ((y - self.bot.y) + half))
        }
    }

    /// The largest grid x that this edge passes through within half a pixel of `y`.
    pub fn max_x(&self, y: f64, grid: &Grid) -> f64 {
        if self.is_horizontal() {
            return self.bot.x.max(self.top.x);
        }
        let half = grid.half_pixel();
        if self.dx < 0.0 {
            if y == self.top.y {
                self.top.x
            } else {
                grid.round_towards_max(self.bot.x + self.dx * ((y - self.bot.y) - half))
            }
        } else if y == self.bot.y {
            self.bot.x
        } else {
            grid.round_towards_max(self.bot.x + self.dx * ((y - self.bot.y) + half))
        }
    }

    /// The point where the lines of two edges cross.
    ///
    /// The result is clamped to this edge: nearly parallel edges yield a point
    /// near one of its ends rather than something far away.
    pub fn intersection(&self, other: &Edge) -> Point {
        let s1 = (self.top.x - self.bot.x, self.top.y - self.bot.y);
        let s2 = (other.top.x - other.bot.x, other.top.y - other.bot.y);
        let den = -s2.0 * s1.1 + s1.0 * s2.1;
        let t = (s2.0 * (self.bot.y - other.bot.y) - s2.1 * (self.bot.x - other.bot.x)) / den;
        if !t.is_finite() {
            return self.top;
        }
        let t = t.clamp(0.0, 1.0);
        Point::new(self.bot.x + t * s1.0, self.bot.y + t * s1.1)
    }
}

/// Do two edges have exactly the same slope?
pub fn slopes_equal(e1: &Edge, e2: &Edge) -> bool {
    (e1.top.y - e1.bot.y) * (e2.top.x - e2.bot.x) == (e1.top.x - e1.bot.x) * (e2.top.y - e2.bot.y)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::num::tests::Reasonable;
    use proptest::prelude::*;

    pub fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    impl Reasonable for Point {
        type Strategy = BoxedStrategy<Point>;

        fn reasonable() -> Self::Strategy {
            (f64::reasonable(), f64::reasonable())
                .prop_map(|(x, y)| Point::new(x, y))
                .boxed()
        }
    }

    #[test]
    fn edge_orientation() {
        let e = Edge::new(p(0.0, 0.0), p(2.0, 4.0));
        assert_eq!(e.bot, p(2.0, 4.0));
        assert_eq!(e.top, p(0.0, 0.0));
        assert_eq!(e.dx, 0.5);

        let h = Edge::new(p(3.0, 1.0), p(0.0, 1.0));
        assert!(h.is_horizontal());
        assert_eq!(h.bot, p(3.0, 1.0));

        let mut r = h;
        r.reverse_horizontal();
        assert_eq!(r.bot, p(0.0, 1.0));
        assert_eq!(r.top, p(3.0, 1.0));
    }

    #[test]
    fn current_x() {
        let e = Edge::new(p(0.0, 0.0), p(2.0, 4.0));
        assert_eq!(e.current_x(4.0), 2.0);
        assert_eq!(e.current_x(2.0), 1.0);
        assert_eq!(e.current_x(0.0), 0.0);
    }

    #[test]
    fn pixel_span() {
        let grid = Grid::new(1.0).unwrap();
        // Rises one unit of x for every unit of y, going up the sweep.
        let e = Edge::new(p(0.0, 4.0), p(4.0, 0.0));
        assert_eq!(e.dx, -1.0);
        // Within half a pixel of y = 2 the edge covers x in [1.5, 2.5].
        assert_eq!(e.min_x(2.0, &grid), 1.0);
        assert_eq!(e.max_x(2.0, &grid), 3.0);
        assert_eq!(e.min_x(4.0, &grid), 0.0);
        assert_eq!(e.max_x(0.0, &grid), 4.0);

        let shallow = Edge::new(p(0.0, 1.0), p(10.0, 0.0));
        assert_eq!(shallow.min_x(1.0, &grid), 0.0);
        assert_eq!(shallow.max_x(1.0, &grid), 5.0);
    }

    #[test]
    fn crossing_point() {
        let a = Edge::new(p(0.0, 0.0), p(2.0, 2.0));
        let b = Edge::new(p(2.0, 0.0), p(0.0, 2.0));
        assert_eq!(a.intersection(&b), p(1.0, 1.0));
        assert_eq!(b.intersection(&a), p(1.0, 1.0));
    }

    #[test]
    fn parallel_slopes() {
        let a = Edge::new(p(0.0, 0.0), p(1.0, 3.0));
        let b = Edge::new(p(5.0, 1.0), p(7.0, 7.0));
        let c = Edge::new(p(5.0, 1.0), p(7.0, 8.0));
        assert!(slopes_equal(&a, &b));
        assert!(!slopes_equal(&a, &c));
    }

    #[test]
    fn collinear() {
        assert!(points_collinear(p(0.0, 0.0), p(1.0, 1.0), p(3.0, 3.0)));
        assert!(points_collinear(p(0.0, 0.0), p(1.0, 1.0), p(0.0, 0.0)));
        assert!(!points_collinear(p(0.0, 0.0), p(1.0, 1.0), p(3.0, 3.000001)));
        assert!(orientation(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)) > 0.0);
    }

    proptest! {
    #[test]
    fn intersection_is_within_the_edge(a in Point::reasonable(), b in Point::reasonable(), c in Point::reasonable(), d in Point::reasonable()) {
        let e1 = Edge::new(a, b);
        let e2 = Edge::new(c, d);
        let x = e1.intersection(&e2);
        let bbox = BBox::from_points([e1.bot, e1.top]).unwrap();
        let eps = 1e-6;
        prop_assert!(x.x >= bbox.min.x - eps && x.x <= bbox.max.x + eps);
        prop_assert!(x.y >= bbox.min.y - eps && x.y <= bbox.max.y + eps);
    }
    }
}
