//! Output rings under construction.
//!
//! Rings and their points live in two arenas owned by a [`RingManager`].
//! Bounds refer to rings by index, points refer to each other by index, and
//! nothing is ever moved: removing a point or a ring only unlinks it.

use crate::{
    active_bounds::ActiveBounds,
    bound::{Bound, BoundIdx, Side},
    geom::{orientation, BBox, Point},
    hot_pixels::HotPixels,
    num::Grid,
    Error,
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RingIdx(pub usize);

impl std::fmt::Debug for RingIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r_{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointIdx(pub usize);

impl std::fmt::Debug for PointIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p_{}", self.0)
    }
}

/// A vertex in the cyclic, doubly linked point list of a ring.
#[derive(Clone, Debug)]
pub struct PointNode {
    pub x: f64,
    pub y: f64,
    pub prev: PointIdx,
    pub next: PointIdx,
    /// `None` once the point has been removed.
    pub ring: Option<RingIdx>,
}

impl PointNode {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingStats {
    /// Positive for solids, when following `next` links in a y-down frame.
    pub area: f64,
    pub size: usize,
    pub bbox: BBox,
    pub is_hole: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Ring {
    pub index: usize,
    pub parent: Option<RingIdx>,
    /// Removed children leave a `None` behind, and the slot gets reused.
    pub children: Vec<Option<RingIdx>>,
    /// The left-most point of the ring while it is being built; any point afterwards.
    pub points: Option<PointIdx>,
    /// The first point the sweep reaches, once the ring has been placed in
    /// the corrected tree.
    pub bottom_point: Option<PointIdx>,
    stats: Option<RingStats>,
}

/// Where a point is relative to a ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointInPolygon {
    Inside,
    Outside,
    OnBoundary,
}

/// Owns every ring and point of one boolean operation.
#[derive(Clone, Debug)]
pub struct RingManager {
    /// The rings that have no parent.
    pub children: Vec<Option<RingIdx>>,
    pub rings: Vec<Ring>,
    pub points: Vec<PointNode>,
    pub hot_pixels: HotPixels,
    pub(crate) grid: Grid,
}

impl RingManager {
    pub fn new(grid: Grid) -> Self {
        RingManager {
            children: Vec::new(),
            rings: Vec::new(),
            points: Vec::new(),
            hot_pixels: HotPixels::default(),
            grid,
        }
    }

    pub fn create_ring(&mut self) -> RingIdx {
        let idx = RingIdx(self.rings.len());
        self.rings.push(Ring {
            index: idx.0,
            ..Ring::default()
        });
        idx
    }

    /// Creates a point in `ring`, linked in just before `before` (or on its
    /// own, if there is nothing to link to).
    pub fn create_point(&mut self, ring: RingIdx, pt: Point, before: Option<PointIdx>) -> PointIdx {
        let idx = PointIdx(self.points.len());
        let (prev, next) = match before {
            Some(b) => (self.points[b.0].prev, b),
            None => (idx, idx),
        };
        self.points.push(PointNode {
            x: pt.x,
            y: pt.y,
            prev,
            next,
            ring: Some(ring),
        });
        if before.is_some() {
            self.points[prev.0].next = idx;
            self.points[next.0].prev = idx;
        }
        self.reset_stats(ring);
        idx
    }

    pub fn point(&self, idx: PointIdx) -> Point {
        self.points[idx.0].point()
    }

    /// The point indices of a ring, following `next` links from its head.
    pub fn ring_nodes(&self, ring: RingIdx) -> Vec<PointIdx> {
        let mut ret = Vec::new();
        if let Some(head) = self.rings[ring.0].points {
            let mut cur = head;
            loop {
                ret.push(cur);
                cur = self.points[cur.0].next;
                if cur == head {
                    break;
                }
            }
        }
        ret
    }

    #[cfg(test)]
    pub fn ring_points(&self, ring: RingIdx) -> Vec<Point> {
        self.ring_nodes(ring)
            .into_iter()
            .map(|p| self.point(p))
            .collect()
    }

    /// The rings that still have points.
    pub fn live_rings(&self) -> Vec<RingIdx> {
        self.rings
            .iter()
            .filter(|r| r.points.is_some())
            .map(|r| RingIdx(r.index))
            .collect()
    }

    pub fn reset_stats(&mut self, ring: RingIdx) {
        self.rings[ring.0].stats = None;
    }

    /// The ring's statistics, computed on first use after a change.
    pub fn stats(&mut self, ring: RingIdx) -> Option<RingStats> {
        if self.rings[ring.0].stats.is_none() {
            let head = self.rings[ring.0].points?;
            let mut area = 0.0;
            let mut size = 0;
            let mut bbox = BBox::from_point(self.point(head));
            let mut cur = head;
            loop {
                let node = &self.points[cur.0];
                let prev = &self.points[node.prev.0];
                area += (prev.x + node.x) * (prev.y - node.y);
                bbox.extend(node.point());
                size += 1;
                cur = node.next;
                if cur == head {
                    break;
                }
            }
            let area = area * 0.5;
            self.rings[ring.0].stats = Some(RingStats {
                area,
                size,
                bbox,
                is_hole: area <= 0.0,
            });
        }
        self.rings[ring.0].stats
    }

    pub fn area(&mut self, ring: RingIdx) -> f64 {
        self.stats(ring).map_or(0.0, |s| s.area)
    }

    pub fn size(&mut self, ring: RingIdx) -> usize {
        self.stats(ring).map_or(0, |s| s.size)
    }

    /// Is the ring oriented as a hole?
    pub fn is_hole(&mut self, ring: RingIdx) -> bool {
        self.stats(ring).is_some_and(|s| s.is_hole)
    }

    /// Adds a point to the end of the ring that the bound is extending,
    /// unless it is already there.
    pub(crate) fn push_point(&mut self, bound: &Bound, pt: Point) -> Result<(), Error> {
        let ring = bound.ring.ok_or(Error::DetachedBound)?;
        let head = self.rings[ring.0].points.ok_or(Error::DetachedBound)?;
        let to_front = bound.side == Side::Left;
        let end = if to_front {
            head
        } else {
            self.points[head.0].prev
        };
        if self.point(end) == pt {
            return Ok(());
        }
        let new = self.create_point(ring, pt, Some(head));
        if to_front {
            self.rings[ring.0].points = Some(new);
        }
        Ok(())
    }

    pub fn add_first_point(
        &mut self,
        bounds: &mut [Bound],
        abl: &ActiveBounds,
        b: BoundIdx,
        pt: Point,
    ) -> Result<(), Error> {
        let ring = self.create_ring();
        let p = self.create_point(ring, pt, None);
        self.rings[ring.0].points = Some(p);
        bounds[b.0].ring = Some(ring);
        self.set_hole_state(bounds, abl, b)?;
        bounds[b.0].last_point = pt;
        Ok(())
    }

    pub fn add_point_to_ring(&mut self, bound: &mut Bound, pt: Point) -> Result<(), Error> {
        self.insert_hot_pixels_in_path(bound, pt, false)?;
        self.push_point(bound, pt)
    }

    /// Adds a point to the bound's ring, starting a new ring if it has none.
    pub fn add_point(
        &mut self,
        bounds: &mut [Bound],
        abl: &ActiveBounds,
        b: BoundIdx,
        pt: Point,
    ) -> Result<(), Error> {
        if bounds[b.0].ring.is_none() {
            self.add_first_point(bounds, abl, b, pt)
        } else {
            self.add_point_to_ring(&mut bounds[b.0], pt)
        }
    }

    /// Starts a ring at a point where two bounds begin contributing.
    pub fn add_local_minimum_point(
        &mut self,
        bounds: &mut [Bound],
        abl: &ActiveBounds,
        b1: BoundIdx,
        b2: BoundIdx,
        pt: Point,
    ) -> Result<(), Error> {
        let b2_horizontal = bounds[b2.0].current_edge()?.is_horizontal();
        let (first, second) =
            if b2_horizontal || bounds[b1.0].current_edge()?.dx > bounds[b2.0].current_edge()?.dx {
                (b1, b2)
            } else {
                (b2, b1)
            };
        self.add_point(bounds, abl, first, pt)?;
        bounds[second.0].last_point = pt;
        bounds[second.0].ring = bounds[first.0].ring;
        bounds[first.0].side = Side::Left;
        bounds[second.0].side = Side::Right;
        Ok(())
    }

    /// Joins the rings of two bounds meeting at a local maximum.
    pub fn add_local_maximum_point(
        &mut self,
        bounds: &mut [Bound],
        abl: &ActiveBounds,
        b1: BoundIdx,
        b2: BoundIdx,
        pt: Point,
    ) -> Result<(), Error> {
        let (Some(_), Some(_)) = (bounds[b1.0].ring, bounds[b2.0].ring) else {
            return Err(Error::UnpairedMaximum);
        };
        self.insert_hot_pixels_in_path(&mut bounds[b2.0], pt, false)?;
        self.add_point(bounds, abl, b1, pt)?;
        let (Some(r1), Some(r2)) = (bounds[b1.0].ring, bounds[b2.0].ring) else {
            return Err(Error::UnpairedMaximum);
        };
        if r1 == r2 {
            bounds[b1.0].ring = None;
            bounds[b2.0].ring = None;
        } else if r1.0 < r2.0 {
            self.append_ring(bounds, abl, b1, b2)?;
        } else {
            self.append_ring(bounds, abl, b2, b1)?;
        }
        Ok(())
    }

    // Splices the ring of `b2` onto the ring of `b1`, at the ends that the two
    // bounds are building.
    fn append_ring(
        &mut self,
        bounds: &mut [Bound],
        abl: &ActiveBounds,
        b1: BoundIdx,
        b2: BoundIdx,
    ) -> Result<(), Error> {
        let r1 = bounds[b1.0].ring.ok_or(Error::DetachedBound)?;
        let r2 = bounds[b2.0].ring.ok_or(Error::DetachedBound)?;
        let (keep_bound, keep, remove_bound, remove) = if self.ring_is_descendant(r1, r2) {
            (b2, r2, b1, r1)
        } else {
            (b1, r1, b2, r2)
        };

        let p1_lft = self.rings[keep.0].points.ok_or(Error::DetachedBound)?;
        let p1_rt = self.points[p1_lft.0].prev;
        let p2_lft = self.rings[remove.0].points.ok_or(Error::DetachedBound)?;
        let p2_rt = self.points[p2_lft.0].prev;

        let keep_side = bounds[keep_bound.0].side;
        let remove_side = bounds[remove_bound.0].side;
        match (keep_side, remove_side) {
            (Side::Left, Side::Left) => {
                self.reverse_ring(p2_lft);
                self.points[p2_lft.0].next = p1_lft;
                self.points[p1_lft.0].prev = p2_lft;
                self.points[p1_rt.0].next = p2_rt;
                self.points[p2_rt.0].prev = p1_rt;
                self.rings[keep.0].points = Some(p2_rt);
            }
            (Side::Left, Side::Right) => {
                self.points[p2_rt.0].next = p1_lft;
                self.points[p1_lft.0].prev = p2_rt;
                self.points[p2_lft.0].prev = p1_rt;
                self.points[p1_rt.0].next = p2_lft;
                self.rings[keep.0].points = Some(p2_lft);
            }
            (Side::Right, Side::Right) => {
                self.reverse_ring(p2_lft);
                self.points[p1_rt.0].next = p2_rt;
                self.points[p2_rt.0].prev = p1_rt;
                self.points[p2_lft.0].next = p1_lft;
                self.points[p1_lft.0].prev = p2_lft;
            }
            (Side::Right, Side::Left) => {
                self.points[p1_rt.0].next = p2_lft;
                self.points[p2_lft.0].prev = p1_rt;
                self.points[p1_lft.0].prev = p2_rt;
                self.points[p2_rt.0].next = p1_lft;
            }
        }

        self.rings[keep.0].bottom_point = None;
        let keep_is_hole = self.ring_is_hole(keep);
        let remove_is_hole = self.ring_is_hole(remove);
        self.rings[remove.0].points = None;
        if keep_is_hole != remove_is_hole {
            let parent = self.rings[keep.0].parent;
            self.ring1_replaces_ring2(parent, remove);
        } else {
            self.ring1_replaces_ring2(Some(keep), remove);
        }
        self.update_points_ring(keep);
        self.reset_stats(keep);

        bounds[b1.0].ring = None;
        bounds[b2.0].ring = None;
        for b in abl.live() {
            if bounds[b.0].ring == Some(remove) {
                bounds[b.0].ring = Some(keep);
                bounds[b.0].side = keep_side;
                break;
            }
        }
        Ok(())
    }

    // Places a new ring in the tree: its parent is the ring of the nearest
    // bound to the left whose ring is not closed off again before reaching us.
    fn set_hole_state(
        &mut self,
        bounds: &[Bound],
        abl: &ActiveBounds,
        b: BoundIdx,
    ) -> Result<(), Error> {
        let ring = bounds[b.0].ring.ok_or(Error::DetachedBound)?;
        let pos = abl
            .position_of(b)
            .ok_or_else(|| Error::out_of_range("active bound", b.0, abl.len()))?;
        let mut candidate: Option<RingIdx> = None;
        for p in (0..pos).rev() {
            let Some(other) = abl.slot(p) else {
                continue;
            };
            let Some(other_ring) = bounds[other.0].ring else {
                continue;
            };
            match candidate {
                None => candidate = Some(other_ring),
                Some(c) if c == other_ring => candidate = None,
                Some(_) => {}
            }
        }
        self.rings[ring.0].parent = candidate;
        self.set_to_children(candidate, ring);
        Ok(())
    }

    fn children_of_mut(&mut self, parent: Option<RingIdx>) -> &mut Vec<Option<RingIdx>> {
        match parent {
            Some(p) => &mut self.rings[p.0].children,
            None => &mut self.children,
        }
    }

    /// The children of a ring, or the root rings.
    pub fn children_of(&self, parent: Option<RingIdx>) -> &[Option<RingIdx>] {
        match parent {
            Some(p) => &self.rings[p.0].children,
            None => &self.children,
        }
    }

    /// Adds `ring` to a children list, reusing an empty slot if there is one.
    pub fn set_to_children(&mut self, parent: Option<RingIdx>, ring: RingIdx) {
        let children = self.children_of_mut(parent);
        match children.iter_mut().find(|c| c.is_none()) {
            Some(slot) => *slot = Some(ring),
            None => children.push(Some(ring)),
        }
    }

    pub fn remove_from_children(&mut self, parent: Option<RingIdx>, ring: RingIdx) {
        let children = self.children_of_mut(parent);
        if let Some(slot) = children.iter_mut().find(|c| **c == Some(ring)) {
            *slot = None;
        }
    }

    /// Hands the children of `ring2` over to `ring1` (or to the root), and
    /// takes `ring2` out of the tree.
    pub fn ring1_replaces_ring2(&mut self, ring1: Option<RingIdx>, ring2: RingIdx) {
        let kids = std::mem::take(&mut self.rings[ring2.0].children);
        for kid in kids.into_iter().flatten() {
            self.rings[kid.0].parent = ring1;
            self.set_to_children(ring1, kid);
        }
        let parent = self.rings[ring2.0].parent;
        self.remove_from_children(parent, ring2);
        let r2 = &mut self.rings[ring2.0];
        r2.parent = None;
        r2.points = None;
        r2.stats = None;
    }

    fn check_orientation(&mut self, ring: RingIdx, parent: Option<RingIdx>) -> Result<(), Error> {
        let ok = match parent {
            None => !self.is_hole(ring),
            Some(p) => self.is_hole(ring) != self.is_hole(p),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Orientation)
        }
    }

    /// Makes a ring that is not in the tree yet a child of `parent`.
    pub fn assign_as_child(&mut self, ring: RingIdx, parent: Option<RingIdx>) -> Result<(), Error> {
        self.check_orientation(ring, parent)?;
        self.set_to_children(parent, ring);
        self.rings[ring.0].parent = parent;
        Ok(())
    }

    /// Moves a ring that is already in the tree under `parent`.
    pub fn reassign_as_child(
        &mut self,
        ring: RingIdx,
        parent: Option<RingIdx>,
    ) -> Result<(), Error> {
        self.check_orientation(ring, parent)?;
        let old = self.rings[ring.0].parent;
        self.remove_from_children(old, ring);
        self.set_to_children(parent, ring);
        self.rings[ring.0].parent = parent;
        Ok(())
    }

    /// Makes a ring that is not in the tree yet a sibling of `sibling`.
    pub fn assign_as_sibling(&mut self, ring: RingIdx, sibling: RingIdx) -> Result<(), Error> {
        if self.is_hole(ring) != self.is_hole(sibling) {
            return Err(Error::Orientation);
        }
        let parent = self.rings[sibling.0].parent;
        self.set_to_children(parent, ring);
        self.rings[ring.0].parent = parent;
        Ok(())
    }

    /// Takes a ring out of the tree without touching its points.
    pub fn remove_ring(&mut self, ring: RingIdx, remove_children: bool, remove_from_parent: bool) {
        let kids = std::mem::take(&mut self.rings[ring.0].children);
        if remove_children {
            for kid in kids.into_iter().flatten() {
                self.remove_ring(kid, true, false);
            }
        }
        if remove_from_parent {
            let parent = self.rings[ring.0].parent;
            self.remove_from_children(parent, ring);
        }
        let r = &mut self.rings[ring.0];
        r.parent = None;
        r.points = None;
        r.stats = None;
    }

    /// Takes a ring out of the tree and detaches all its points.
    pub fn remove_ring_and_points(
        &mut self,
        ring: RingIdx,
        remove_children: bool,
        remove_from_parent: bool,
    ) {
        let kids = std::mem::take(&mut self.rings[ring.0].children);
        if remove_children {
            for kid in kids.into_iter().flatten() {
                self.remove_ring_and_points(kid, true, false);
            }
        }
        for p in self.ring_nodes(ring) {
            self.points[p.0].ring = None;
        }
        if remove_from_parent {
            let parent = self.rings[ring.0].parent;
            self.remove_from_children(parent, ring);
        }
        let r = &mut self.rings[ring.0];
        r.parent = None;
        r.points = None;
        r.bottom_point = None;
        r.stats = None;
    }

    pub fn update_points_ring(&mut self, ring: RingIdx) {
        for p in self.ring_nodes(ring) {
            self.points[p.0].ring = Some(ring);
        }
    }

    /// Reverses the direction of the cycle containing `head`.
    pub fn reverse_ring(&mut self, head: PointIdx) {
        let mut cur = head;
        loop {
            let node = &mut self.points[cur.0];
            std::mem::swap(&mut node.prev, &mut node.next);
            // The old `next` is now `prev`.
            cur = node.prev;
            if cur == head {
                break;
            }
        }
    }

    pub fn ring_depth(&self, ring: RingIdx) -> usize {
        let mut depth = 0;
        let mut cur = self.rings[ring.0].parent;
        while let Some(p) = cur {
            depth += 1;
            cur = self.rings[p.0].parent;
        }
        depth
    }

    /// Should this ring be a hole, judging by its place in the tree?
    pub fn ring_is_hole(&self, ring: RingIdx) -> bool {
        self.ring_depth(ring) % 2 == 1
    }

    /// Is `ring` strictly below `ancestor` in the tree?
    pub fn ring_is_descendant(&self, ring: RingIdx, ancestor: RingIdx) -> bool {
        let mut cur = self.rings[ring.0].parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.rings[p.0].parent;
        }
        false
    }

    /// Where `pt` lies relative to `ring`.
    pub fn point_in_polygon(&self, pt: Point, ring: RingIdx) -> PointInPolygon {
        let mut inside = false;
        for op in self.ring_nodes(ring) {
            let a = self.point(op);
            let b = self.point(self.points[op.0].next);
            if b.y == pt.y && (b.x == pt.x || (a.y == pt.y && ((b.x > pt.x) == (a.x < pt.x)))) {
                return PointInPolygon::OnBoundary;
            }
            if (a.y < pt.y) != (b.y < pt.y) {
                if a.x >= pt.x && b.x > pt.x {
                    inside = !inside;
                } else if a.x >= pt.x || b.x > pt.x {
                    let d = orientation(a, b, pt);
                    if d == 0.0 {
                        return PointInPolygon::OnBoundary;
                    }
                    if (d > 0.0) == (b.y > a.y) {
                        inside = !inside;
                    }
                }
            }
        }
        if inside {
            PointInPolygon::Inside
        } else {
            PointInPolygon::Outside
        }
    }

    /// Is `ring1` inside `ring2`? Shared boundary points are allowed.
    pub fn poly2_contains_poly1(&mut self, ring1: RingIdx, ring2: RingIdx) -> bool {
        let (Some(s1), Some(s2)) = (self.stats(ring1), self.stats(ring2)) else {
            return false;
        };
        if !s2.bbox.contains(&s1.bbox) || s1.area.abs() > s2.area.abs() {
            return false;
        }
        let nodes = self.ring_nodes(ring1);
        let vertices = nodes.iter().map(|&p| self.point(p));
        let midpoints = nodes.iter().map(|&p| {
            let a = self.point(p);
            let b = self.point(self.points[p.0].next);
            Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
        });
        for pt in vertices.chain(midpoints) {
            match self.point_in_polygon(pt, ring2) {
                PointInPolygon::Inside => return true,
                PointInPolygon::Outside => return false,
                PointInPolygon::OnBoundary => {}
            }
        }
        true
    }
}
