//! Turning the raw rings of the sweep into valid polygons.
//!
//! The sweep nests its rings correctly, but the point order of a ring need
//! not agree with its place in the tree. Its rings can also contain spikes,
//! collinear runs and vertices that the ring visits twice, and two rings can
//! run along the same edge in opposite directions. The passes here first
//! orient every ring by its depth, then clean the rings up, split and merge
//! them until every ring is simple and no edge is shared, and finally
//! rebuild the ring tree so that every hole sits inside the smallest solid
//! that contains it.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::{
    geom::points_collinear,
    ring::{PointIdx, RingIdx, RingManager},
    Error,
};

type Location = (u64, u64);

impl RingManager {
    /// Cleans up the rings and fixes up their nesting and orientation.
    #[instrument(skip(self), fields(rings = self.rings.len(), points = self.points.len()))]
    pub fn correct_topology(&mut self) -> Result<(), Error> {
        self.correct_orientations();
        self.remove_spikes_and_collinear_points();
        self.correct_self_intersections()?;
        self.correct_tree()?;

        let mut rounds = 0;
        while self.correct_chained_rings() {
            rounds += 1;
            self.correct_self_intersections()?;
            self.correct_tree()?;
        }
        if rounds > 0 {
            // Points that touched a ring merged away since the first pass.
            self.remove_spikes_and_collinear_points();
        }
        debug!(rings = self.live_rings().len(), rounds, "corrected topology");
        Ok(())
    }

    /// How many live points sit at each location.
    fn location_counts(&self) -> HashMap<Location, usize> {
        let mut counts = HashMap::new();
        for ring in self.live_rings() {
            for p in self.ring_nodes(ring) {
                *counts.entry(self.point(p).key()).or_default() += 1;
            }
        }
        counts
    }

    #[instrument(skip(self))]
    fn remove_spikes_and_collinear_points(&mut self) {
        let mut counts = self.location_counts();
        for ring in self.live_rings() {
            self.simplify_ring(ring, &mut counts);
        }
    }

    /// Removes repeated points, spike tips, and collinear points at locations
    /// that no other point shares. Returns `false` if the ring was too small
    /// to survive.
    fn simplify_ring(&mut self, ring: RingIdx, counts: &mut HashMap<Location, usize>) -> bool {
        let Some(head) = self.rings[ring.0].points else {
            return false;
        };
        let mut size = self.ring_nodes(ring).len();

        let mut cur = head;
        let mut unchanged = 0;
        while size >= 3 && unchanged < size {
            let node = &self.points[cur.0];
            let (prev_idx, next_idx) = (node.prev, node.next);
            let pt = node.point();
            let prev = self.point(prev_idx);
            let next = self.point(next_idx);
            let touches = counts.get(&pt.key()).is_some_and(|&c| c > 1);
            if pt == next || prev == next || (!touches && points_collinear(prev, pt, next)) {
                self.unlink_point(ring, cur);
                if let Some(c) = counts.get_mut(&pt.key()) {
                    *c = c.saturating_sub(1);
                }
                size -= 1;
                cur = prev_idx;
                unchanged = 0;
            } else {
                cur = next_idx;
                unchanged += 1;
            }
        }

        if size < 3 {
            for p in self.ring_nodes(ring) {
                if let Some(c) = counts.get_mut(&self.point(p).key()) {
                    *c = c.saturating_sub(1);
                }
            }
            self.drop_ring(ring);
            return false;
        }
        self.reset_stats(ring);
        true
    }

    fn unlink_point(&mut self, ring: RingIdx, idx: PointIdx) {
        let (prev, next) = (self.points[idx.0].prev, self.points[idx.0].next);
        self.points[prev.0].next = next;
        self.points[next.0].prev = prev;
        self.points[idx.0].ring = None;
        self.points[idx.0].prev = idx;
        self.points[idx.0].next = idx;
        let r = &mut self.rings[ring.0];
        if r.points == Some(idx) {
            r.points = (next != idx).then_some(next);
        }
        if r.bottom_point == Some(idx) {
            r.bottom_point = None;
        }
        self.reset_stats(ring);
    }

    /// Removes a ring and its points, handing its children to its parent.
    fn drop_ring(&mut self, ring: RingIdx) {
        let parent = self.rings[ring.0].parent;
        let kids = std::mem::take(&mut self.rings[ring.0].children);
        for kid in kids.into_iter().flatten() {
            self.rings[kid.0].parent = parent;
            self.set_to_children(parent, kid);
        }
        for p in self.ring_nodes(ring) {
            self.points[p.0].ring = None;
        }
        self.rings[ring.0].bottom_point = None;
        self.remove_ring(ring, false, true);
    }

    /// Splits every ring that visits the same location twice into two rings,
    /// until no ring does.
    #[instrument(skip(self))]
    fn correct_self_intersections(&mut self) -> Result<(), Error> {
        let mut counts = self.location_counts();
        let mut work = self.live_rings();
        let mut splits = 0;
        while let Some(ring) = work.pop() {
            let Some((a, b)) = self.find_repeated_point(ring) else {
                continue;
            };
            let parent = self.rings[ring.0].parent;
            let new_ring = self.split_ring(ring, a, b);
            splits += 1;

            let ring_survives = self.simplify_ring(ring, &mut counts);
            let new_survives = self.simplify_ring(new_ring, &mut counts);
            if new_survives {
                if ring_survives {
                    if self.is_hole(new_ring) == self.is_hole(ring) {
                        self.assign_as_sibling(new_ring, ring)?;
                    } else {
                        self.assign_as_child(new_ring, Some(ring))?;
                    }
                } else {
                    // The tree pass checks the orientation against the new parent.
                    self.rings[new_ring.0].parent = parent;
                    self.set_to_children(parent, new_ring);
                }
                work.push(new_ring);
            }
            if ring_survives {
                work.push(ring);
            }
        }
        debug!(splits, "split self-intersecting rings");
        Ok(())
    }

    /// Two points of the ring at the same location, in ring order.
    fn find_repeated_point(&self, ring: RingIdx) -> Option<(PointIdx, PointIdx)> {
        let mut seen: HashMap<Location, PointIdx> = HashMap::new();
        for p in self.ring_nodes(ring) {
            if let Some(&first) = seen.get(&self.point(p).key()) {
                return Some((first, p));
            }
            seen.insert(self.point(p).key(), p);
        }
        None
    }

    // Cuts the ring at the two copies of a repeated location. `ring` keeps the
    // loop through `a`, and a new ring gets the loop through `b`.
    fn split_ring(&mut self, ring: RingIdx, a: PointIdx, b: PointIdx) -> RingIdx {
        let a_next = self.points[a.0].next;
        let b_next = self.points[b.0].next;
        self.points[a.0].next = b_next;
        self.points[b_next.0].prev = a;
        self.points[b.0].next = a_next;
        self.points[a_next.0].prev = b;

        let new_ring = self.create_ring();
        self.rings[ring.0].points = Some(a);
        self.rings[ring.0].bottom_point = None;
        self.rings[new_ring.0].points = Some(b);
        self.update_points_ring(new_ring);
        self.reset_stats(ring);
        self.reset_stats(new_ring);
        new_ring
    }

    fn edge_key(&self, p: PointIdx) -> (Location, Location) {
        (self.point(p).key(), self.point(self.points[p.0].next).key())
    }

    /// Merges every pair of rings that run along the same edge in opposite
    /// directions. The area on both sides of such an edge is filled, so the
    /// edge goes away and the two rings become one.
    ///
    /// Returns whether anything was merged. Merging can leave a ring that
    /// visits a location twice, or that shares an edge with yet another ring,
    /// so the caller repeats the other passes until nothing changes.
    #[instrument(skip(self))]
    fn correct_chained_rings(&mut self) -> bool {
        let mut counts = self.location_counts();
        let mut edges: HashMap<(Location, Location), PointIdx> = HashMap::new();
        for ring in self.live_rings() {
            for p in self.ring_nodes(ring) {
                edges.insert(self.edge_key(p), p);
            }
        }

        let mut merges = 0;
        for ring in self.live_rings() {
            for p in self.ring_nodes(ring) {
                let Some(r1) = self.points[p.0].ring else {
                    continue;
                };
                let (from, to) = self.edge_key(p);
                let Some(&q) = edges.get(&(to, from)) else {
                    continue;
                };
                // The map is not updated as rings merge, so check that `q`
                // still runs backwards along this edge.
                match self.points[q.0].ring {
                    Some(r2) if r2 != r1 && self.edge_key(q) == (to, from) => {
                        self.merge_chained_rings(p, q, &mut counts);
                        merges += 1;
                    }
                    _ => {}
                }
            }
        }
        debug!(merges, "merged rings sharing an edge");
        merges > 0
    }

    // `n1` runs from `a` to `b` in one ring and `n2` runs from `b` to `a` in
    // another. Relinking at `a` makes one ring with a spike along `a-b`, which
    // simplifying then removes.
    fn merge_chained_rings(&mut self, n1: PointIdx, n2: PointIdx, counts: &mut HashMap<Location, usize>) {
        let (Some(r1), Some(r2)) = (self.points[n1.0].ring, self.points[n2.0].ring) else {
            return;
        };
        let m1 = self.points[n1.0].next;
        let m2 = self.points[n2.0].next;
        let after = self.points[m2.0].next;
        self.points[n1.0].next = after;
        self.points[after.0].prev = n1;
        self.points[m2.0].next = m1;
        self.points[m1.0].prev = m2;

        // The shallower ring is the outer one of the two, so it keeps its place.
        let (keep, gone) = if self.ring_depth(r2) < self.ring_depth(r1) {
            (r2, r1)
        } else {
            (r1, r2)
        };
        self.ring1_replaces_ring2(Some(keep), gone);
        self.rings[keep.0].points = Some(n1);
        self.rings[keep.0].bottom_point = None;
        self.update_points_ring(keep);
        self.reset_stats(keep);
        self.simplify_ring(keep, counts);
    }

    /// Re-parents every ring according to the geometry of the rings alone.
    #[instrument(skip(self))]
    fn correct_tree(&mut self) -> Result<(), Error> {
        let mut live = self.live_rings();
        live.retain(|&r| {
            if self.size(r) < 3 || self.area(r) == 0.0 {
                self.remove_ring_and_points(r, false, true);
                false
            } else {
                true
            }
        });
        self.remove_duplicate_rings(&mut live);

        live.sort_by(|&a, &b| {
            let area_a = self.area(a).abs();
            let area_b = self.area(b).abs();
            area_b.total_cmp(&area_a)
        });

        let mut placed: Vec<RingIdx> = Vec::with_capacity(live.len());
        let mut orphans = 0;
        for ring in live {
            let is_hole = self.is_hole(ring);
            let mut parent = None;
            for &candidate in placed.iter().rev() {
                if self.is_hole(candidate) != is_hole && self.poly2_contains_poly1(ring, candidate) {
                    parent = Some(candidate);
                    break;
                }
            }
            if parent.is_none() && is_hole {
                orphans += 1;
                self.drop_ring(ring);
                continue;
            }
            self.reassign_as_child(ring, parent)?;
            self.rings[ring.0].bottom_point = self.find_bottom_point(ring);
            placed.push(ring);
        }
        if orphans > 0 {
            debug!(orphans, "dropped holes outside every solid");
        }
        Ok(())
    }

    // Two rings through exactly the same vertices cancel out if they are
    // oriented differently; otherwise one of them is enough.
    fn remove_duplicate_rings(&mut self, live: &mut Vec<RingIdx>) {
        let mut shapes: HashMap<Vec<Location>, RingIdx> = HashMap::new();
        let mut removed = Vec::new();
        for &ring in live.iter() {
            let shape = self.canonical_shape(ring);
            match shapes.get(&shape).copied() {
                Some(other) if !removed.contains(&other) => {
                    if self.is_hole(other) != self.is_hole(ring) {
                        removed.push(other);
                        shapes.remove(&shape);
                    }
                    removed.push(ring);
                }
                _ => {
                    shapes.insert(shape, ring);
                }
            }
        }
        for &ring in &removed {
            self.remove_ring_and_points(ring, false, true);
        }
        live.retain(|r| !removed.contains(r));
    }

    // The ring's vertex locations starting from the smallest one, in
    // whichever direction gives the smaller sequence.
    fn canonical_shape(&self, ring: RingIdx) -> Vec<Location> {
        let keys: Vec<_> = self
            .ring_nodes(ring)
            .into_iter()
            .map(|p| self.point(p).key())
            .collect();
        let Some(start) = keys
            .iter()
            .enumerate()
            .min_by_key(|(_, k)| **k)
            .map(|(i, _)| i)
        else {
            return keys;
        };
        let n = keys.len();
        let forward: Vec<_> = (0..n).map(|i| keys[(start + i) % n]).collect();
        let backward: Vec<_> = (0..n).map(|i| keys[(start + n - i) % n]).collect();
        forward.min(backward)
    }

    // The first point the sweep line reaches: largest y, then smallest x.
    fn find_bottom_point(&self, ring: RingIdx) -> Option<PointIdx> {
        self.ring_nodes(ring).into_iter().max_by(|&a, &b| {
            let (pa, pb) = (self.point(a), self.point(b));
            pa.y.total_cmp(&pb.y).then(pb.x.total_cmp(&pa.x))
        })
    }

    /// Reverses the rings whose orientation disagrees with their depth in the tree.
    #[instrument(skip(self))]
    fn correct_orientations(&mut self) {
        for ring in self.live_rings() {
            if self.ring_is_hole(ring) != self.is_hole(ring) {
                if let Some(head) = self.rings[ring.0].points {
                    self.reverse_ring(head);
                    self.reset_stats(ring);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        geom::tests::p,
        num::Grid,
        ring::{
            tests::{ring_from, solid_square},
            RingIdx, RingManager,
        },
    };

    fn hole_square(rings: &mut RingManager, x0: f64, y0: f64, x1: f64, y1: f64) -> RingIdx {
        ring_from(rings, &[p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)])
    }

    // Puts a ring in the tree without looking at its orientation.
    fn place(rings: &mut RingManager, ring: RingIdx, parent: Option<RingIdx>) {
        rings.rings[ring.0].parent = parent;
        rings.set_to_children(parent, ring);
    }

    #[test]
    fn spikes_and_collinear_points() {
        let mut rings = RingManager::new(Grid::default());
        let spiky = ring_from(
            &mut rings,
            &[p(0.0, 0.0), p(0.0, 2.0), p(2.0, 2.0), p(2.0, 0.0), p(3.0, 0.0), p(2.0, 0.0)],
        );
        let collinear = ring_from(
            &mut rings,
            &[p(5.0, 0.0), p(5.0, 1.0), p(5.0, 2.0), p(7.0, 2.0), p(7.0, 0.0)],
        );
        let flat = ring_from(&mut rings, &[p(9.0, 0.0), p(9.0, 1.0), p(9.0, 2.0)]);
        for r in [spiky, collinear, flat] {
            place(&mut rings, r, None);
        }
        rings.correct_topology().unwrap();

        assert_eq!(
            rings.ring_points(spiky),
            vec![p(0.0, 0.0), p(0.0, 2.0), p(2.0, 2.0), p(2.0, 0.0)]
        );
        assert_eq!(rings.size(collinear), 4);
        assert_eq!(rings.area(collinear), 4.0);
        assert!(rings.rings[flat.0].points.is_none());
        assert_eq!(rings.live_rings(), vec![spiky, collinear]);
    }

    #[test]
    fn touching_points_are_kept() {
        let mut rings = RingManager::new(Grid::default());
        // The middle of the left square's right side is the tip of the triangle.
        let square = ring_from(
            &mut rings,
            &[p(0.0, 0.0), p(0.0, 2.0), p(2.0, 2.0), p(2.0, 1.0), p(2.0, 0.0)],
        );
        let triangle = ring_from(&mut rings, &[p(2.0, 1.0), p(4.0, 2.0), p(4.0, 0.0)]);
        place(&mut rings, square, None);
        place(&mut rings, triangle, None);
        rings.correct_topology().unwrap();

        assert_eq!(rings.size(square), 5);
        assert_eq!(rings.size(triangle), 3);
        assert_eq!(rings.live_rings(), vec![square, triangle]);
    }

    #[test]
    fn figure_eight_is_split() {
        let mut rings = RingManager::new(Grid::default());
        let ring = ring_from(
            &mut rings,
            &[
                p(0.0, 0.0),
                p(0.0, 2.0),
                p(2.0, 2.0),
                p(2.0, 4.0),
                p(4.0, 4.0),
                p(4.0, 2.0),
                p(2.0, 2.0),
                p(2.0, 0.0),
            ],
        );
        place(&mut rings, ring, None);
        rings.correct_topology().unwrap();

        let live = rings.live_rings();
        assert_eq!(live.len(), 2);
        for r in live {
            assert_eq!(rings.area(r), 4.0);
            assert_eq!(rings.size(r), 4);
            assert_eq!(rings.rings[r.0].parent, None);
            assert!(rings.rings[r.0].bottom_point.is_some());
        }
        assert_eq!(rings.children_of(None).iter().flatten().count(), 2);
    }

    #[test]
    fn orientation_follows_depth() {
        let mut rings = RingManager::new(Grid::default());
        let outer = hole_square(&mut rings, 0.0, 0.0, 4.0, 4.0);
        let hole = solid_square(&mut rings, 1.0, 1.0, 3.0, 3.0);
        let island = hole_square(&mut rings, 1.5, 1.5, 2.5, 2.5);
        let stray = solid_square(&mut rings, 10.0, 10.0, 11.0, 11.0);
        place(&mut rings, outer, None);
        place(&mut rings, hole, Some(outer));
        place(&mut rings, island, Some(hole));
        // A hole of `outer` that lies outside it.
        place(&mut rings, stray, Some(outer));
        rings.correct_topology().unwrap();

        assert_eq!(rings.area(outer), 16.0);
        assert_eq!(rings.area(hole), -4.0);
        assert_eq!(rings.area(island), 1.0);
        assert_eq!(rings.rings[outer.0].parent, None);
        assert_eq!(rings.rings[hole.0].parent, Some(outer));
        assert_eq!(rings.rings[island.0].parent, Some(hole));
        assert!(rings.rings[stray.0].points.is_none());
        assert_eq!(
            rings.rings[outer.0].bottom_point.map(|b| rings.point(b)),
            Some(p(0.0, 4.0))
        );
    }

    #[test]
    fn holes_move_to_the_smallest_container() {
        let mut rings = RingManager::new(Grid::default());
        let outer = solid_square(&mut rings, 0.0, 0.0, 10.0, 10.0);
        let inner = solid_square(&mut rings, 1.0, 1.0, 5.0, 5.0);
        let big_hole = hole_square(&mut rings, 0.5, 0.5, 9.5, 9.5);
        let small_hole = hole_square(&mut rings, 2.0, 2.0, 3.0, 3.0);
        place(&mut rings, outer, None);
        place(&mut rings, big_hole, Some(outer));
        place(&mut rings, inner, Some(big_hole));
        // The sweep put this one in the wrong solid.
        place(&mut rings, small_hole, Some(outer));
        rings.correct_topology().unwrap();

        assert_eq!(rings.rings[small_hole.0].parent, Some(inner));
        assert_eq!(rings.rings[inner.0].parent, Some(big_hole));
        assert_eq!(rings.children_of(Some(outer)).iter().flatten().count(), 1);
    }

    #[test]
    fn duplicate_rings() {
        let mut rings = RingManager::new(Grid::default());
        let a = solid_square(&mut rings, 0.0, 0.0, 1.0, 1.0);
        let b = solid_square(&mut rings, 0.0, 0.0, 1.0, 1.0);
        let c = solid_square(&mut rings, 5.0, 0.0, 6.0, 1.0);
        let d = hole_square(&mut rings, 5.0, 0.0, 6.0, 1.0);
        place(&mut rings, a, None);
        place(&mut rings, b, None);
        place(&mut rings, c, None);
        place(&mut rings, d, Some(c));
        rings.correct_topology().unwrap();
        assert_eq!(rings.live_rings(), vec![a]);
        for r in [b, c, d] {
            assert!(rings.rings[r.0].points.is_none());
        }
    }

    #[test]
    fn rings_sharing_an_edge_merge() {
        let mut rings = RingManager::new(Grid::default());
        let left = solid_square(&mut rings, 0.0, 0.0, 2.0, 2.0);
        let right = solid_square(&mut rings, 2.0, 0.0, 4.0, 2.0);
        place(&mut rings, left, None);
        place(&mut rings, right, None);
        rings.correct_topology().unwrap();

        let live = rings.live_rings();
        assert_eq!(live.len(), 1);
        assert_eq!(rings.area(live[0]), 8.0);
        let mut pts = rings.ring_points(live[0]);
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        assert_eq!(pts, vec![p(0.0, 0.0), p(0.0, 2.0), p(4.0, 0.0), p(4.0, 2.0)]);
        assert_eq!(rings.children_of(None).iter().flatten().count(), 1);
    }

    #[test]
    fn partly_shared_edge_merges() {
        let mut rings = RingManager::new(Grid::default());
        // Each ring already has a vertex where the other's corner touches it.
        let top = ring_from(
            &mut rings,
            &[p(5.0, 4.0), p(5.0, 8.0), p(13.0, 8.0), p(13.0, 5.0), p(13.0, 4.0)],
        );
        let bottom = ring_from(
            &mut rings,
            &[p(13.0, 1.0), p(13.0, 4.0), p(13.0, 5.0), p(15.0, 5.0), p(15.0, 1.0)],
        );
        place(&mut rings, top, None);
        place(&mut rings, bottom, None);
        rings.correct_topology().unwrap();

        let live = rings.live_rings();
        assert_eq!(live.len(), 1);
        assert_eq!(rings.area(live[0]), 32.0 + 8.0);
        assert_eq!(rings.size(live[0]), 8);
    }

    #[test]
    fn enclosed_gap_becomes_a_hole() {
        let mut rings = RingManager::new(Grid::default());
        // A U shape closed off by a bar along its top.
        let u = ring_from(
            &mut rings,
            &[
                p(0.0, 0.0),
                p(0.0, 3.0),
                p(1.0, 3.0),
                p(1.0, 1.0),
                p(2.0, 1.0),
                p(2.0, 3.0),
                p(3.0, 3.0),
                p(3.0, 0.0),
            ],
        );
        let bar = solid_square(&mut rings, 0.0, 3.0, 3.0, 4.0);
        place(&mut rings, u, None);
        place(&mut rings, bar, None);
        rings.correct_topology().unwrap();

        let live = rings.live_rings();
        assert_eq!(live.len(), 2);
        let (mut solids, mut holes) = (Vec::new(), Vec::new());
        for r in live {
            if rings.is_hole(r) {
                holes.push(r);
            } else {
                solids.push(r);
            }
        }
        assert_eq!(solids.len(), 1);
        assert_eq!(holes.len(), 1);
        assert_eq!(rings.area(solids[0]), 12.0);
        assert_eq!(rings.area(holes[0]), -2.0);
        assert_eq!(rings.rings[holes[0].0].parent, Some(solids[0]));
    }
}
