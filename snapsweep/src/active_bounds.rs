use crate::{
    bound::{Bound, BoundIdx},
    num::{greater_than, less_than, values_are_equal},
    Error, PolygonKind,
};

/// The bounds currently crossing the sweep line, ordered by x.
///
/// A bound that finishes in the middle of a scanbeam leaves a `None` behind,
/// so that positions stay valid until the list is compacted.
#[derive(Clone, Debug, Default)]
pub struct ActiveBounds {
    slots: Vec<Option<BoundIdx>>,
}

impl ActiveBounds {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// The bound at `pos`, or `None` if `pos` is retired or out of range.
    pub fn slot(&self, pos: usize) -> Option<BoundIdx> {
        self.slots.get(pos).copied().flatten()
    }

    /// The bound at `pos`, which must be live.
    pub fn get(&self, pos: usize) -> Result<BoundIdx, Error> {
        self.slot(pos)
            .ok_or_else(|| Error::out_of_range("active bound", pos, self.slots.len()))
    }

    pub fn position_of(&self, bound: BoundIdx) -> Option<usize> {
        self.slots.iter().position(|&b| b == Some(bound))
    }

    pub fn retire(&mut self, pos: usize) {
        if let Some(slot) = self.slots.get_mut(pos) {
            *slot = None;
        }
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
    }

    /// Removes the retired slots.
    pub fn compact(&mut self) {
        self.slots.retain(Option::is_some);
    }

    /// The live bounds, in order.
    pub fn live(&self) -> Vec<BoundIdx> {
        self.slots.iter().flatten().copied().collect()
    }

    /// Replaces the whole order. There must be no retired slots.
    pub fn set_order(&mut self, order: Vec<BoundIdx>) {
        self.slots = order.into_iter().map(Some).collect();
    }

    /// Inserts the two bounds of a local minimum next to each other, at the
    /// first position where `left` belongs, and returns the position of `left`.
    pub fn insert_pair(
        &mut self,
        bounds: &[Bound],
        left: BoundIdx,
        right: BoundIdx,
    ) -> Result<usize, Error> {
        let new = &bounds[left.0];
        let mut pos = self.slots.len();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(existing) = slot {
                if goes_before(new, &bounds[existing.0])? {
                    pos = i;
                    break;
                }
            }
        }
        self.slots.insert(pos, Some(left));
        self.slots.insert(pos + 1, Some(right));
        Ok(pos)
    }
}

/// Must the newly inserted bound `new` be placed before `existing`?
fn goes_before(new: &Bound, existing: &Bound) -> Result<bool, Error> {
    if !values_are_equal(new.current_x, existing.current_x) {
        return Ok(new.current_x < existing.current_x);
    }
    let new_edge = new.current_edge()?;
    let existing_edge = existing.current_edge()?;
    // Compare where the two edges are when the first of them ends.
    let ordered = if new_edge.top.y > existing_edge.top.y {
        less_than(new_edge.top.x, existing_edge.current_x(new_edge.top.y))
    } else {
        greater_than(existing_edge.top.x, new_edge.current_x(existing_edge.top.y))
    };
    let coincident = if new_edge.top.y > existing_edge.top.y {
        !greater_than(new_edge.top.x, existing_edge.current_x(new_edge.top.y))
    } else {
        !less_than(existing_edge.top.x, new_edge.current_x(existing_edge.top.y))
    };
    Ok(ordered
        || (coincident && new.poly_type == PolygonKind::Subject && existing.poly_type == PolygonKind::Clip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{tests::p, Edge};

    fn bound(a: (f64, f64), b: (f64, f64), kind: PolygonKind) -> Bound {
        Bound::new(vec![Edge::new(p(a.0, a.1), p(b.0, b.1))], kind)
    }

    #[test]
    fn insertion_order() {
        let bounds = vec![
            bound((0.0, 4.0), (0.0, 0.0), PolygonKind::Subject),
            bound((4.0, 4.0), (4.0, 0.0), PolygonKind::Subject),
            bound((2.0, 4.0), (1.0, 0.0), PolygonKind::Subject),
            bound((2.0, 4.0), (3.0, 0.0), PolygonKind::Subject),
        ];
        let mut abl = ActiveBounds::default();
        assert_eq!(abl.insert_pair(&bounds, BoundIdx(0), BoundIdx(1)).unwrap(), 0);
        assert_eq!(abl.insert_pair(&bounds, BoundIdx(2), BoundIdx(3)).unwrap(), 1);
        assert_eq!(
            abl.live(),
            vec![BoundIdx(0), BoundIdx(2), BoundIdx(3), BoundIdx(1)]
        );
    }

    #[test]
    fn ties_are_broken_by_direction() {
        // Both start at x = 1, but the existing bound heads left.
        let bounds = vec![
            bound((1.0, 4.0), (0.0, 0.0), PolygonKind::Subject),
            bound((1.0, 4.0), (5.0, 0.0), PolygonKind::Subject),
            bound((1.0, 4.0), (2.0, 0.0), PolygonKind::Subject),
            bound((1.0, 4.0), (3.0, 0.0), PolygonKind::Subject),
        ];
        let mut abl = ActiveBounds::default();
        abl.insert_pair(&bounds, BoundIdx(0), BoundIdx(1)).unwrap();
        assert_eq!(abl.insert_pair(&bounds, BoundIdx(2), BoundIdx(3)).unwrap(), 1);
    }

    #[test]
    fn subject_before_clip_when_coincident() {
        let bounds = vec![
            bound((1.0, 4.0), (1.0, 0.0), PolygonKind::Clip),
            bound((3.0, 4.0), (3.0, 0.0), PolygonKind::Clip),
            bound((1.0, 4.0), (1.0, 0.0), PolygonKind::Subject),
            bound((3.0, 4.0), (3.0, 0.0), PolygonKind::Subject),
        ];
        let mut abl = ActiveBounds::default();
        abl.insert_pair(&bounds, BoundIdx(0), BoundIdx(1)).unwrap();
        assert_eq!(abl.insert_pair(&bounds, BoundIdx(2), BoundIdx(3)).unwrap(), 0);
    }

    #[test]
    fn retire_and_compact() {
        let mut abl = ActiveBounds::default();
        abl.set_order(vec![BoundIdx(3), BoundIdx(1), BoundIdx(2)]);
        abl.retire(1);
        assert_eq!(abl.slot(1), None);
        assert!(matches!(
            abl.get(1),
            Err(Error::OutOfRange { what: "active bound", index: 1, len: 3 })
        ));
        assert_eq!(abl.position_of(BoundIdx(2)), Some(2));
        abl.compact();
        assert_eq!(abl.live(), vec![BoundIdx(3), BoundIdx(2)]);
        assert_eq!(abl.position_of(BoundIdx(2)), Some(1));
    }
}
