//! The boolean operation engine.

use tracing::{debug, instrument};

use crate::{
    geom::{BBox, Point},
    local_minimum::LocalMinimumList,
    num::Grid,
    output::{MultiPolygon, Polygon},
    sweep::Sweep,
    winding::Rules,
    BooleanOp, ClipOptions, Error, FillRule, PolygonKind,
};

/// Collects subject and clip rings and computes boolean operations on them.
///
/// Rings are snapped to the grid and split into bounds as they are added, so
/// an engine can be executed any number of times with different operations.
///
/// ```
/// use snapsweep::{Clipper, PolygonKind};
///
/// let mut clipper = Clipper::new();
/// clipper.add_ring([(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)], PolygonKind::Subject)?;
/// clipper.add_ring([(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)], PolygonKind::Clip)?;
/// assert_eq!(clipper.intersection()?.area(), 1.0);
/// assert_eq!(clipper.union()?.area(), 7.0);
/// # Ok::<(), snapsweep::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Clipper {
    minima: LocalMinimumList,
    options: ClipOptions,
    grid: Grid,
}

impl Default for Clipper {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipper {
    /// An empty engine with the default options.
    pub fn new() -> Self {
        Clipper {
            minima: LocalMinimumList::default(),
            options: ClipOptions::default(),
            grid: Grid::default(),
        }
    }

    /// An empty engine with the given options.
    ///
    /// Fails if the options describe an invalid snapping grid.
    pub fn with_options(options: ClipOptions) -> Result<Self, Error> {
        Ok(Clipper {
            minima: LocalMinimumList::default(),
            grid: options.grid()?,
            options,
        })
    }

    /// The options this engine was built with.
    pub fn options(&self) -> &ClipOptions {
        &self.options
    }

    /// Adds a closed ring. The last point may or may not repeat the first.
    ///
    /// Returns `Ok(false)` if the ring was ignored because it is degenerate
    /// once snapped (fewer than three distinct, non-collinear vertices).
    pub fn add_ring<P: Into<Point>>(
        &mut self,
        points: impl IntoIterator<Item = P>,
        kind: PolygonKind,
    ) -> Result<bool, Error> {
        let points: Vec<Point> = points.into_iter().map(Into::into).collect();
        self.minima.add_ring(&points, kind, &self.grid)
    }

    /// Adds every ring of a polygon. Returns `Ok(true)` if any of them was
    /// kept.
    pub fn add_polygon(&mut self, polygon: &Polygon, kind: PolygonKind) -> Result<bool, Error> {
        let mut added = false;
        for ring in &polygon.rings {
            added |= self.add_ring(ring.iter().copied(), kind)?;
        }
        Ok(added)
    }

    /// The bounding box of the snapped input, if there is any.
    pub fn bbox(&self) -> Option<BBox> {
        self.minima.bbox()
    }

    /// Removes all the rings added so far.
    pub fn clear(&mut self) {
        self.minima.clear();
    }

    /// Computes a boolean operation between the subject and clip rings.
    #[instrument(skip(self), fields(minima = self.minima.len()))]
    pub fn execute(
        &self,
        op: BooleanOp,
        subject_fill: FillRule,
        clip_fill: FillRule,
    ) -> Result<MultiPolygon, Error> {
        if self.minima.is_empty() {
            return Ok(MultiPolygon::default());
        }
        let rules = Rules::new(op, subject_fill, clip_fill);
        let mut rings = Sweep::new(&self.minima, rules, self.grid).run()?;
        rings.correct_topology()?;
        let result = rings.build_result(self.options.reverse_output);
        debug!(polygons = result.len(), "finished boolean operation");
        Ok(result)
    }

    /// The union of the subject and the clip, with even-odd filling.
    pub fn union(&self) -> Result<MultiPolygon, Error> {
        self.execute(BooleanOp::Union, FillRule::EvenOdd, FillRule::EvenOdd)
    }

    /// The intersection of the subject and the clip, with even-odd filling.
    pub fn intersection(&self) -> Result<MultiPolygon, Error> {
        self.execute(BooleanOp::Intersection, FillRule::EvenOdd, FillRule::EvenOdd)
    }

    /// The subject minus the clip, with even-odd filling.
    pub fn difference(&self) -> Result<MultiPolygon, Error> {
        self.execute(BooleanOp::Difference, FillRule::EvenOdd, FillRule::EvenOdd)
    }

    /// The symmetric difference of the subject and the clip, with even-odd filling.
    pub fn xor(&self) -> Result<MultiPolygon, Error> {
        self.execute(BooleanOp::Xor, FillRule::EvenOdd, FillRule::EvenOdd)
    }
}
