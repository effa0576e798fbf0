#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod active_bounds;
mod bound;
mod clipper;
mod error;
mod geom;
mod horizontal;
mod hot_pixels;
mod intersect;
mod local_minimum;
mod num;
mod options;
mod output;
mod ring;
mod scanbeam;
mod sweep;
mod topology;
mod winding;

pub use clipper::Clipper;
pub use error::Error;
pub use geom::{BBox, Point};
pub use options::{BooleanOp, ClipOptions, FillRule, PolygonKind};
pub use output::{ring_area, MultiPolygon, Polygon};

/// Computes a boolean operation between two sets, each of which is described
/// as a collection of closed polylines.
///
/// The snapping grid is chosen from the largest coordinate in the input, so
/// that very large and very small geometries keep the same relative precision.
pub fn boolean_op(
    set_a: &[Vec<(f64, f64)>],
    set_b: &[Vec<(f64, f64)>],
    fill_rule: FillRule,
    op: BooleanOp,
) -> Result<MultiPolygon, Error> {
    let mut max_abs: f64 = 0.0;
    for &(x, y) in set_a.iter().chain(set_b).flatten() {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::NonFinite { x, y });
        }
        max_abs = max_abs.max(x.abs()).max(y.abs());
    }

    let mut clipper = Clipper::with_options(ClipOptions::for_magnitude(max_abs))?;
    for ring in set_a {
        clipper.add_ring(ring.iter().copied(), PolygonKind::Subject)?;
    }
    for ring in set_b {
        clipper.add_ring(ring.iter().copied(), PolygonKind::Clip)?;
    }
    clipper.execute(op, fill_rule, fill_rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Rotates each closed ring to start at its smallest point.
    fn normalized(mut output: MultiPolygon) -> MultiPolygon {
        for ring in output.polygons.iter_mut().flat_map(|p| p.rings.iter_mut()) {
            ring.pop();
            let start = (0..ring.len())
                .min_by(|&i, &j| {
                    ring[i]
                        .x
                        .total_cmp(&ring[j].x)
                        .then(ring[i].y.total_cmp(&ring[j].y))
                })
                .unwrap_or(0);
            ring.rotate_left(start);
            if let Some(&first) = ring.first() {
                ring.push(first);
            }
        }
        output
    }

    #[test]
    fn two_squares() {
        let a = [vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]];
        let b = [vec![(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]];
        let output = boolean_op(&a, &b, FillRule::EvenOdd, BooleanOp::Intersection).unwrap();

        insta::assert_debug_snapshot!(normalized(output), @r"
        MultiPolygon {
            polygons: [
                Polygon {
                    rings: [
                        [
                            (0.0, 0.0),
                            (0.5, 0.0),
                            (0.5, 0.5),
                            (0.0, 0.5),
                            (0.0, 0.0),
                        ],
                    ],
                },
            ],
        }
        ");
    }

    #[test]
    fn non_finite_input() {
        let a = [vec![(0.0, 0.0), (f64::INFINITY, 0.0), (1.0, 1.0)]];
        assert_eq!(
            boolean_op(&a, &[], FillRule::NonZero, BooleanOp::Union),
            Err(Error::NonFinite {
                x: f64::INFINITY,
                y: 0.0
            })
        );
    }

    #[test]
    fn huge_coordinates() {
        let s = 2.0f64.powi(40);
        let a = [vec![(0.0, 0.0), (2.0 * s, 0.0), (2.0 * s, 2.0 * s), (0.0, 2.0 * s)]];
        let b = [vec![(s, s), (3.0 * s, s), (3.0 * s, 3.0 * s), (s, 3.0 * s)]];
        let output = boolean_op(&a, &b, FillRule::NonZero, BooleanOp::Intersection).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.area(), s * s);
    }
}
