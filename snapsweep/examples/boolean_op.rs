use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use kurbo::DEFAULT_ACCURACY;
use snapsweep::{BooleanOp, ClipOptions, Clipper, FillRule, MultiPolygon, Point, PolygonKind};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug)]
struct Op(BooleanOp);

impl FromStr for Op {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "union" => Ok(Op(BooleanOp::Union)),
            "intersection" => Ok(Op(BooleanOp::Intersection)),
            "difference" => Ok(Op(BooleanOp::Difference)),
            "xor" => Ok(Op(BooleanOp::Xor)),
            _ => Err(format!("unknown op {s}")),
        }
    }
}

/// Computes a boolean operation between the paths of an SVG file. The first
/// path is the subject and all the others are the clip.
#[derive(Parser)]
struct Args {
    input: PathBuf,
    output: PathBuf,

    #[arg(long)]
    op: Op,

    #[arg(long)]
    non_zero: bool,

    /// Snapping grid cells per unit; by default, chosen from the input's extent.
    #[arg(long)]
    scale: Option<f64>,

    #[arg(long)]
    reverse_output: bool,
}

/// Flattens every path in the tree into closed rings, one list per path.
fn svg_to_rings(tree: &usvg::Tree) -> Vec<Vec<Vec<Point>>> {
    let mut ret = Vec::new();

    fn pt(p: usvg::tiny_skia_path::Point) -> kurbo::Point {
        kurbo::Point::new(p.x as f64, p.y as f64)
    }

    fn add_group(group: &usvg::Group, ret: &mut Vec<Vec<Vec<Point>>>) {
        for child in group.children() {
            match child {
                usvg::Node::Group(group) => add_group(group, ret),
                usvg::Node::Path(path) => {
                    let kurbo_els = path.data().segments().map(|seg| match seg {
                        usvg::tiny_skia_path::PathSegment::MoveTo(p) => {
                            kurbo::PathEl::MoveTo(pt(p))
                        }
                        usvg::tiny_skia_path::PathSegment::LineTo(p) => {
                            kurbo::PathEl::LineTo(pt(p))
                        }
                        usvg::tiny_skia_path::PathSegment::QuadTo(p0, p1) => {
                            kurbo::PathEl::QuadTo(pt(p0), pt(p1))
                        }
                        usvg::tiny_skia_path::PathSegment::CubicTo(p0, p1, p2) => {
                            kurbo::PathEl::CurveTo(pt(p0), pt(p1), pt(p2))
                        }
                        usvg::tiny_skia_path::PathSegment::Close => kurbo::PathEl::ClosePath,
                    });

                    let mut rings = Vec::new();
                    let mut points = Vec::<Point>::new();
                    kurbo::flatten(kurbo_els, DEFAULT_ACCURACY, |el| match el {
                        kurbo::PathEl::MoveTo(p) => {
                            if points.len() > 2 {
                                rings.push(std::mem::take(&mut points));
                            }
                            points.clear();
                            points.push(Point::new(p.x, p.y));
                        }
                        kurbo::PathEl::LineTo(p) => {
                            points.push(Point::new(p.x, p.y));
                        }
                        kurbo::PathEl::ClosePath => {
                            let first = points.first().copied();
                            if points.len() > 2 {
                                rings.push(std::mem::take(&mut points));
                            }
                            points.clear();
                            points.extend(first);
                        }
                        kurbo::PathEl::QuadTo(..) | kurbo::PathEl::CurveTo(..) => unreachable!(),
                    });
                    if points.len() > 2 {
                        rings.push(points);
                    }
                    ret.push(rings);
                }
                _ => {}
            }
        }
    }

    add_group(tree.root(), &mut ret);
    ret
}

fn to_document(output: &MultiPolygon) -> svg::Document {
    let Some(bbox) = output.bbox() else {
        return svg::Document::new();
    };
    let pad = 1.0;
    let mut document = svg::Document::new().set(
        "viewBox",
        (
            bbox.min.x - pad,
            bbox.min.y - pad,
            bbox.max.x - bbox.min.x + 2.0 * pad,
            bbox.max.y - bbox.min.y + 2.0 * pad,
        ),
    );

    for poly in output {
        let mut data = svg::node::element::path::Data::new();
        for ring in &poly.rings {
            let mut ring = ring.iter();
            let Some(p) = ring.next() else {
                continue;
            };
            data = data.move_to((p.x, p.y));
            for p in ring {
                data = data.line_to((p.x, p.y));
            }
            data = data.close();
        }
        let path = svg::node::element::Path::new()
            .set("d", data)
            .set("fill", "black")
            .set("fill-rule", "evenodd");
        document = document.add(path);
    }
    document
}

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let input = std::fs::read_to_string(&args.input)?;
    let tree = usvg::Tree::from_str(&input, &usvg::Options::default())?;
    let paths = svg_to_rings(&tree);

    let max_abs = paths
        .iter()
        .flatten()
        .flatten()
        .fold(0.0f64, |m, p| m.max(p.x.abs()).max(p.y.abs()));
    let options = match args.scale {
        Some(scale) => ClipOptions::default().with_scale(scale),
        None => ClipOptions::for_magnitude(max_abs),
    }
    .with_reverse_output(args.reverse_output);

    let mut clipper = Clipper::with_options(options)?;
    for (i, rings) in paths.iter().enumerate() {
        let kind = if i == 0 {
            PolygonKind::Subject
        } else {
            PolygonKind::Clip
        };
        for ring in rings {
            clipper.add_ring(ring.iter().copied(), kind)?;
        }
    }

    let fill = if args.non_zero {
        FillRule::NonZero
    } else {
        FillRule::EvenOdd
    };
    let output = clipper.execute(args.op.0, fill, fill)?;
    tracing::info!(
        polygons = output.len(),
        area = output.area(),
        "writing {}",
        args.output.display()
    );

    svg::save(&args.output, &to_document(&output))?;
    Ok(())
}
