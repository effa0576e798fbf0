use crate::{
    geom::{Edge, Point},
    ring::RingIdx,
    scanbeam::Scanbeam,
    Error, PolygonKind,
};

/// An index into the bound storage of a sweep.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundIdx(pub usize);

impl std::fmt::Debug for BoundIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b_{}", self.0)
    }
}

/// Which side of its output ring a bound is building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A chain of edges going monotonically from a local minimum up to a local
/// maximum (in sweep order, from large y to small y).
#[derive(Clone, Debug)]
pub struct Bound {
    pub edges: Vec<Edge>,
    /// The edge currently crossing the sweep line. Once this is past the end
    /// of `edges` the bound is retired.
    pub current_edge: usize,
    pub current_x: f64,
    /// The last point added to the output ring on behalf of this bound.
    pub last_point: Point,
    pub poly_type: PolygonKind,
    pub winding_delta: i32,
    pub winding_count: i32,
    /// The winding count of the other polygon kind.
    pub winding_count2: i32,
    pub side: Side,
    pub ring: Option<RingIdx>,
    /// The bound that ends at the same local maximum as this one.
    pub maximum_bound: Option<BoundIdx>,
}

impl Bound {
    pub fn new(edges: Vec<Edge>, poly_type: PolygonKind) -> Self {
        let start = edges.first().map(|e| e.bot).unwrap_or_default();
        Bound {
            edges,
            current_edge: 0,
            current_x: start.x,
            last_point: start,
            poly_type,
            winding_delta: 0,
            winding_count: 0,
            winding_count2: 0,
            side: Side::Left,
            ring: None,
            maximum_bound: None,
        }
    }

    /// Puts the bound back at its first edge, ready to enter the active bound list.
    pub fn reset(&mut self, side: Side) {
        self.current_edge = 0;
        if let Some(e) = self.edges.first() {
            self.current_x = e.bot.x;
            self.last_point = e.bot;
        }
        self.winding_count = 0;
        self.winding_count2 = 0;
        self.side = side;
        self.ring = None;
    }

    pub fn current_edge(&self) -> Result<&Edge, Error> {
        self.edges
            .get(self.current_edge)
            .ok_or_else(|| Error::out_of_range("edge", self.current_edge, self.edges.len()))
    }

    pub fn next_edge(&self) -> Option<&Edge> {
        self.edges.get(self.current_edge + 1)
    }

    pub fn is_retired(&self) -> bool {
        self.current_edge >= self.edges.len()
    }

    /// Does the current edge end at `y`, with nothing after it?
    pub fn is_maxima(&self, y: f64) -> Result<bool, Error> {
        Ok(self.next_edge().is_none() && self.current_edge()?.top.y == y)
    }

    /// Does the current edge end at `y`, with another edge following it?
    pub fn is_intermediate(&self, y: f64) -> Result<bool, Error> {
        Ok(self.next_edge().is_some() && self.current_edge()?.top.y == y)
    }

    pub fn next_edge_is_horizontal(&self) -> bool {
        self.next_edge().is_some_and(Edge::is_horizontal)
    }

    /// Moves on to the next edge, scheduling a stop at its top.
    pub fn advance(&mut self, scanbeam: &mut Scanbeam) {
        self.current_edge += 1;
        if let Some(e) = self.edges.get(self.current_edge) {
            self.current_x = e.bot.x;
            if !e.is_horizontal() {
                scanbeam.push(e.top.y);
            }
        }
    }
}

/// Splits off the edges from the front of `edges` that lead down to the next
/// local minimum, returned in order from that minimum upwards.
pub(crate) fn create_bound_towards_minimum(edges: &mut Vec<Edge>) -> Vec<Edge> {
    if edges.len() == 1 {
        if edges[0].is_horizontal() {
            edges[0].reverse_horizontal();
        }
        return std::mem::take(edges);
    }
    if edges[0].is_horizontal() {
        edges[0].reverse_horizontal();
    }
    let mut y_increasing_before_last_horizontal = false;
    let mut next = 1;
    while next < edges.len() {
        let edge = edges[next - 1];
        let next_edge = edges[next];
        let edge_horizontal = edge.is_horizontal();
        let next_horizontal = next_edge.is_horizontal();
        if !next_horizontal && !edge_horizontal && edge.bot == next_edge.bot {
            break;
        }
        if !next_horizontal && edge_horizontal {
            if y_increasing_before_last_horizontal
                && (next_edge.bot == edge.bot || next_edge.bot == edge.top)
            {
                break;
            }
        } else if !y_increasing_before_last_horizontal
            && !edge_horizontal
            && next_horizontal
            && (edge.bot == next_edge.top || edge.bot == next_edge.bot)
        {
            y_increasing_before_last_horizontal = true;
        }
        if next_horizontal {
            edges[next].reverse_horizontal();
        }
        next += 1;
    }
    let mut bound: Vec<Edge> = edges.drain(..next).collect();
    bound.reverse();
    bound
}

/// Splits off the edges from the front of `edges` that lead up to the next
/// local maximum.
pub(crate) fn create_bound_towards_maximum(edges: &mut Vec<Edge>) -> Vec<Edge> {
    if edges.len() == 1 {
        return std::mem::take(edges);
    }
    let mut y_decreasing_before_last_horizontal = false;
    let mut next = 1;
    while next < edges.len() {
        let edge = edges[next - 1];
        let next_edge = edges[next];
        let edge_horizontal = edge.is_horizontal();
        let next_horizontal = next_edge.is_horizontal();
        if !next_horizontal && !edge_horizontal && edge.top == next_edge.top {
            break;
        }
        if !next_horizontal && edge_horizontal {
            if y_decreasing_before_last_horizontal
                && (next_edge.top == edge.bot || next_edge.top == edge.top)
            {
                break;
            }
        } else if !y_decreasing_before_last_horizontal
            && !edge_horizontal
            && next_horizontal
            && (edge.top == next_edge.top || edge.top == next_edge.bot)
        {
            y_decreasing_before_last_horizontal = true;
        }
        next += 1;
    }
    edges.drain(..next).collect()
}

/// Makes each horizontal edge start where the previous edge ended.
pub(crate) fn fix_horizontals(edges: &mut [Edge]) {
    if edges.len() < 2 {
        return;
    }
    if edges[0].is_horizontal() && edges[1].bot != edges[0].top {
        edges[0].reverse_horizontal();
    }
    for i in 1..edges.len() {
        if edges[i].is_horizontal() && edges[i - 1].top != edges[i].bot {
            edges[i].reverse_horizontal();
        }
    }
}

/// Moves the horizontal edges at the start of `from` onto the start of `to`.
pub(crate) fn move_horizontals(from: &mut Vec<Edge>, to: &mut Vec<Edge>) {
    let count = from.iter().take_while(|e| e.is_horizontal()).count();
    if count == 0 {
        return;
    }
    let mut moved: Vec<Edge> = from
        .drain(..count)
        .map(|mut e| {
            e.reverse_horizontal();
            e
        })
        .collect();
    moved.reverse();
    moved.append(to);
    *to = moved;
}
