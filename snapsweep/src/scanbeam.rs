use std::collections::BTreeSet;

use ordered_float::OrderedFloat;

/// The heights at which the sweep line has to stop.
///
/// Heights come out largest first, and each height comes out at most once no
/// matter how many times it was pushed.
#[derive(Clone, Debug, Default)]
pub struct Scanbeam {
    ys: BTreeSet<OrderedFloat<f64>>,
}

impl Scanbeam {
    pub fn push(&mut self, y: f64) {
        self.ys.insert(OrderedFloat(y));
    }

    pub fn pop(&mut self) -> Option<f64> {
        self.ys.pop_last().map(|y| y.0)
    }

}

impl FromIterator<f64> for Scanbeam {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Scanbeam {
            ys: iter.into_iter().map(OrderedFloat).collect(),
        }
    }
}
