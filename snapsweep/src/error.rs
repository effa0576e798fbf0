use thiserror::Error;

/// Something went wrong while building or running a boolean operation.
///
/// Degenerate input rings are not errors: they are silently ignored. The
/// variants other than [`Error::NonFinite`] and [`Error::InvalidScale`] report
/// broken internal invariants, and the operation that produced them must not
/// be continued.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Error {
    /// An input coordinate was infinite or not a number.
    #[error("non-finite input coordinate ({x}, {y})")]
    NonFinite {
        /// The offending x coordinate.
        x: f64,
        /// The offending y coordinate.
        y: f64,
    },
    /// The snapping grid scale must be finite and strictly positive.
    #[error("grid scale must be finite and positive, got {0}")]
    InvalidScale(f64),
    /// An index into one of the sweep structures was out of range, or pointed
    /// at something that was already retired.
    #[error("{what} index {index} is out of range (length {len})")]
    OutOfRange {
        /// Which structure was indexed.
        what: &'static str,
        /// The index that was used.
        index: usize,
        /// The length of the structure at the time.
        len: usize,
    },
    /// A bound that should be building a ring was not attached to one.
    #[error("bound is not attached to an output ring")]
    DetachedBound,
    /// No ordering of the pending intersections keeps every crossing pair adjacent.
    #[error("could not order intersections so that crossing bounds are adjacent")]
    IntersectionOrder,
    /// Only one of the two bounds meeting at a maximum owns a ring.
    #[error("only one bound of a maxima pair owns a ring")]
    UnpairedMaximum,
    /// A ring was placed in the ring tree next to a ring of the wrong orientation.
    #[error("ring orientation does not match its place in the ring tree")]
    Orientation,
}

impl Error {
    pub(crate) fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Error::OutOfRange { what, index, len }
    }
}
