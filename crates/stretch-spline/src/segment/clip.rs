//! Segment truncation.

use tracing::debug;

use super::Segment;
use crate::constraint::{EdgeDerivatives, SegmentConstraints};
use crate::error::{SplineError, SplineResult};
use crate::range::SegmentRange;

impl Segment {
    /// Derivative counts `(at clip point, at kept edge)` for a Hermite match
    /// that uses exactly one row per basis function.
    fn clip_split(&self) -> (usize, usize) {
        let free = self.basis_count().saturating_sub(2);
        (free.div_ceil(2), free / 2)
    }

    fn check_interior(&self, x: f64) -> SplineResult<()> {
        if !self.range.contains_with(x, false, false) {
            return Err(SplineError::invalid_input(format!(
                "clip ordinate {x} must lie strictly inside [{}, {}]",
                self.left(),
                self.right()
            )));
        }
        Ok(())
    }

    /// Hermite segment over `range`, a part of this segment, evaluated
    /// through this segment's frame.
    ///
    /// Kaklis-Pandelis bases with exponent above 2 have sub-ranges on which
    /// that Hermite system is singular; there the part falls back to this
    /// segment's evaluator on its own local ordinate.
    pub(crate) fn hermite_part(
        &self,
        range: SegmentRange,
        left: &EdgeDerivatives,
        right: &EdgeDerivatives,
        track_sensitivities: bool,
    ) -> SplineResult<Segment> {
        let constraints = SegmentConstraints::hermite(&range, left, right)?;
        let mut part = Segment::new(range, self.sub_evaluator(&range), self.design);
        match part.calibrate_tracked(&constraints, track_sensitivities) {
            Ok(()) => Ok(part),
            Err(SplineError::SingularSystem) => {
                debug!(
                    left = range.left(),
                    right = range.right(),
                    "framed hermite system singular, using the segment's own frame"
                );
                let mut part = Segment::new(range, self.evaluator.clone(), self.design);
                part.calibrate_tracked(&constraints, track_sensitivities)?;
                Ok(part)
            }
            Err(e) => Err(e),
        }
    }

    fn hermite_copy(
        &self,
        range: SegmentRange,
        left_at: f64,
        left_count: usize,
        right_at: f64,
        right_count: usize,
    ) -> SplineResult<Segment> {
        let left = self.derivatives_at(left_at, left_count)?;
        let right = self.derivatives_at(right_at, right_count)?;
        self.hermite_part(range, &left, &right, false)
    }

    /// New segment over `[x, right]` matching this one's value and
    /// derivatives at `x` and at the right edge.
    ///
    /// The clipped segment keeps this segment's basis frame, so the original
    /// response is reproduced exactly (see [`Segment::hermite_part`] for the
    /// one exception).
    pub fn clip_left_of_ordinate(&self, x: f64) -> SplineResult<Segment> {
        self.check_interior(x)?;
        let (at_clip, at_edge) = self.clip_split();
        let range = self.range.clip_left(x)?;
        self.hermite_copy(range, x, at_clip, self.right(), at_edge)
    }

    /// New segment over `[left, x]` matching this one's value and
    /// derivatives at the left edge and at `x`.
    pub fn clip_right_of_ordinate(&self, x: f64) -> SplineResult<Segment> {
        self.check_interior(x)?;
        let (at_clip, at_edge) = self.clip_split();
        let range = self.range.clip_right(x)?;
        self.hermite_copy(range, self.left(), at_edge, x, at_clip)
    }
}
