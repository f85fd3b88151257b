//! Knot insertion and segment appending.
//!
//! Inserting a knot splits the segment that contains it into two Hermite
//! segments. Every other segment is carried over unchanged, so the fitted
//! response at all existing knots is preserved exactly.

use tracing::debug;

use super::{CalibrationMode, Span};
use crate::config::SegmentBuilderParams;
use crate::constraint::{EdgeDerivatives, ResponseValueConstraint};
use crate::error::{SplineError, SplineResult};
use crate::range::SegmentRange;
use crate::segment::Segment;
use crate::sequence::BoundaryCondition;

impl Span {
    /// Splits the segment containing `x` at `x`, with the new knot's value and
    /// derivatives given by `edge`.
    ///
    /// The two pieces keep the split segment's value and derivatives at its
    /// old edges. Supplied derivatives beyond what the basis can hold are
    /// dropped.
    pub fn insert_knot(&self, x: f64, edge: &EdgeDerivatives) -> SplineResult<Span> {
        let index = self.interior_segment(x)?;
        if !edge.value.is_finite() || edge.derivatives.iter().any(|d| !d.is_finite()) {
            return Err(SplineError::invalid_input(format!(
                "knot at {x} needs a finite value and derivatives"
            )));
        }

        let original = &self.segments[index];
        let m = original.basis_count();
        let supplied = edge.truncated(edge.derivatives.len().min(m.saturating_sub(2)));
        let kept = m.saturating_sub(2 + supplied.derivatives.len());

        let left = original.hermite_part(
            SegmentRange::new(original.left(), x)?,
            &original.left_edge_derivatives(kept)?,
            &supplied,
            self.config.track_sensitivities,
        )?;
        let right = original.hermite_part(
            SegmentRange::new(x, original.right())?,
            &supplied,
            &original.right_edge_derivatives(kept)?,
            self.config.track_sensitivities,
        )?;

        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments[..index]);
        segments.push(left);
        segments.push(right);
        segments.extend_from_slice(&self.segments[index + 1..]);

        let mut params = self.params.clone();
        params.insert(index + 1, self.params[index]);

        debug!(span = %self.name, x, value = edge.value, segment = index, "knot inserted");
        let mut span = Span::new(self.name.clone(), segments, params, self.config)?;
        span.mode = CalibrationMode::Local;
        Ok(span)
    }

    /// Inserts a knot whose slope is the cardinal blend
    /// `0.5 (1 - tension) (A + B)` of the secants `A`, `B` from the
    /// containing segment's edges to the new point.
    pub fn insert_cardinal_knot(&self, x: f64, value: f64, tension: f64) -> SplineResult<Span> {
        if !tension.is_finite() {
            return Err(SplineError::invalid_input("cardinal tension must be finite"));
        }
        let index = self.interior_segment(x)?;
        let segment = &self.segments[index];
        let before = (value - segment.response_value(segment.left())?) / (x - segment.left());
        let after = (segment.response_value(segment.right())? - value) / (segment.right() - x);
        let slope = 0.5 * (1.0 - tension) * (before + after);
        self.insert_knot(x, &EdgeDerivatives::with_slope(value, slope))
    }

    /// Cardinal insertion with zero tension.
    pub fn insert_catmull_rom_knot(&self, x: f64, value: f64) -> SplineResult<Span> {
        self.insert_cardinal_knot(x, value, 0.0)
    }

    /// Extends the span to `right`, calibrating only the new segment as the
    /// continuation of the current last one through `value` at `right`.
    ///
    /// The new segment reuses the last segment's params.
    pub fn append_segment(&self, right: f64, value: f64) -> SplineResult<Span> {
        let last = self.segments.last().ok_or(SplineError::NotCalibrated)?;
        if !last.is_calibrated() {
            return Err(SplineError::NotCalibrated);
        }
        let params: SegmentBuilderParams = self.params[self.params.len() - 1];
        let mut appended = Segment::new(
            SegmentRange::new(last.right(), right)?,
            params.evaluator()?,
            params.design,
        );
        let trailing = ResponseValueConstraint::point(right, value)?;
        let constraints = appended.continuation_constraints(last, &trailing, None)?;
        appended.calibrate_tracked(&constraints, self.config.track_sensitivities)?;

        let mut segments = self.segments.clone();
        segments.push(appended);
        let mut all_params = self.params.clone();
        all_params.push(params);

        // A floating sequence is unaffected by segments to its right, so the
        // extended chain is still exactly that sequence.
        let mode = match &self.mode {
            CalibrationMode::Sequential {
                builder,
                left_slope,
            } if builder.boundary() == BoundaryCondition::Floating => {
                let mut extended = builder.clone();
                extended.push_trailing(trailing);
                CalibrationMode::Sequential {
                    builder: extended,
                    left_slope: *left_slope,
                }
            }
            _ => CalibrationMode::Local,
        };

        debug!(span = %self.name, right, value, "segment appended");
        let mut span = Span::new(self.name.clone(), segments, all_params, self.config)?;
        span.mode = mode;
        Ok(span)
    }

    /// Index of the segment with `x` strictly inside it.
    fn interior_segment(&self, x: f64) -> SplineResult<usize> {
        if !self.is_calibrated() {
            return Err(SplineError::NotCalibrated);
        }
        let index = self.segment_index(x)?;
        if !self.segments[index].range().contains_with(x, false, false) {
            return Err(SplineError::invalid_input(format!(
                "knot at {x} must lie strictly inside a segment"
            )));
        }
        Ok(index)
    }
}
