//! An ordered chain of adjacent segments.
//!
//! A span owns its segments and remembers how it was last calibrated, which
//! is what the chain-wide Jacobian and [`Span::reset_node`] need:
//!
//! - sequentially, through a [`SequenceBuilder`] and a boundary condition
//! - locally, with every segment calibrated from its own edge values (Hermite
//!   setup, clipping, knot insertion)

mod jacobian;
mod knots;

use tracing::{debug, warn};

use crate::config::{SegmentBuilderParams, SpanConfig};
use crate::constraint::{BestFitResponse, EdgeDerivatives, ResponseValueConstraint, SegmentConstraints};
use crate::error::{SplineError, SplineResult};
use crate::segment::{Edge, Monotonicity, Segment};
use crate::sequence::{BoundaryCondition, SequenceBuilder};

/// How a span was last calibrated.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationMode {
    /// No calibration has run.
    Uncalibrated,
    /// Left-to-right propagation driven by a sequence builder.
    Sequential {
        /// The constraints and boundary condition used.
        builder: SequenceBuilder,
        /// Left slope the chain started from.
        left_slope: f64,
    },
    /// Each segment calibrated from its own edge values.
    Local,
}

/// A chain of segments with `segments[i].right() == segments[i + 1].left()`.
#[derive(Debug, Clone)]
pub struct Span {
    name: String,
    segments: Vec<Segment>,
    params: Vec<SegmentBuilderParams>,
    config: SpanConfig,
    mode: CalibrationMode,
}

impl Span {
    /// Creates an uncalibrated span from adjacent segments and their params.
    pub fn new(
        name: impl Into<String>,
        segments: Vec<Segment>,
        params: Vec<SegmentBuilderParams>,
        config: SpanConfig,
    ) -> SplineResult<Self> {
        if segments.is_empty() {
            return Err(SplineError::invalid_input("a span needs at least one segment"));
        }
        if params.len() != segments.len() {
            return Err(SplineError::invalid_input(format!(
                "{} segments but {} segment params",
                segments.len(),
                params.len()
            )));
        }
        if let Some(gap) = segments.windows(2).find(|w| w[0].right() != w[1].left()) {
            return Err(SplineError::invalid_input(format!(
                "segments are not adjacent: {} != {}",
                gap[0].right(),
                gap[1].left()
            )));
        }
        Ok(Self {
            name: name.into(),
            segments,
            params,
            config,
            mode: CalibrationMode::Uncalibrated,
        })
    }

    /// Span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Per-segment construction params.
    #[must_use]
    pub fn params(&self) -> &[SegmentBuilderParams] {
        &self.params
    }

    /// Chain-wide calibration settings.
    #[must_use]
    pub fn config(&self) -> &SpanConfig {
        &self.config
    }

    /// How the span was last calibrated.
    #[must_use]
    pub fn mode(&self) -> &CalibrationMode {
        &self.mode
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Knot ordinates: every segment's left edge plus the last right edge.
    #[must_use]
    pub fn knots(&self) -> Vec<f64> {
        self.segments
            .iter()
            .map(Segment::left)
            .chain(self.segments.last().map(Segment::right))
            .collect()
    }

    /// `(left, right)` of the whole span.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        let left = self.segments.first().map_or(f64::NAN, Segment::left);
        let right = self.segments.last().map_or(f64::NAN, Segment::right);
        (left, right)
    }

    /// True once a calibration has succeeded.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.mode != CalibrationMode::Uncalibrated
    }

    // =========================================================================
    // CALIBRATION
    // =========================================================================

    /// Calibrates from a leading constraint, one trailing constraint per
    /// segment and optional best-fit points, under `boundary`.
    ///
    /// On failure the span keeps its previous calibration.
    pub fn setup(
        &mut self,
        leading: ResponseValueConstraint,
        trailing: Vec<ResponseValueConstraint>,
        best_fit: Option<BestFitResponse>,
        boundary: BoundaryCondition,
    ) -> SplineResult<()> {
        let builder = SequenceBuilder::new(leading, trailing, best_fit, boundary)?;
        self.run_sequence(builder)
    }

    /// Calibrates through the knot values `left_value, right_values[0], ...`.
    pub fn setup_values(
        &mut self,
        left_value: f64,
        right_values: &[f64],
        boundary: BoundaryCondition,
    ) -> SplineResult<()> {
        self.setup_values_with_fit(left_value, right_values, None, boundary)
    }

    pub(crate) fn setup_values_with_fit(
        &mut self,
        left_value: f64,
        right_values: &[f64],
        best_fit: Option<BestFitResponse>,
        boundary: BoundaryCondition,
    ) -> SplineResult<()> {
        if right_values.len() != self.segments.len() {
            return Err(SplineError::invalid_input(format!(
                "{} right values for {} segments",
                right_values.len(),
                self.segments.len()
            )));
        }
        let leading = ResponseValueConstraint::point(self.segments[0].left(), left_value)?;
        let trailing = self
            .segments
            .iter()
            .zip(right_values)
            .map(|(seg, &value)| ResponseValueConstraint::point(seg.right(), value))
            .collect::<SplineResult<Vec<_>>>()?;
        self.setup(leading, trailing, best_fit, boundary)
    }

    fn run_sequence(&mut self, builder: SequenceBuilder) -> SplineResult<()> {
        let config = SpanConfig {
            boundary: builder.boundary(),
            ..self.config
        };
        let left_slope = builder.calibrate(&mut self.segments, &config)?;
        debug!(span = %self.name, left_slope, "span calibrated sequentially");
        self.config = config;
        self.mode = CalibrationMode::Sequential {
            builder,
            left_slope,
        };
        Ok(())
    }

    /// Calibrates every segment independently from its left and right edge
    /// values and derivatives.
    pub fn setup_hermite(
        &mut self,
        left_edges: &[EdgeDerivatives],
        right_edges: &[EdgeDerivatives],
    ) -> SplineResult<()> {
        let n = self.segments.len();
        if left_edges.len() != n || right_edges.len() != n {
            return Err(SplineError::invalid_input(format!(
                "{n} segments need {n} left and right edges, got {} and {}",
                left_edges.len(),
                right_edges.len()
            )));
        }

        let mut working = self.segments.clone();
        for ((seg, left), right) in working.iter_mut().zip(left_edges).zip(right_edges) {
            let constraints = SegmentConstraints::hermite(seg.range(), left, right)?;
            seg.calibrate_tracked(&constraints, self.config.track_sensitivities)?;
        }

        self.segments = working;
        self.mode = CalibrationMode::Local;
        debug!(span = %self.name, segments = n, "span calibrated from Hermite edges");
        Ok(())
    }

    /// Replaces the response at knot `index` and recalibrates.
    ///
    /// A sequential span re-runs its sequence with the new constraint value.
    /// A local span re-solves only the one or two segments touching the knot.
    pub fn reset_node(&mut self, index: usize, value: f64) -> SplineResult<()> {
        let n = self.segments.len();
        if index > n {
            return Err(SplineError::invalid_input(format!(
                "knot index {index} out of range for {n} segments"
            )));
        }
        if !value.is_finite() {
            return Err(SplineError::invalid_input("node value must be finite"));
        }

        match &self.mode {
            CalibrationMode::Uncalibrated => Err(SplineError::NotCalibrated),
            CalibrationMode::Sequential { builder, .. } => {
                let mut builder = builder.clone();
                if index == 0 {
                    builder.set_leading_value(value);
                } else {
                    builder.set_trailing_value(index - 1, value)?;
                }
                self.run_sequence(builder)
            }
            CalibrationMode::Local => {
                let mut working = self.segments.clone();
                if index > 0 {
                    working[index - 1].reset_node(Edge::Right, value)?;
                }
                if index < n {
                    working[index].reset_node(Edge::Left, value)?;
                }
                self.segments = working;
                Ok(())
            }
        }
    }

    // =========================================================================
    // EVALUATION
    // =========================================================================

    /// Index of the segment containing `x`.
    ///
    /// An interior knot belongs to the segment on its right, the right edge
    /// of the span to the last segment.
    pub fn segment_index(&self, x: f64) -> SplineResult<usize> {
        let (left, right) = self.domain();
        if !(x >= left && x <= right) {
            return Err(SplineError::out_of_domain(x, left, right));
        }
        let after = self.segments.partition_point(|seg| seg.left() <= x);
        Ok(after.saturating_sub(1).min(self.segments.len() - 1))
    }

    /// Response value at `x`.
    pub fn response_value(&self, x: f64) -> SplineResult<f64> {
        self.response_value_derivative(x, 0)
    }

    /// Derivative of the given order at `x`.
    pub fn response_value_derivative(&self, x: f64, order: usize) -> SplineResult<f64> {
        let index = self.segment_index(x)?;
        self.segments[index].response_value_derivative(x, order)
    }

    // =========================================================================
    // MONOTONICITY
    // =========================================================================

    /// True when no segment has an interior extremum.
    pub fn is_locally_monotone(&self) -> SplineResult<bool> {
        for seg in &self.segments {
            if seg.monotone_type()? != Monotonicity::Monotonic {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Checks that every interior extremum of `measured` (one value per
    /// knot) is reproduced next to the same knot.
    ///
    /// A measured maximum at knot `i` is matched when segment `i - 1` or `i`
    /// has an interior maximum, or when the response rises into the knot and
    /// falls out of it. Minima are symmetric.
    pub fn is_co_monotone(&self, measured: &[f64]) -> SplineResult<bool> {
        let n = self.segments.len();
        if measured.len() != n + 1 {
            return Err(SplineError::invalid_input(format!(
                "{} measured responses for {} knots",
                measured.len(),
                n + 1
            )));
        }
        if measured.iter().any(|v| !v.is_finite()) {
            return Err(SplineError::invalid_input("measured responses must be finite"));
        }

        for i in 1..n {
            let (before, here, after) = (measured[i - 1], measured[i], measured[i + 1]);
            let wanted = if here > before && here > after {
                Monotonicity::Maxima
            } else if here < before && here < after {
                Monotonicity::Minima
            } else {
                continue;
            };

            let left = &self.segments[i - 1];
            let right = &self.segments[i];
            if left.monotone_type()? == wanted || right.monotone_type()? == wanted {
                continue;
            }

            // +1 when the knot is a peak, -1 when it is a trough
            let sense = if wanted == Monotonicity::Maxima { 1.0 } else { -1.0 };
            let arriving = left.edge_direction(Edge::Right)?;
            let leaving = right.edge_direction(Edge::Left)?;
            if arriving * sense > 0.0 && leaving * sense < 0.0 {
                continue;
            }

            debug!(span = %self.name, knot = i, ?wanted, "measured extremum not reproduced");
            return Ok(false);
        }
        Ok(true)
    }

    // =========================================================================
    // CLIPPING
    // =========================================================================

    fn check_clip(&self, x: f64) -> SplineResult<usize> {
        let (left, right) = self.domain();
        if !(x > left && x < right) {
            return Err(SplineError::invalid_input(format!(
                "clip ordinate {x} must lie strictly inside [{left}, {right}]"
            )));
        }
        self.segment_index(x)
    }

    /// New span over `[x, right]`. The segment containing `x` is replaced by
    /// its clipped copy, later segments are kept as they are.
    pub fn clip_left(&self, name: impl Into<String>, x: f64) -> SplineResult<Span> {
        let index = self.check_clip(x)?;
        let mut segments = Vec::with_capacity(self.segments.len() - index);
        if x == self.segments[index].left() {
            segments.push(self.segments[index].clone());
        } else {
            segments.push(self.segments[index].clip_left_of_ordinate(x)?);
        }
        segments.extend(self.segments[index + 1..].iter().cloned());
        let params = self.params[index..].to_vec();
        self.clipped(name.into(), segments, params, x)
    }

    /// New span over `[left, x]`.
    pub fn clip_right(&self, name: impl Into<String>, x: f64) -> SplineResult<Span> {
        let index = self.check_clip(x)?;
        let mut segments: Vec<Segment> = self.segments[..index].to_vec();
        let mut params = self.params[..index].to_vec();
        if x != self.segments[index].left() {
            segments.push(self.segments[index].clip_right_of_ordinate(x)?);
            params.push(self.params[index]);
        }
        self.clipped(name.into(), segments, params, x)
    }

    fn clipped(
        &self,
        name: String,
        segments: Vec<Segment>,
        params: Vec<SegmentBuilderParams>,
        x: f64,
    ) -> SplineResult<Span> {
        if !self.is_calibrated() {
            warn!(span = %self.name, "clipping an uncalibrated span");
            return Err(SplineError::NotCalibrated);
        }
        debug!(span = %self.name, clipped = %name, x, segments = segments.len(), "span clipped");
        let mut span = Span::new(name, segments, params, self.config)?;
        span.mode = CalibrationMode::Local;
        Ok(span)
    }
}
