//! Left-to-right calibration of a segment chain under a boundary condition.
//!
//! A floating chain starts with a flat left slope. Natural and financial
//! chains treat the left slope as unknown and root-search it so that the
//! last segment's right-edge derivative of order 2 (natural) or 1
//! (financial) vanishes. Every trial slope recalibrates the whole chain.
//!
//! The search runs on a working copy of the chain and is committed only on
//! success, so a failed calibration leaves the caller's segments untouched.

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SpanConfig;
use crate::constraint::{BestFitResponse, ResponseValueConstraint};
use crate::error::{SplineError, SplineResult};
use crate::segment::Segment;

/// Condition imposed at the ends of a sequentially calibrated chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BoundaryCondition {
    /// Left slope fixed at zero, nothing imposed on the right.
    #[default]
    Floating,
    /// Zero second derivative at the right edge.
    Natural,
    /// Zero first derivative at the right edge.
    Financial,
}

impl BoundaryCondition {
    /// Order of the right-edge derivative driven to zero, if any.
    #[must_use]
    pub fn target_derivative_order(self) -> Option<usize> {
        match self {
            Self::Floating => None,
            Self::Natural => Some(2),
            Self::Financial => Some(1),
        }
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Floating => "Floating",
            Self::Natural => "Natural",
            Self::Financial => "Financial",
        };
        f.pad(name)
    }
}

impl FromStr for BoundaryCondition {
    type Err = SplineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "floating" => Ok(Self::Floating),
            "natural" => Ok(Self::Natural),
            "financial" => Ok(Self::Financial),
            _ => Err(SplineError::invalid_input(format!(
                "unknown boundary condition '{s}'"
            ))),
        }
    }
}

/// Calibration strategy for a chain: leading constraint, one trailing
/// constraint per segment, optional best-fit points and a boundary condition.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBuilder {
    leading: ResponseValueConstraint,
    trailing: Vec<ResponseValueConstraint>,
    best_fit: Option<BestFitResponse>,
    boundary: BoundaryCondition,
}

impl SequenceBuilder {
    /// Creates a builder. At least one trailing constraint is required.
    pub fn new(
        leading: ResponseValueConstraint,
        trailing: Vec<ResponseValueConstraint>,
        best_fit: Option<BestFitResponse>,
        boundary: BoundaryCondition,
    ) -> SplineResult<Self> {
        if trailing.is_empty() {
            return Err(SplineError::invalid_input(
                "a segment sequence needs at least one trailing constraint",
            ));
        }
        Ok(Self {
            leading,
            trailing,
            best_fit,
            boundary,
        })
    }

    /// Leading constraint of the first segment.
    #[must_use]
    pub fn leading(&self) -> &ResponseValueConstraint {
        &self.leading
    }

    /// Trailing constraints, one per segment.
    #[must_use]
    pub fn trailing(&self) -> &[ResponseValueConstraint] {
        &self.trailing
    }

    /// Best-fit points shared by the chain.
    #[must_use]
    pub fn best_fit(&self) -> Option<&BestFitResponse> {
        self.best_fit.as_ref()
    }

    /// Boundary condition.
    #[must_use]
    pub fn boundary(&self) -> BoundaryCondition {
        self.boundary
    }

    /// Replaces the value of the leading constraint.
    pub(crate) fn set_leading_value(&mut self, value: f64) {
        self.leading = self.leading.with_value(value);
    }

    /// Replaces the value of the trailing constraint of `segment`.
    pub(crate) fn set_trailing_value(&mut self, segment: usize, value: f64) -> SplineResult<()> {
        let constraint = self.trailing.get_mut(segment).ok_or_else(|| {
            SplineError::invalid_input(format!("no trailing constraint for segment {segment}"))
        })?;
        *constraint = constraint.with_value(value);
        Ok(())
    }

    /// Adds the trailing constraint of an appended segment.
    pub(crate) fn push_trailing(&mut self, constraint: ResponseValueConstraint) {
        self.trailing.push(constraint);
    }

    /// Calibrates the first segment with the given left slope.
    pub fn calibrate_starting_segment(
        &self,
        segment: &mut Segment,
        left_slope: f64,
        track_sensitivities: bool,
    ) -> SplineResult<()> {
        let constraints = segment.leading_constraints(
            &self.leading,
            left_slope,
            &self.trailing[0],
            self.best_fit.as_ref(),
        );
        segment.calibrate_tracked(&constraints, track_sensitivities)
    }

    /// One trailing constraint per segment.
    fn check_chain(&self, segments: &[Segment]) -> SplineResult<()> {
        if segments.len() != self.trailing.len() {
            return Err(SplineError::invalid_input(format!(
                "{} segments but {} trailing constraints",
                segments.len(),
                self.trailing.len()
            )));
        }
        Ok(())
    }

    /// Calibrates `segments[from..]` in order, each continuing its
    /// predecessor. `from` must be at least 1 and `segments` must hold one
    /// segment per trailing constraint.
    pub fn calibrate_segment_sequence(
        &self,
        segments: &mut [Segment],
        from: usize,
        track_sensitivities: bool,
    ) -> SplineResult<()> {
        self.check_chain(segments)?;
        if from == 0 {
            return Err(SplineError::invalid_input(
                "sequence propagation starts after the leading segment",
            ));
        }
        for i in from..segments.len() {
            let (done, rest) = segments.split_at_mut(i);
            let constraints = rest[0].continuation_constraints(
                &done[i - 1],
                &self.trailing[i],
                self.best_fit.as_ref(),
            )?;
            rest[0].calibrate_tracked(&constraints, track_sensitivities)?;
        }
        Ok(())
    }

    fn propagate(
        &self,
        segments: &mut [Segment],
        left_slope: f64,
        track_sensitivities: bool,
    ) -> SplineResult<()> {
        let (first, _) = segments
            .split_first_mut()
            .ok_or_else(|| SplineError::invalid_input("cannot calibrate an empty chain"))?;
        self.calibrate_starting_segment(first, left_slope, track_sensitivities)?;
        self.calibrate_segment_sequence(segments, 1, track_sensitivities)
    }

    /// Right-edge derivative of the last segment that the boundary drives to 0.
    fn boundary_residual(segments: &[Segment], order: usize) -> SplineResult<f64> {
        let last = segments
            .last()
            .ok_or_else(|| SplineError::invalid_input("cannot calibrate an empty chain"))?;
        last.response_value_derivative(last.right(), order)
    }

    /// Calibrates the whole chain and returns the left slope used.
    ///
    /// On failure `segments` is left exactly as it was.
    pub fn calibrate(&self, segments: &mut Vec<Segment>, config: &SpanConfig) -> SplineResult<f64> {
        self.check_chain(segments)?;
        debug!(
            segments = segments.len(),
            boundary = %self.boundary,
            "calibrating segment sequence"
        );

        let mut working = segments.clone();
        let slope = match self.boundary.target_derivative_order() {
            None => 0.0,
            Some(order) => self.solve_left_slope(&working, order, config)?,
        };
        self.propagate(&mut working, slope, config.track_sensitivities)?;

        *segments = working;
        Ok(slope)
    }

    fn solve_left_slope(
        &self,
        template: &[Segment],
        order: usize,
        config: &SpanConfig,
    ) -> SplineResult<f64> {
        let trial = RefCell::new(template.to_vec());
        let failure: RefCell<Option<SplineError>> = RefCell::new(None);

        let residual = |slope: f64| {
            let mut chain = trial.borrow_mut();
            let outcome = self
                .propagate(&mut chain, slope, false)
                .and_then(|()| Self::boundary_residual(&chain, order));
            match outcome {
                Ok(value) => value,
                Err(e) => {
                    failure.borrow_mut().get_or_insert(e);
                    f64::NAN
                }
            }
        };

        let solved = config.root_finder.solve(
            residual,
            0.0,
            None,
            &config.bracketing,
            &config.solver,
        );

        if let Some(e) = failure.into_inner() {
            warn!(boundary = %self.boundary, error = %e, "trial calibration failed");
            return Err(e);
        }

        match solved {
            Ok(result) => {
                debug!(
                    boundary = %self.boundary,
                    solver = config.root_finder.name(),
                    slope = result.root,
                    iterations = result.iterations,
                    residual = result.residual,
                    "boundary slope found"
                );
                Ok(result.root)
            }
            Err(e) => {
                warn!(boundary = %self.boundary, error = %e, "boundary slope search failed");
                Err(SplineError::non_convergence(format!(
                    "{} boundary slope search: {e}",
                    self.boundary
                )))
            }
        }
    }
}
