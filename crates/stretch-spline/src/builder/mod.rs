//! Span construction.
//!
//! [`SpanBuilder`] collects the per-segment params, chain config and optional
//! best-fit points, then creates a span from knot data in one of four ways:
//! uncalibrated, sequentially calibrated, Hermite from explicit slopes, or
//! Hermite from locally generated slopes.
//!
//! # Example
//!
//! ```rust
//! use stretch_spline::prelude::*;
//!
//! let span = SpanBuilder::new("zero")
//!     .with_boundary(BoundaryCondition::Natural)
//!     .create_calibrated(&[0.0, 1.0, 2.0, 5.0], &[0.01, 0.015, 0.02, 0.022])
//!     .unwrap();
//! assert!((span.response_value(2.0).unwrap() - 0.02).abs() < 1e-10);
//! ```

mod slopes;

pub use slopes::SlopeGenerator;

use std::sync::Arc;

use tracing::debug;

use crate::basis::BasisEvaluator;
use crate::config::{SegmentBuilderParams, SpanConfig, Validate};
use crate::constraint::{BestFitResponse, EdgeDerivatives};
use crate::error::{SplineError, SplineResult};
use crate::range::SegmentRange;
use crate::segment::Segment;
use crate::sequence::BoundaryCondition;
use crate::span::Span;

/// Checks that `x` has at least two finite, strictly increasing ordinates.
pub(crate) fn validate_ordinates(x: &[f64]) -> SplineResult<()> {
    if x.len() < 2 {
        return Err(SplineError::invalid_input(format!(
            "at least 2 ordinates are required, got {}",
            x.len()
        )));
    }
    if let Some(bad) = x.iter().find(|v| !v.is_finite()) {
        return Err(SplineError::invalid_input(format!("ordinate {bad} is not finite")));
    }
    if let Some(w) = x.windows(2).find(|w| w[1] <= w[0]) {
        return Err(SplineError::invalid_input(format!(
            "ordinates must be strictly increasing: {} then {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// [`validate_ordinates`] plus one finite response per ordinate.
pub(crate) fn validate_knots(x: &[f64], y: &[f64]) -> SplineResult<()> {
    validate_ordinates(x)?;
    if x.len() != y.len() {
        return Err(SplineError::invalid_input(format!(
            "{} ordinates but {} responses",
            x.len(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
        return Err(SplineError::invalid_input(format!("response {bad} is not finite")));
    }
    Ok(())
}

/// Builder for [`Span`]s.
#[derive(Debug, Clone)]
pub struct SpanBuilder {
    name: String,
    params: Vec<SegmentBuilderParams>,
    config: SpanConfig,
    best_fit: Option<BestFitResponse>,
}

impl SpanBuilder {
    /// Builder with cubic polynomial segments and default config.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: vec![SegmentBuilderParams::default()],
            config: SpanConfig::default(),
            best_fit: None,
        }
    }

    /// Uses the same params for every segment.
    #[must_use]
    pub fn with_params(mut self, params: SegmentBuilderParams) -> Self {
        self.params = vec![params];
        self
    }

    /// Uses one params entry per segment.
    #[must_use]
    pub fn with_segment_params(mut self, params: Vec<SegmentBuilderParams>) -> Self {
        self.params = params;
        self
    }

    /// Sets the chain config.
    #[must_use]
    pub fn with_config(mut self, config: SpanConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the boundary condition of sequential calibration.
    #[must_use]
    pub fn with_boundary(mut self, boundary: BoundaryCondition) -> Self {
        self.config.boundary = boundary;
        self
    }

    /// Adds best-fit points to sequential calibration.
    #[must_use]
    pub fn with_best_fit(mut self, best_fit: BestFitResponse) -> Self {
        self.best_fit = Some(best_fit);
        self
    }

    /// Repeats `params` once per segment.
    #[must_use]
    pub fn uniform(params: SegmentBuilderParams, segments: usize) -> Vec<SegmentBuilderParams> {
        vec![params; segments]
    }

    /// Per-segment params, broadcasting a single entry.
    fn segment_params(&self, segments: usize) -> SplineResult<Vec<SegmentBuilderParams>> {
        match self.params.as_slice() {
            [single] => Ok(Self::uniform(*single, segments)),
            many if many.len() == segments => Ok(many.to_vec()),
            many => Err(SplineError::invalid_input(format!(
                "{} segment params for {segments} segments",
                many.len()
            ))),
        }
    }

    /// Span over `ordinates` with no calibration.
    pub fn create_uncalibrated(&self, ordinates: &[f64]) -> SplineResult<Span> {
        validate_ordinates(ordinates)?;
        self.config.validate_or_error()?;
        let params = self.segment_params(ordinates.len() - 1)?;

        let mut segments = Vec::with_capacity(params.len());
        let mut shared: Option<(SegmentBuilderParams, Arc<BasisEvaluator>)> = None;
        for (w, p) in ordinates.windows(2).zip(&params) {
            let reused = shared
                .as_ref()
                .filter(|(cached, _)| cached == p)
                .map(|(_, evaluator)| evaluator.clone());
            let evaluator = match reused {
                Some(evaluator) => evaluator,
                None => {
                    let evaluator = p.evaluator()?;
                    shared = Some((*p, evaluator.clone()));
                    evaluator
                }
            };
            segments.push(Segment::new(SegmentRange::new(w[0], w[1])?, evaluator, p.design));
        }

        Span::new(self.name.clone(), segments, params, self.config)
    }

    /// Span calibrated sequentially through `responses` under the configured
    /// boundary condition.
    pub fn create_calibrated(&self, ordinates: &[f64], responses: &[f64]) -> SplineResult<Span> {
        validate_knots(ordinates, responses)?;
        let mut span = self.create_uncalibrated(ordinates)?;
        span.setup_values_with_fit(
            responses[0],
            &responses[1..],
            self.best_fit.clone(),
            self.config.boundary,
        )?;
        debug!(
            span = %self.name,
            knots = ordinates.len(),
            boundary = %self.config.boundary,
            "calibrated span created"
        );
        Ok(span)
    }

    /// Hermite span through `responses` with the given knot slopes.
    pub fn create_hermite(
        &self,
        ordinates: &[f64],
        responses: &[f64],
        slopes: &[f64],
    ) -> SplineResult<Span> {
        validate_knots(ordinates, responses)?;
        if slopes.len() != ordinates.len() {
            return Err(SplineError::invalid_input(format!(
                "{} slopes for {} knots",
                slopes.len(),
                ordinates.len()
            )));
        }
        let edges: Vec<EdgeDerivatives> = responses
            .iter()
            .zip(slopes)
            .map(|(&value, &slope)| EdgeDerivatives::with_slope(value, slope))
            .collect();

        let mut span = self.create_uncalibrated(ordinates)?;
        let n = edges.len();
        span.setup_hermite(&edges[..n - 1], &edges[1..])?;
        Ok(span)
    }

    /// Hermite span with slopes from a local-control generator.
    pub fn create_local_control(
        &self,
        ordinates: &[f64],
        responses: &[f64],
        generator: SlopeGenerator,
    ) -> SplineResult<Span> {
        let slopes = generator.slopes(ordinates, responses)?;
        debug!(span = %self.name, %generator, "local-control slopes generated");
        self.create_hermite(ordinates, responses, &slopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisSetParams;
    use crate::config::SegmentDesign;
    use approx::assert_relative_eq;

    #[test]
    fn test_validate_ordinates() {
        assert!(validate_ordinates(&[0.0, 1.0]).is_ok());
        assert!(validate_ordinates(&[0.0]).is_err());
        assert!(validate_ordinates(&[0.0, 1.0, 1.0]).is_err());
        assert!(validate_ordinates(&[0.0, f64::NAN]).is_err());
        assert!(validate_knots(&[0.0, 1.0], &[1.0]).is_err());
        assert!(validate_knots(&[0.0, 1.0], &[1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_params_broadcast_and_mismatch() {
        let x = [0.0, 1.0, 2.0];
        let span = SpanBuilder::new("b").create_uncalibrated(&x).unwrap();
        assert_eq!(span.params().len(), 2);
        assert!(Arc::ptr_eq(
            span.segments()[0].evaluator(),
            span.segments()[1].evaluator()
        ));

        let three = SpanBuilder::uniform(SegmentBuilderParams::default(), 3);
        assert!(SpanBuilder::new("b")
            .with_segment_params(three)
            .create_uncalibrated(&x)
            .is_err());
    }

    #[test]
    fn test_mixed_families() {
        let x = [0.0, 1.0, 2.0];
        let y = [1.0, 2.0, 1.5];
        let params = vec![
            SegmentBuilderParams::new(BasisSetParams::HyperbolicTension { tension: 1.0 }),
            SegmentBuilderParams::new(BasisSetParams::Polynomial { degree: 4 }),
        ];
        let span = SpanBuilder::new("mixed")
            .with_segment_params(params)
            .create_calibrated(&x, &y)
            .unwrap();
        for (&xi, &yi) in x.iter().zip(&y) {
            assert_relative_eq!(span.response_value(xi).unwrap(), yi, epsilon = 1e-9);
        }
        assert_eq!(span.segments()[1].basis_count(), 5);
    }

    #[test]
    fn test_kaklis_pandelis_flat_data() {
        let x = [0.0, 5.0, 10.0];
        let y = [3.0; 3];
        for exponent in 2..=5 {
            for ck in 0..=2 {
                let params = SegmentBuilderParams::new(BasisSetParams::KaklisPandelis { exponent })
                    .with_design(SegmentDesign::with_ck(ck));
                let result = SpanBuilder::new("kp")
                    .with_params(params)
                    .create_calibrated(&x, &y);
                if ck == 2 && exponent > 2 {
                    assert!(matches!(result, Err(SplineError::InvalidInput { .. })));
                    continue;
                }
                let span = result.unwrap();
                for &t in &[0.0, 2.5, 5.0, 7.5, 10.0] {
                    assert_relative_eq!(span.response_value(t).unwrap(), 3.0, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_linear_segments() {
        let params = SegmentBuilderParams::new(BasisSetParams::Polynomial { degree: 1 })
            .with_design(SegmentDesign::with_ck(0));
        let span = SpanBuilder::new("linear")
            .with_params(params)
            .create_calibrated(&[0.0, 2.0, 3.0], &[0.0, 4.0, 1.0])
            .unwrap();
        assert_relative_eq!(span.response_value(1.0).unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(span.response_value(2.5).unwrap(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_hermite_slopes_honoured() {
        let span = SpanBuilder::new("h")
            .create_hermite(&[0.0, 1.0, 3.0], &[0.0, 1.0, 0.0], &[1.0, -0.5, 2.0])
            .unwrap();
        assert_relative_eq!(
            span.response_value_derivative(1.0, 1).unwrap(),
            -0.5,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            span.segments()[0].response_value_derivative(1.0, 1).unwrap(),
            -0.5,
            epsilon = 1e-12
        );
        assert!(SpanBuilder::new("h")
            .create_hermite(&[0.0, 1.0], &[0.0, 1.0], &[1.0])
            .is_err());
    }

    #[test]
    fn test_best_fit_pulls_curve() {
        let fit = BestFitResponse::new(vec![0.5], vec![3.0], vec![1e4]).unwrap();
        let plain = SpanBuilder::new("p")
            .create_calibrated(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0])
            .unwrap();
        let fitted = SpanBuilder::new("f")
            .with_best_fit(fit)
            .create_calibrated(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0])
            .unwrap();
        assert!(fitted.response_value(0.5).unwrap() > plain.response_value(0.5).unwrap());
        assert_relative_eq!(fitted.response_value(1.0).unwrap(), 1.0, epsilon = 1e-9);
    }
}
