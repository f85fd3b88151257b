//! Calibration constraint value objects.
//!
//! All of these are read-only inputs to a single calibration call.

use serde::{Deserialize, Serialize};

use crate::config::{Validate, ValidationError};
use crate::error::{SplineError, SplineResult};
use crate::range::SegmentRange;

/// `Σₖ wₖ f(xₖ) = value` on global ordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseValueConstraint {
    ordinates: Vec<f64>,
    weights: Vec<f64>,
    value: f64,
}

impl ResponseValueConstraint {
    /// Creates a weighted multi-point constraint.
    pub fn new(ordinates: Vec<f64>, weights: Vec<f64>, value: f64) -> SplineResult<Self> {
        if ordinates.is_empty() || ordinates.len() != weights.len() {
            return Err(SplineError::invalid_input(format!(
                "response constraint needs matching non-empty ordinates and weights, got {} and {}",
                ordinates.len(),
                weights.len()
            )));
        }
        if ordinates
            .iter()
            .chain(&weights)
            .chain(std::iter::once(&value))
            .any(|v| !v.is_finite())
        {
            return Err(SplineError::invalid_input(
                "response constraint holds non-finite entries",
            ));
        }
        Ok(Self {
            ordinates,
            weights,
            value,
        })
    }

    /// `f(x) = value`.
    pub fn point(x: f64, value: f64) -> SplineResult<Self> {
        Self::new(vec![x], vec![1.0], value)
    }

    /// Constrained ordinates.
    #[must_use]
    pub fn ordinates(&self) -> &[f64] {
        &self.ordinates
    }

    /// Weights matching [`Self::ordinates`].
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Target value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Copy with a different target value.
    #[must_use]
    pub fn with_value(&self, value: f64) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    /// `Some(x)` when this is a unit-weight single-point constraint.
    #[must_use]
    pub fn as_point(&self) -> Option<f64> {
        match (self.ordinates.as_slice(), self.weights.as_slice()) {
            ([x], [w]) if *w == 1.0 => Some(*x),
            _ => None,
        }
    }
}

/// `Σⱼ aⱼ cⱼ = value` directly on the basis coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisFlexureConstraint {
    weights: Vec<f64>,
    value: f64,
}

impl BasisFlexureConstraint {
    /// Creates a coefficient constraint.
    pub fn new(weights: Vec<f64>, value: f64) -> SplineResult<Self> {
        if weights.iter().any(|w| !w.is_finite()) || !value.is_finite() {
            return Err(SplineError::invalid_input(
                "flexure constraint holds non-finite entries",
            ));
        }
        Ok(Self { weights, value })
    }

    /// Coefficient weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Target value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Weighted least-squares point set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFitResponse {
    ordinates: Vec<f64>,
    responses: Vec<f64>,
    weights: Vec<f64>,
}

impl BestFitResponse {
    /// Creates a weighted point set.
    pub fn new(ordinates: Vec<f64>, responses: Vec<f64>, weights: Vec<f64>) -> SplineResult<Self> {
        if ordinates.len() != responses.len() || ordinates.len() != weights.len() {
            return Err(SplineError::invalid_input(format!(
                "best fit arrays differ in length: {} ordinates, {} responses, {} weights",
                ordinates.len(),
                responses.len(),
                weights.len()
            )));
        }
        if ordinates
            .iter()
            .chain(&responses)
            .chain(&weights)
            .any(|v| !v.is_finite())
        {
            return Err(SplineError::invalid_input("best fit holds non-finite entries"));
        }
        if weights.iter().any(|&w| w < 0.0) {
            return Err(SplineError::invalid_input("best fit weights must be non-negative"));
        }
        Ok(Self {
            ordinates,
            responses,
            weights,
        })
    }

    /// Unit-weight point set.
    pub fn uniform(ordinates: Vec<f64>, responses: Vec<f64>) -> SplineResult<Self> {
        let weights = vec![1.0; ordinates.len()];
        Self::new(ordinates, responses, weights)
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordinates.len()
    }

    /// True when there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordinates.is_empty()
    }

    /// Iterates `(x, y, w)`.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.ordinates
            .iter()
            .zip(&self.responses)
            .zip(&self.weights)
            .map(|((&x, &y), &w)| (x, y, w))
    }

    /// The points that fall inside `range`; `None` if there are none.
    #[must_use]
    pub fn size_to_segment(&self, range: &SegmentRange) -> Option<Self> {
        let (mut ordinates, mut responses, mut weights) = (Vec::new(), Vec::new(), Vec::new());
        for (x, y, w) in self.points().filter(|(x, _, _)| range.contains(*x)) {
            ordinates.push(x);
            responses.push(y);
            weights.push(w);
        }
        (!ordinates.is_empty()).then_some(Self {
            ordinates,
            responses,
            weights,
        })
    }
}

/// Penalty `amplitude · ∫₀¹ (f⁽ᵐ⁾(u))² du` on the local ordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlexurePenaltyControl {
    /// Derivative order `m` being penalized.
    #[serde(default = "default_penalty_order")]
    pub derivative_order: usize,
    /// Penalty weight.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

fn default_penalty_order() -> usize {
    2
}

fn default_amplitude() -> f64 {
    1.0
}

impl Default for FlexurePenaltyControl {
    fn default() -> Self {
        Self {
            derivative_order: default_penalty_order(),
            amplitude: default_amplitude(),
        }
    }
}

impl FlexurePenaltyControl {
    /// Creates a penalty.
    #[must_use]
    pub fn new(derivative_order: usize, amplitude: f64) -> Self {
        Self {
            derivative_order,
            amplitude,
        }
    }
}

impl Validate for FlexurePenaltyControl {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            errors.push(ValidationError::with_rule(
                "amplitude",
                format!("Penalty amplitude must be finite and non-negative, got {}", self.amplitude),
                "non_negative_amplitude",
            ));
        }
        if self.derivative_order == 0 {
            errors.push(ValidationError::new(
                "derivative_order",
                "Penalizing the response itself is not a flexure penalty",
            ));
        }
        errors
    }
}

/// Value and derivatives (orders 1, 2, ...) at a node, on the global ordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDerivatives {
    /// Response value.
    pub value: f64,
    /// Derivatives of order 1, 2, ... in that order.
    pub derivatives: Vec<f64>,
}

impl EdgeDerivatives {
    /// Creates edge data.
    #[must_use]
    pub fn new(value: f64, derivatives: Vec<f64>) -> Self {
        Self { value, derivatives }
    }

    /// Value and first derivative.
    #[must_use]
    pub fn with_slope(value: f64, slope: f64) -> Self {
        Self::new(value, vec![slope])
    }

    /// Value only.
    #[must_use]
    pub fn value_only(value: f64) -> Self {
        Self::new(value, Vec::new())
    }

    /// Keeps only the first `count` derivatives.
    #[must_use]
    pub fn truncated(&self, count: usize) -> Self {
        Self::new(
            self.value,
            self.derivatives.iter().copied().take(count).collect(),
        )
    }
}

/// Everything one segment calibration consumes, in row priority order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentConstraints {
    /// Response value constraints.
    pub response: Vec<ResponseValueConstraint>,
    /// Coefficient constraints.
    pub flexure: Vec<BasisFlexureConstraint>,
    /// Left-edge global derivatives of order 1, 2, ...
    pub left_derivatives: Vec<f64>,
    /// Right-edge global derivatives of order 1, 2, ...
    pub right_derivatives: Vec<f64>,
    /// Optional least-squares points.
    pub best_fit: Option<BestFitResponse>,
}

impl SegmentConstraints {
    /// Hermite constraints from edge data on `range`.
    pub fn hermite(
        range: &SegmentRange,
        left: &EdgeDerivatives,
        right: &EdgeDerivatives,
    ) -> SplineResult<Self> {
        Ok(Self {
            response: vec![
                ResponseValueConstraint::point(range.left(), left.value)?,
                ResponseValueConstraint::point(range.right(), right.value)?,
            ],
            left_derivatives: left.derivatives.clone(),
            right_derivatives: right.derivatives.clone(),
            ..Self::default()
        })
    }

    /// Number of explicit constraint rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.response.len()
            + self.flexure.len()
            + self.left_derivatives.len()
            + self.right_derivatives.len()
    }

    /// Sets the best-fit points.
    #[must_use]
    pub fn with_best_fit(mut self, best_fit: Option<BestFitResponse>) -> Self {
        self.best_fit = best_fit;
        self
    }
}
