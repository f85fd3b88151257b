//! Shape-control multipliers.
//!
//! A shape controller multiplies every basis function (and so the response)
//! by a positive function `s(t)`. Large rational or exponential controls pull
//! the fit towards the segment's left edge value, which is how tension is
//! applied to otherwise polynomial bases.

use serde::{Deserialize, Serialize};

use crate::config::{Validate, ValidationError};

/// The multiplier applied to the basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "lambda")]
pub enum ShapeFunction {
    /// `1 / (1 + λ t (1 - t))`.
    QuadraticRational(f64),
    /// `1 / (1 + λ t)`.
    LinearRational(f64),
    /// `exp(-λ t)`.
    ExponentialDecay(f64),
}

impl ShapeFunction {
    /// Value at `t`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> f64 {
        self.derivatives(t, 0)[0]
    }

    /// Derivative of the given order at `t`.
    #[must_use]
    pub fn derivative(&self, t: f64, order: usize) -> f64 {
        self.derivatives(t, order)[order]
    }

    /// Derivatives of orders `0..=max_order` at `t`.
    #[must_use]
    pub fn derivatives(&self, t: f64, max_order: usize) -> Vec<f64> {
        match *self {
            Self::QuadraticRational(lambda) => {
                reciprocal_derivatives(&[1.0, lambda, -lambda], t, max_order)
            }
            Self::LinearRational(lambda) => reciprocal_derivatives(&[1.0, lambda], t, max_order),
            Self::ExponentialDecay(lambda) => {
                let base = (-lambda * t).exp();
                (0..=max_order)
                    .map(|k| (-lambda).powi(k as i32) * base)
                    .collect()
            }
        }
    }

    /// Shape parameter `λ`.
    #[must_use]
    pub fn lambda(&self) -> f64 {
        match *self {
            Self::QuadraticRational(l) | Self::LinearRational(l) | Self::ExponentialDecay(l) => l,
        }
    }
}

/// Derivatives of `1 / p(t)` for the polynomial `p` given by ascending
/// coefficients, from `p r = 1` differentiated by the Leibniz rule:
/// `r⁽ⁿ⁾ = -(1/p) Σ_{j=1..n} C(n, j) p⁽ʲ⁾ r⁽ⁿ⁻ʲ⁾`.
fn reciprocal_derivatives(poly: &[f64], t: f64, max_order: usize) -> Vec<f64> {
    let p: Vec<f64> = (0..=max_order).map(|j| poly_derivative(poly, t, j)).collect();
    let mut r = Vec::with_capacity(max_order + 1);
    r.push(1.0 / p[0]);
    for n in 1..=max_order {
        let mut acc = 0.0;
        let mut binom = 1.0;
        for j in 1..=n {
            binom *= (n - j + 1) as f64 / j as f64;
            acc += binom * p[j] * r[n - j];
        }
        r.push(-acc / p[0]);
    }
    r
}

fn poly_derivative(poly: &[f64], t: f64, order: usize) -> f64 {
    poly.iter()
        .enumerate()
        .skip(order)
        .map(|(k, &c)| {
            let factor: f64 = ((k - order + 1)..=k).map(|v| v as f64).product();
            c * factor * t.powi((k - order) as i32)
        })
        .sum()
}

/// Optional shape control attached to a basis evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeControl {
    /// The multiplier.
    pub function: ShapeFunction,
    /// Evaluate in the local ordinate (`true`) or the global ordinate.
    #[serde(default = "default_localize")]
    pub localize: bool,
}

fn default_localize() -> bool {
    true
}

impl ShapeControl {
    /// Local-ordinate shape control.
    #[must_use]
    pub fn local(function: ShapeFunction) -> Self {
        Self {
            function,
            localize: true,
        }
    }

    /// Global-ordinate shape control.
    #[must_use]
    pub fn global(function: ShapeFunction) -> Self {
        Self {
            function,
            localize: false,
        }
    }
}

impl Validate for ShapeControl {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let lambda = self.function.lambda();
        if !lambda.is_finite() || lambda < 0.0 {
            errors.push(ValidationError::with_rule(
                "shape_control.lambda",
                format!("Shape parameter must be finite and non-negative, got {lambda}"),
                "non_negative_lambda",
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_against_difference(shape: ShapeFunction, t: f64) {
        let h = 1e-5;
        let derivs = shape.derivatives(t, 4);
        for order in 0..4 {
            let fd = (shape.derivative(t + h, order) - shape.derivative(t - h, order)) / (2.0 * h);
            assert_relative_eq!(derivs[order + 1], fd, epsilon = 1e-4, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_quadratic_rational() {
        let shape = ShapeFunction::QuadraticRational(2.0);
        assert_relative_eq!(shape.evaluate(0.0), 1.0);
        assert_relative_eq!(shape.evaluate(0.5), 1.0 / 1.5);
        check_against_difference(shape, 0.3);
    }

    #[test]
    fn test_linear_rational() {
        let shape = ShapeFunction::LinearRational(3.0);
        assert_relative_eq!(shape.evaluate(1.0), 0.25);
        assert_relative_eq!(shape.derivative(1.0, 1), -3.0 / 16.0);
        check_against_difference(shape, 0.7);
    }

    #[test]
    fn test_exponential_decay() {
        let shape = ShapeFunction::ExponentialDecay(0.5);
        assert_relative_eq!(shape.derivative(0.0, 2), 0.25);
        check_against_difference(shape, 0.2);
    }

    #[test]
    fn test_zero_lambda_is_identity() {
        for shape in [
            ShapeFunction::QuadraticRational(0.0),
            ShapeFunction::LinearRational(0.0),
            ShapeFunction::ExponentialDecay(0.0),
        ] {
            let d = shape.derivatives(0.4, 3);
            assert_relative_eq!(d[0], 1.0);
            assert!(d[1..].iter().all(|v| v.abs() < 1e-15));
        }
    }

    #[test]
    fn test_validation() {
        assert!(ShapeControl::local(ShapeFunction::LinearRational(1.0)).is_valid());
        assert!(!ShapeControl::global(ShapeFunction::ExponentialDecay(-1.0)).is_valid());
    }

    #[test]
    fn test_from_json() {
        let control: ShapeControl =
            serde_json::from_str(r#"{"function": {"kind": "QuadraticRational", "lambda": 1.5}}"#)
                .unwrap();
        assert!(control.localize);
        assert_eq!(control.function, ShapeFunction::QuadraticRational(1.5));
    }
}
