//! Basis-function families, shape control and the evaluator.
//!
//! Families form a closed set resolved at construction time:
//!
//! | Family | Functions | Count |
//! |--------|-----------|-------|
//! | `Polynomial` | `uᵏ`, k = 0..n | n + 1 |
//! | `BernsteinPolynomial` | `C(n,i) uⁱ (1-u)ⁿ⁻ⁱ` | n + 1 |
//! | `HyperbolicTension` | `1, u, cosh τu, sinh τu` | 4 |
//! | `ExponentialTension` | `1, u, e^{τu}, e^{-τu}` | 4 |
//! | `KaklisPandelis` | `1, u, u(1-u)ᵐ, uᵐ(1-u)` | 4 |

mod evaluator;
mod functions;
mod shape;

pub use evaluator::{BasisEvaluator, LocalFrame};
pub use functions::{BasisFunction, FunctionSet};
pub use shape::{ShapeControl, ShapeFunction};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{Validate, ValidationError};
use crate::error::SplineError;

/// Closed set of basis families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasisFamily {
    /// Monomials.
    Polynomial,
    /// Bernstein polynomials.
    BernsteinPolynomial,
    /// Hyperbolic tension spline basis.
    HyperbolicTension,
    /// Exponential tension spline basis.
    ExponentialTension,
    /// Kaklis-Pandelis shape-preserving basis.
    KaklisPandelis,
}

impl BasisFamily {
    /// All families.
    pub const ALL: [BasisFamily; 5] = [
        BasisFamily::Polynomial,
        BasisFamily::BernsteinPolynomial,
        BasisFamily::HyperbolicTension,
        BasisFamily::ExponentialTension,
        BasisFamily::KaklisPandelis,
    ];

    /// The token this family is parsed from.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Polynomial => "Polynomial",
            Self::BernsteinPolynomial => "BernsteinPolynomial",
            Self::HyperbolicTension => "HyperbolicTension",
            Self::ExponentialTension => "ExponentialTension",
            Self::KaklisPandelis => "KaklisPandelis",
        }
    }
}

impl fmt::Display for BasisFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for BasisFamily {
    type Err = SplineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.token() == s)
            .ok_or_else(|| SplineError::invalid_input(format!("unknown basis family '{s}'")))
    }
}

/// Family plus its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family")]
pub enum BasisSetParams {
    /// Monomials up to `degree`.
    Polynomial {
        /// Highest power.
        degree: usize,
    },
    /// Bernstein polynomials of `degree`.
    BernsteinPolynomial {
        /// Polynomial degree.
        degree: usize,
    },
    /// Hyperbolic tension basis.
    HyperbolicTension {
        /// Tension `τ`.
        tension: f64,
    },
    /// Exponential tension basis.
    ExponentialTension {
        /// Tension `τ`.
        tension: f64,
    },
    /// Kaklis-Pandelis basis.
    KaklisPandelis {
        /// Exponent `m`, at least 2.
        exponent: usize,
    },
}

impl Default for BasisSetParams {
    fn default() -> Self {
        Self::Polynomial { degree: 3 }
    }
}

impl BasisSetParams {
    /// Cubic monomial basis.
    #[must_use]
    pub fn cubic() -> Self {
        Self::Polynomial { degree: 3 }
    }

    /// Family of these parameters.
    #[must_use]
    pub fn family(&self) -> BasisFamily {
        match self {
            Self::Polynomial { .. } => BasisFamily::Polynomial,
            Self::BernsteinPolynomial { .. } => BasisFamily::BernsteinPolynomial,
            Self::HyperbolicTension { .. } => BasisFamily::HyperbolicTension,
            Self::ExponentialTension { .. } => BasisFamily::ExponentialTension,
            Self::KaklisPandelis { .. } => BasisFamily::KaklisPandelis,
        }
    }

    /// Number of basis functions these parameters produce.
    #[must_use]
    pub fn basis_count(&self) -> usize {
        match self {
            Self::Polynomial { degree } | Self::BernsteinPolynomial { degree } => degree + 1,
            _ => 4,
        }
    }
}

impl Validate for BasisSetParams {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        match *self {
            Self::Polynomial { degree } | Self::BernsteinPolynomial { degree } => {
                if degree == 0 {
                    errors.push(ValidationError::with_rule(
                        "basis.degree",
                        "Degree must be at least 1 to match both segment edges",
                        "min_degree",
                    ));
                }
            }
            Self::HyperbolicTension { tension } | Self::ExponentialTension { tension } => {
                if !tension.is_finite() || tension == 0.0 {
                    errors.push(ValidationError::with_rule(
                        "basis.tension",
                        format!("Tension must be finite and non-zero, got {tension}"),
                        "non_zero_tension",
                    ));
                }
            }
            Self::KaklisPandelis { exponent } => {
                if exponent < 2 {
                    errors.push(ValidationError::with_rule(
                        "basis.exponent",
                        "Kaklis-Pandelis exponent must be at least 2",
                        "min_exponent",
                    ));
                }
            }
        }
        errors
    }
}

/// Factory for basis function sets.
pub struct FunctionSetBuilder;

impl FunctionSetBuilder {
    /// Resolves a family token and builds its set.
    ///
    /// Returns `None` for an unknown token, a token that does not match the
    /// parameters' family, or invalid parameters.
    #[must_use]
    pub fn create(token: &str, params: &BasisSetParams) -> Option<FunctionSet> {
        let family = token.parse::<BasisFamily>().ok()?;
        if family != params.family() {
            return None;
        }
        Self::build(params)
    }

    /// Builds the set described by `params`; `None` if they are invalid.
    #[must_use]
    pub fn build(params: &BasisSetParams) -> Option<FunctionSet> {
        if !params.is_valid() {
            return None;
        }
        let functions = match *params {
            BasisSetParams::Polynomial { degree } => {
                (0..=degree).map(BasisFunction::Monomial).collect()
            }
            BasisSetParams::BernsteinPolynomial { degree } => (0..=degree)
                .map(|index| BasisFunction::Bernstein { degree, index })
                .collect(),
            BasisSetParams::HyperbolicTension { tension } => vec![
                BasisFunction::Monomial(0),
                BasisFunction::Monomial(1),
                BasisFunction::Cosh(tension),
                BasisFunction::Sinh(tension),
            ],
            BasisSetParams::ExponentialTension { tension } => vec![
                BasisFunction::Monomial(0),
                BasisFunction::Monomial(1),
                BasisFunction::Exp(tension),
                BasisFunction::Exp(-tension),
            ],
            BasisSetParams::KaklisPandelis { exponent } => vec![
                BasisFunction::Monomial(0),
                BasisFunction::Monomial(1),
                BasisFunction::KaklisPandelisLeft(exponent),
                BasisFunction::KaklisPandelisRight(exponent),
            ],
        };
        Some(FunctionSet::new(params.family(), functions))
    }
}
