//! Error types for spline calibration and evaluation.
//!
//! Every failure is local and synchronous: the call that detects it returns
//! the error and nothing is retried internally.

use stretch_math::MathError;
use thiserror::Error;

/// A specialized Result type for spline operations.
pub type SplineResult<T> = Result<T, SplineError>;

/// Error types for spline operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    /// Malformed input detected at construction or entry.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of what is wrong with the input.
        reason: String,
    },

    /// The constraint rows cannot be completed into a square system.
    #[error("Insufficient constraints: {rows} constraint rows for {basis} basis functions")]
    InsufficientConstraints {
        /// Number of constraint rows supplied.
        rows: usize,
        /// Number of basis functions (unknown coefficients).
        basis: usize,
    },

    /// The calibration system cannot be inverted.
    #[error("Singular calibration system")]
    SingularSystem,

    /// The boundary-condition root search failed.
    #[error("Root search did not converge: {reason}")]
    RootFindNonConvergence {
        /// Description of the failure.
        reason: String,
    },

    /// Evaluation requested outside the valid range.
    #[error("Ordinate {x} outside domain [{left}, {right}]")]
    OutOfDomain {
        /// The requested ordinate.
        x: f64,
        /// Left edge of the domain.
        left: f64,
        /// Right edge of the domain.
        right: f64,
    },

    /// Evaluation of a segment that was never calibrated.
    #[error("Segment has not been calibrated")]
    NotCalibrated,

    /// Numerical primitive failure not covered by the variants above.
    #[error(transparent)]
    Math(MathError),
}

impl SplineError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates an out of domain error.
    #[must_use]
    pub fn out_of_domain(x: f64, left: f64, right: f64) -> Self {
        Self::OutOfDomain { x, left, right }
    }

    /// Creates a root-search failure.
    #[must_use]
    pub fn non_convergence(reason: impl Into<String>) -> Self {
        Self::RootFindNonConvergence {
            reason: reason.into(),
        }
    }
}

impl From<MathError> for SplineError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::SingularMatrix => Self::SingularSystem,
            MathError::InvalidInput { reason } => Self::InvalidInput { reason },
            other => Self::Math(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SplineError::out_of_domain(11.0, 0.0, 10.0);
        assert!(err.to_string().contains("outside domain"));

        let err = SplineError::InsufficientConstraints { rows: 5, basis: 4 };
        assert_eq!(
            err.to_string(),
            "Insufficient constraints: 5 constraint rows for 4 basis functions"
        );
    }

    #[test]
    fn test_math_error_mapping() {
        assert_eq!(
            SplineError::from(MathError::SingularMatrix),
            SplineError::SingularSystem
        );
        assert!(matches!(
            SplineError::from(MathError::invalid_input("bad")),
            SplineError::InvalidInput { .. }
        ));
        assert!(matches!(
            SplineError::from(MathError::convergence_failed(10, 1.0)),
            SplineError::Math(MathError::ConvergenceFailed { .. })
        ));
    }
}
