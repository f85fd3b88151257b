//! Root-finding algorithms.
//!
//! This module provides the 1-D root finders used by the spline engine:
//!
//! - [`brent`]: bracketed Brent-Dekker iteration, the default for boundary
//!   slope searches and extremum location
//! - [`newton`]: Newton-Raphson with an optional safeguarding bracket
//! - [`find_bracket`]: heuristic search-edge generation by geometric expansion
//! - [`search_root`]: closed-interval search with Brent refinement that
//!   reports "no root in range" as a value rather than an error
//!
//! Every iteration is capped by [`SolverConfig::max_iterations`]; a search that
//! does not converge is a deterministic [`MathError::ConvergenceFailed`].
//!
//! # Choosing a Solver
//!
//! | Solver | Speed | Reliability | Requires |
//! |--------|-------|-------------|----------|
//! | Newton-Raphson | Fastest (quadratic) | May diverge | Initial guess |
//! | Brent | Fast (superlinear) | Guaranteed | Bracket |
//!
//! # Example
//!
//! ```rust
//! use stretch_math::solvers::{search_root, RootSearch, SolverConfig};
//!
//! // f'(u) of a cubic with an interior maximum at u = 0.5
//! let slope = |u: f64| 1.0 - 4.0 * u * u;
//! match search_root(slope, 0.0, 1.0, &SolverConfig::default()).unwrap() {
//!     RootSearch::Found(r) => assert!((r.root - 0.5).abs() < 1e-10),
//!     RootSearch::NoRoot => unreachable!(),
//! }
//! ```

mod bracket;
mod brent;
mod newton;

pub use bracket::{find_bracket, search_root, BracketConfig, RootSearch};
pub use brent::brent;
pub use newton::{newton, newton_numerical};

use serde::{Deserialize, Serialize};

use crate::error::{MathError, MathResult};

/// Default tolerance for root-finding algorithms.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Default maximum iterations for root-finding algorithms.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Configuration for root-finding algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Tolerance for convergence.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Maximum number of iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    /// Creates a new solver configuration.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Checks that the settings can terminate.
    pub fn validate(&self) -> MathResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(MathError::invalid_input(format!(
                "solver tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(MathError::invalid_input(
                "solver max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Result of a root-finding iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    /// The root found.
    pub root: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Final residual (function value at root).
    pub residual: f64,
}

/// The 1-D root finder a caller selects by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RootFinderKind {
    /// Brent-Dekker on a bracket found by [`find_bracket`].
    #[default]
    Brent,
    /// Newton-Raphson with a finite-difference derivative, safeguarded by the
    /// bracket when one can be found.
    Newton,
}

impl RootFinderKind {
    /// Finds a root of `f` starting from `initial_guess`.
    ///
    /// `bounds` overrides the heuristic bracket search.
    pub fn solve<F>(
        self,
        f: F,
        initial_guess: f64,
        bounds: Option<(f64, f64)>,
        bracketing: &BracketConfig,
        config: &SolverConfig,
    ) -> MathResult<SolverResult>
    where
        F: Fn(f64) -> f64,
    {
        config.validate()?;
        let bracket = bounds.or_else(|| find_bracket(&f, initial_guess, bracketing));
        tracing::trace!(solver = self.name(), initial_guess, ?bracket, "root search");
        match self {
            Self::Brent => match bracket {
                Some((a, b)) => brent(&f, a, b, config),
                None => {
                    tracing::debug!(
                        initial_guess,
                        expansions = bracketing.max_expansions,
                        "no sign change found while expanding bracket"
                    );
                    Err(MathError::convergence_failed(
                        bracketing.max_expansions,
                        f(initial_guess).abs(),
                    ))
                }
            },
            Self::Newton => newton_numerical(&f, initial_guess, bracket, config),
        }
    }

    /// Returns the name of the solver.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Brent => "Brent",
            Self::Newton => "Newton-Raphson",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solver_config() {
        let config = SolverConfig::default()
            .with_tolerance(1e-8)
            .with_max_iterations(50);

        assert!((config.tolerance - 1e-8).abs() < f64::EPSILON);
        assert_eq!(config.max_iterations, 50);
        assert!(config.validate().is_ok());
        assert!(SolverConfig::new(0.0, 10).validate().is_err());
        assert!(SolverConfig::new(1e-8, 0).validate().is_err());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{"max_iterations": 40}"#).unwrap();
        assert_eq!(config.max_iterations, 40);
        assert_relative_eq!(config.tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_kinds_agree_on_affine_residual() {
        // Boundary residuals are affine in the trial slope.
        let residual = |s: f64| 3.0 * s - 1.2;
        let config = SolverConfig::default();
        let bracketing = BracketConfig::default();

        let b = RootFinderKind::Brent
            .solve(residual, 0.0, None, &bracketing, &config)
            .unwrap();
        let n = RootFinderKind::Newton
            .solve(residual, 0.0, None, &bracketing, &config)
            .unwrap();

        assert_relative_eq!(b.root, 0.4, epsilon = 1e-10);
        assert_relative_eq!(n.root, 0.4, epsilon = 1e-8);
        assert_eq!(RootFinderKind::Brent.name(), "Brent");
    }

    #[test]
    fn test_brent_without_bracket_fails() {
        let flat = |_s: f64| 1.0;
        let result = RootFinderKind::Brent.solve(
            flat,
            0.0,
            None,
            &BracketConfig::default(),
            &SolverConfig::default(),
        );
        assert!(matches!(result, Err(MathError::ConvergenceFailed { .. })));
    }
}
