//! Bracket generation and root scanning.
//!
//! The spline engine needs two flavours of search: an open search for a
//! boundary slope (unknown scale, expand outwards until the residual changes
//! sign) and a search of a closed interval for extrema, where "no root" is an
//! expected answer and must not look like a solver malfunction.

use serde::{Deserialize, Serialize};

use crate::error::{MathError, MathResult};
use crate::solvers::{brent, SolverConfig, SolverResult};

/// Controls for the geometric bracket expansion in [`find_bracket`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketConfig {
    /// Half-width of the first bracket around the initial guess.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,
    /// Factor applied to the bracket width after each failed attempt.
    #[serde(default = "default_expansion_factor")]
    pub expansion_factor: f64,
    /// Maximum number of expansions before giving up.
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
}

fn default_initial_step() -> f64 {
    1.0
}

fn default_expansion_factor() -> f64 {
    1.6
}

fn default_max_expansions() -> u32 {
    60
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            initial_step: default_initial_step(),
            expansion_factor: default_expansion_factor(),
            max_expansions: default_max_expansions(),
        }
    }
}

/// Outcome of a search for a root inside a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootSearch {
    /// A root was located and refined.
    Found(SolverResult),
    /// The function does not change sign anywhere on the scan grid.
    NoRoot,
}

impl RootSearch {
    /// Returns the root if one was found.
    #[must_use]
    pub fn root(&self) -> Option<f64> {
        match self {
            Self::Found(result) => Some(result.root),
            Self::NoRoot => None,
        }
    }
}

/// Attempts to find a bracketing interval for a root of `f`.
///
/// Probes `initial_guess ± step`, growing `step` geometrically, and returns
/// the first interval over which `f` changes sign.
pub fn find_bracket<F>(f: &F, initial_guess: f64, config: &BracketConfig) -> Option<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let f_init = f(initial_guess);
    if !f_init.is_finite() {
        return None;
    }
    if f_init == 0.0 {
        return Some((initial_guess, initial_guess));
    }

    let mut step = if config.initial_step > 0.0 {
        config.initial_step
    } else {
        default_initial_step()
    };
    let factor = config.expansion_factor.max(1.0 + f64::EPSILON);

    for _ in 0..config.max_expansions {
        let left = initial_guess - step;
        let right = initial_guess + step;
        let f_left = f(left);
        let f_right = f(right);

        if f_left.is_finite() && f_left * f_init <= 0.0 {
            return Some((left, initial_guess));
        }
        if f_right.is_finite() && f_right * f_init <= 0.0 {
            return Some((initial_guess, right));
        }

        step *= factor;
        if !step.is_finite() {
            break;
        }
    }

    None
}

/// Looks for a root of `f` on the closed interval `[a, b]`.
///
/// An exact zero at either end is reported as the root; otherwise a sign
/// change between the ends is refined with Brent. A function that keeps its
/// sign is [`RootSearch::NoRoot`]. Roots of even multiplicity strictly inside
/// the interval are not seen, so callers scanning a range split it into
/// cells first. Solver malfunctions (iteration cap, non-finite values) remain
/// errors.
pub fn search_root<F>(f: F, a: f64, b: f64, config: &SolverConfig) -> MathResult<RootSearch>
where
    F: Fn(f64) -> f64,
{
    if !(a.is_finite() && b.is_finite() && a < b) {
        return Err(MathError::invalid_input(format!(
            "root search needs a finite non-empty interval, got [{a}, {b}]"
        )));
    }
    let (fa, fb) = (f(a), f(b));
    for (x, value) in [(a, fa), (b, fb)] {
        if !value.is_finite() {
            return Err(MathError::invalid_input(format!(
                "root search hit a non-finite value at {x}"
            )));
        }
    }

    let exact = |root: f64| {
        RootSearch::Found(SolverResult {
            root,
            iterations: 0,
            residual: 0.0,
        })
    };
    if fa == 0.0 {
        return Ok(exact(a));
    }
    if fb == 0.0 {
        return Ok(exact(b));
    }
    if fa * fb < 0.0 {
        return brent(f, a, b, config).map(RootSearch::Found);
    }
    Ok(RootSearch::NoRoot)
}
