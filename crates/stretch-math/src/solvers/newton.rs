//! Newton-Raphson root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{SolverConfig, SolverResult};

/// Step size for the central finite-difference derivative.
const FD_STEP: f64 = 1e-7;

/// Newton-Raphson root finding with an optional safeguarding bracket.
///
/// Uses the iteration `x_{n+1} = x_n - f(x_n) / f'(x_n)`. When `bounds` is
/// supplied and brackets a sign change, a step that would leave the bracket is
/// replaced by a bisection step and the bracket is tightened on every
/// evaluation, so the iteration cannot wander off.
///
/// # Example
///
/// ```rust
/// use stretch_math::solvers::{newton, SolverConfig};
///
/// let f = |x: f64| x * x - 2.0;
/// let df = |x: f64| 2.0 * x;
///
/// let result = newton(f, df, 1.5, None, &SolverConfig::default()).unwrap();
/// assert!((result.root - std::f64::consts::SQRT_2).abs() < 1e-10);
/// ```
pub fn newton<F, DF>(
    f: F,
    df: DF,
    initial_guess: f64,
    bounds: Option<(f64, f64)>,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
    DF: Fn(f64) -> f64,
{
    let mut bracket = bounds.and_then(|(a, b)| {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (flo, fhi) = (f(lo), f(hi));
        (flo * fhi <= 0.0).then_some((lo, hi, flo))
    });

    let mut x = match bracket {
        Some((lo, hi, _)) => initial_guess.clamp(lo, hi),
        None => initial_guess,
    };

    for iteration in 0..config.max_iterations {
        let fx = f(x);
        if !fx.is_finite() {
            return Err(MathError::invalid_input(format!(
                "Newton: non-finite function value at {x}"
            )));
        }

        if fx.abs() < config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration,
                residual: fx,
            });
        }

        if let Some((lo, hi, flo)) = bracket.as_mut() {
            if fx * *flo > 0.0 {
                *lo = x;
                *flo = fx;
            } else {
                *hi = x;
            }
        }

        let dfx = df(x);
        let newton_step = (dfx.abs() > 1e-15).then(|| fx / dfx);

        let next = match (newton_step, bracket) {
            (Some(step), Some((lo, hi, _))) if (x - step) > lo && (x - step) < hi => x - step,
            (_, Some((lo, hi, _))) => 0.5 * (lo + hi),
            (Some(step), None) => x - step,
            (None, None) => return Err(MathError::DivisionByZero { value: dfx }),
        };

        let moved = (next - x).abs();
        x = next;

        if moved < config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration + 1,
                residual: f(x),
            });
        }
    }

    Err(MathError::convergence_failed(
        config.max_iterations,
        f(x).abs(),
    ))
}

/// Newton-Raphson with a central finite-difference derivative.
///
/// # Arguments
///
/// * `f` - The function for which to find a root
/// * `initial_guess` - Starting point for the iteration
/// * `bounds` - Optional safeguarding bracket
/// * `config` - Solver configuration
pub fn newton_numerical<F>(
    f: F,
    initial_guess: f64,
    bounds: Option<(f64, f64)>,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let df = |x: f64| {
        let h = FD_STEP * x.abs().max(1.0);
        (f(x + h) - f(x - h)) / (2.0 * h)
    };

    newton(&f, df, initial_guess, bounds, config)
}
