//! Gauss-Legendre quadrature.
//!
//! Flexure penalties integrate products of basis derivatives over a segment's
//! local interval `[0, 1]`. An `n`-point rule is exact for polynomials of
//! degree `2n - 1`, so the default rule integrates penalty integrands of
//! polynomial families exactly and tension families to machine precision.

use crate::error::{MathError, MathResult};

/// Default number of nodes used for penalty integrals.
pub const DEFAULT_ORDER: usize = 24;

/// Nodes and weights of a Gauss-Legendre rule on `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Builds an `order`-point rule by Newton iteration on `P_order`.
    pub fn new(order: usize) -> MathResult<Self> {
        if order == 0 {
            return Err(MathError::insufficient_data(1, 0));
        }

        let mut nodes = vec![0.0; order];
        let mut weights = vec![0.0; order];
        let n = order as f64;
        let half = order.div_ceil(2);

        for i in 0..half {
            // Chebyshev-like starting guess for the i-th largest root
            let mut z = (std::f64::consts::PI * (i as f64 + 0.75) / (n + 0.5)).cos();
            let mut derivative = 0.0;

            for _ in 0..100 {
                let (p, dp) = legendre_with_derivative(order, z);
                derivative = dp;
                let step = p / dp;
                z -= step;
                if step.abs() < 1e-15 {
                    break;
                }
            }
            let (_, dp) = legendre_with_derivative(order, z);
            if dp != 0.0 {
                derivative = dp;
            }

            let w = 2.0 / ((1.0 - z * z) * derivative * derivative);
            nodes[i] = -z;
            nodes[order - 1 - i] = z;
            weights[i] = w;
            weights[order - 1 - i] = w;
        }

        Ok(Self { nodes, weights })
    }

    /// Nodes on `[-1, 1]`.
    #[must_use]
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Weights matching [`Self::nodes`].
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of nodes.
    #[must_use]
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// Integrates `f` over `[a, b]`.
    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let half_width = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(mid + half_width * x))
            .sum::<f64>()
            * half_width
    }

    /// Nodes and weights mapped onto `[a, b]`.
    #[must_use]
    pub fn mapped(&self, a: f64, b: f64) -> Vec<(f64, f64)> {
        let half_width = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| (mid + half_width * x, w * half_width))
            .collect()
    }
}

/// Evaluates `P_n(z)` and `P_n'(z)` by the three-term recurrence.
fn legendre_with_derivative(n: usize, z: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = 0.0;
    for j in 1..=n {
        let p2 = p1;
        p1 = p0;
        let jf = j as f64;
        p0 = ((2.0 * jf - 1.0) * z * p1 - (jf - 1.0) * p2) / jf;
    }
    let dp = n as f64 * (z * p0 - p1) / (z * z - 1.0);
    (p0, dp)
}
