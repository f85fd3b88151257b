//! Univariate basis functions on the local ordinate.

use stretch_math::combinatorics::{binomial, falling_factorial};

use super::BasisFamily;

/// One basis function of the local ordinate `u ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BasisFunction {
    /// `u^k`.
    Monomial(usize),
    /// `C(n, i) u^i (1 - u)^(n - i)`.
    Bernstein {
        /// Polynomial degree `n`.
        degree: usize,
        /// Index `i` in `0..=n`.
        index: usize,
    },
    /// `cosh(τu)`.
    Cosh(f64),
    /// `sinh(τu)`.
    Sinh(f64),
    /// `exp(τu)`; a negative rate gives the decaying member.
    Exp(f64),
    /// `u (1 - u)^m`.
    KaklisPandelisLeft(usize),
    /// `u^m (1 - u)`.
    KaklisPandelisRight(usize),
}

impl BasisFunction {
    /// Value at `u`.
    #[must_use]
    pub fn evaluate(&self, u: f64) -> f64 {
        self.derivative(u, 0)
    }

    /// Derivative of the given order at `u` (order 0 is the value).
    #[must_use]
    pub fn derivative(&self, u: f64, order: usize) -> f64 {
        match *self {
            Self::Monomial(k) => monomial(k, u, order),
            Self::Bernstein { degree, index } => bernstein_derivative(degree, index, u, order),
            Self::Cosh(tau) => {
                let scale = tau.powi(order as i32);
                if order % 2 == 0 {
                    scale * (tau * u).cosh()
                } else {
                    scale * (tau * u).sinh()
                }
            }
            Self::Sinh(tau) => {
                let scale = tau.powi(order as i32);
                if order % 2 == 0 {
                    scale * (tau * u).sinh()
                } else {
                    scale * (tau * u).cosh()
                }
            }
            Self::Exp(rate) => rate.powi(order as i32) * (rate * u).exp(),
            Self::KaklisPandelisLeft(m) => {
                // u * g(u) with g = (1 - u)^m
                let g = |k: usize| one_minus_power(m, u, k);
                if order == 0 {
                    u * g(0)
                } else {
                    u * g(order) + order as f64 * g(order - 1)
                }
            }
            Self::KaklisPandelisRight(m) => {
                // h(u) * (1 - u) with h = u^m
                if order == 0 {
                    monomial(m, u, 0) * (1.0 - u)
                } else {
                    monomial(m, u, order) * (1.0 - u) - order as f64 * monomial(m, u, order - 1)
                }
            }
        }
    }
}

/// `d^order/du^order u^k`.
fn monomial(k: usize, u: f64, order: usize) -> f64 {
    if order > k {
        return 0.0;
    }
    falling_factorial(k, order) * u.powi((k - order) as i32)
}

/// `d^order/du^order (1 - u)^m`.
fn one_minus_power(m: usize, u: f64, order: usize) -> f64 {
    if order > m {
        return 0.0;
    }
    let sign = if order % 2 == 0 { 1.0 } else { -1.0 };
    sign * falling_factorial(m, order) * (1.0 - u).powi((m - order) as i32)
}

fn bernstein(degree: usize, index: isize, u: f64) -> f64 {
    if index < 0 || (index as usize) > degree {
        return 0.0;
    }
    let i = index as usize;
    binomial(degree, i) * u.powi(i as i32) * (1.0 - u).powi((degree - i) as i32)
}

/// Uses `B⁽ᵈ⁾_{i,n} = n!/(n-d)! Σⱼ (-1)ʲ C(d, j) B_{i-d+j, n-d}`.
fn bernstein_derivative(degree: usize, index: usize, u: f64, order: usize) -> f64 {
    if order == 0 {
        return bernstein(degree, index as isize, u);
    }
    if order > degree {
        return 0.0;
    }
    let reduced = degree - order;
    let sum: f64 = (0..=order)
        .map(|j| {
            let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
            let shifted = index as isize - order as isize + j as isize;
            sign * binomial(order, j) * bernstein(reduced, shifted, u)
        })
        .sum();
    falling_factorial(degree, order) * sum
}

/// Ordered basis functions of one family.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSet {
    family: BasisFamily,
    functions: Vec<BasisFunction>,
}

impl FunctionSet {
    pub(crate) fn new(family: BasisFamily, functions: Vec<BasisFunction>) -> Self {
        Self { family, functions }
    }

    /// Family this set belongs to.
    #[must_use]
    pub fn family(&self) -> BasisFamily {
        self.family
    }

    /// Number of basis functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True when the set holds no functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The functions in coefficient order.
    #[must_use]
    pub fn functions(&self) -> &[BasisFunction] {
        &self.functions
    }

    /// Derivative of function `index` at `u`; zero for an out-of-range index.
    #[must_use]
    pub fn derivative(&self, index: usize, u: f64, order: usize) -> f64 {
        self.functions
            .get(index)
            .map_or(0.0, |f| f.derivative(u, order))
    }
}
