//! # Stretch Math
//!
//! Numerical primitives for the Stretch spline engine.
//!
//! This crate provides:
//!
//! - **Solvers**: Root-finding algorithms (Brent, Newton-Raphson) with
//!   heuristic bracket search and a tagged "no root in range" outcome
//! - **Linear Algebra**: Dense solve returning the inverse, null spaces
//! - **Quadrature**: Gauss-Legendre rules for penalty integrals
//! - **Combinatorics**: Binomial and falling-factorial helpers
//!
//! ## Design Philosophy
//!
//! - **Bounded**: every iteration carries a hard cap, so a failed search is a
//!   deterministic error rather than a hang
//! - **Explicit**: singular systems and non-convergence are distinct errors

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::float_cmp)]

pub mod combinatorics;
pub mod error;
pub mod linear_algebra;
pub mod quadrature;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::combinatorics::{binomial, falling_factorial};
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{invert, null_space, solve, solve_with_inverse, LinearSolution};
    pub use crate::quadrature::GaussLegendre;
    pub use crate::solvers::{
        brent, find_bracket, newton, newton_numerical, search_root,
        BracketConfig, RootFinderKind, RootSearch, SolverConfig, SolverResult,
    };
}

pub use error::{MathError, MathResult};
