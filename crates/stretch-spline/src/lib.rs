//! # Stretch Spline
//!
//! Multi-segment spline calibration with first-order sensitivities.
//!
//! This crate provides:
//!
//! - **Basis Families**: Polynomial, Bernstein, hyperbolic and exponential
//!   tension, Kaklis-Pandelis, with optional shape control
//! - **Segments**: Constrained calibration with penalty-filled rows,
//!   monotonicity classification, clipping and a coefficient Jacobian
//! - **Spans**: Chains calibrated sequentially under floating, natural or
//!   financial boundaries, or locally from Hermite edges
//! - **Knot Operations**: Plain, cardinal and Catmull-Rom knot insertion and
//!   segment appending
//! - **Sensitivities**: Chain-wide Jacobian of coefficients and responses with
//!   respect to knot responses
//!
//! ## Quick Start
//!
//! ```rust
//! use stretch_spline::prelude::*;
//!
//! let x = [0.0, 1.0, 2.0, 3.0];
//! let y = [0.0, 1.0, 0.0, 1.0];
//!
//! let span = SpanBuilder::new("zigzag")
//!     .create_local_control(&x, &y, SlopeGenerator::Bessel)
//!     .unwrap();
//!
//! assert!(span.is_co_monotone(&y).unwrap());
//! let sensitivity = span.jack_dresponse_dknot_responses(1.5).unwrap();
//! assert_eq!(sensitivity.len(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::similar_names)]
#![allow(clippy::float_cmp)]

pub mod basis;
pub mod builder;
pub mod config;
pub mod constraint;
pub mod error;
pub mod range;
pub mod segment;
pub mod sequence;
pub mod span;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::basis::{
        BasisEvaluator, BasisFamily, BasisFunction, BasisSetParams, FunctionSet,
        FunctionSetBuilder, LocalFrame, ShapeControl, ShapeFunction,
    };
    pub use crate::builder::{SlopeGenerator, SpanBuilder};
    pub use crate::config::{
        SegmentBuilderParams, SegmentDesign, SpanConfig, Validate, ValidationError,
    };
    pub use crate::constraint::{
        BasisFlexureConstraint, BestFitResponse, EdgeDerivatives, FlexurePenaltyControl,
        ResponseValueConstraint, SegmentConstraints,
    };
    pub use crate::error::{SplineError, SplineResult};
    pub use crate::range::SegmentRange;
    pub use crate::segment::{Edge, Monotonicity, Segment};
    pub use crate::sequence::{BoundaryCondition, SequenceBuilder};
    pub use crate::span::{CalibrationMode, Span};
    pub use stretch_math::solvers::{BracketConfig, RootFinderKind, SolverConfig};
}

pub use error::{SplineError, SplineResult};
