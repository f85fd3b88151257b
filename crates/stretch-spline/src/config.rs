//! Serde-backed configuration for segments and spans.
//!
//! Every struct here deserializes from JSON with per-field defaults and
//! implements [`Validate`], so a configuration can be checked in one pass
//! before any calibration runs.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stretch_math::solvers::{BracketConfig, RootFinderKind, SolverConfig};

use crate::basis::{BasisEvaluator, BasisSetParams, ShapeControl};
use crate::constraint::FlexurePenaltyControl;
use crate::error::{SplineError, SplineResult};
use crate::sequence::BoundaryCondition;

/// A single validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
    /// Validation rule that was violated.
    pub rule: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Creates a validation error with a rule name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }

    /// Prefixes the field path, for nested configurations.
    #[must_use]
    pub fn nested(self, prefix: &str) -> Self {
        Self {
            field: format!("{prefix}.{}", self.field),
            ..self
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref rule) = self.rule {
            write!(f, "{}: {} (rule: {})", self.field, self.message, rule)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Returns a list of validation errors, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and folds every error into one [`SplineError::InvalidInput`].
    fn validate_or_error(&self) -> SplineResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let reason = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(SplineError::InvalidInput { reason })
    }
}

// =============================================================================
// SEGMENT DESIGN
// =============================================================================

/// Continuity and penalty controls of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentDesign {
    /// Number of derivatives kept continuous across the segment's left knot.
    #[serde(default = "default_ck")]
    pub ck: usize,

    /// Penalty on the integrated squared derivative (curvature by default).
    #[serde(default)]
    pub curvature_penalty: FlexurePenaltyControl,

    /// Optional second penalty, usually on the first derivative.
    #[serde(default)]
    pub length_penalty: Option<FlexurePenaltyControl>,
}

fn default_ck() -> usize {
    2
}

impl Default for SegmentDesign {
    fn default() -> Self {
        Self {
            ck: default_ck(),
            curvature_penalty: FlexurePenaltyControl::default(),
            length_penalty: None,
        }
    }
}

impl SegmentDesign {
    /// Design with the given continuity order and default penalties.
    #[must_use]
    pub fn with_ck(ck: usize) -> Self {
        Self {
            ck,
            ..Self::default()
        }
    }

    /// Active penalties (zero amplitudes are skipped).
    pub fn penalties(&self) -> impl Iterator<Item = &FlexurePenaltyControl> {
        std::iter::once(&self.curvature_penalty)
            .chain(self.length_penalty.as_ref())
            .filter(|p| p.amplitude > 0.0)
    }
}

impl Validate for SegmentDesign {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = self
            .curvature_penalty
            .validate()
            .into_iter()
            .map(|e| e.nested("curvature_penalty"))
            .collect();
        if let Some(length) = &self.length_penalty {
            errors.extend(length.validate().into_iter().map(|e| e.nested("length_penalty")));
        }
        errors
    }
}

// =============================================================================
// SEGMENT BUILDER PARAMS
// =============================================================================

/// Everything needed to construct one segment: basis, shape and design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SegmentBuilderParams {
    /// Basis family and parameters.
    #[serde(default)]
    pub basis: BasisSetParams,

    /// Optional shape multiplier.
    #[serde(default)]
    pub shape: Option<ShapeControl>,

    /// Continuity and penalty design.
    #[serde(default)]
    pub design: SegmentDesign,
}

impl SegmentBuilderParams {
    /// Params with the given basis and default design.
    #[must_use]
    pub fn new(basis: BasisSetParams) -> Self {
        Self {
            basis,
            ..Self::default()
        }
    }

    /// Sets the shape control.
    #[must_use]
    pub fn with_shape(mut self, shape: ShapeControl) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Sets the design.
    #[must_use]
    pub fn with_design(mut self, design: SegmentDesign) -> Self {
        self.design = design;
        self
    }

    /// Builds the shared evaluator.
    pub fn evaluator(&self) -> SplineResult<Arc<BasisEvaluator>> {
        self.validate_or_error()?;
        BasisEvaluator::from_params(&self.basis, self.shape).map(Arc::new)
    }
}

impl Validate for SegmentBuilderParams {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = self.basis.validate();
        if let Some(shape) = &self.shape {
            errors.extend(shape.validate());
        }
        errors.extend(self.design.validate().into_iter().map(|e| e.nested("design")));

        let count = self.basis.basis_count();
        if self.design.ck + 2 > count {
            errors.push(ValidationError::with_rule(
                "design.ck",
                format!(
                    "Continuity order {} needs at least {} basis functions, basis has {count}",
                    self.design.ck,
                    self.design.ck + 2
                ),
                "ck_within_basis",
            ));
        }

        // uᵐ(1-u) vanishes to order m-1 at the left edge, so with ck = 2 and
        // no penalty row left over a continuation segment never sees it
        if let BasisSetParams::KaklisPandelis { exponent } = self.basis {
            if self.design.ck >= 2 && exponent > self.design.ck {
                errors.push(ValidationError::with_rule(
                    "design.ck",
                    format!(
                        "Kaklis-Pandelis exponent {exponent} needs continuity order at most 1, got {}",
                        self.design.ck
                    ),
                    "kaklis_pandelis_continuity",
                ));
            }
        }
        errors
    }
}

// =============================================================================
// SPAN CONFIG
// =============================================================================

/// Chain-wide calibration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SpanConfig {
    /// Boundary condition at the chain ends.
    #[serde(default)]
    pub boundary: BoundaryCondition,

    /// Root finder for the natural/financial start slope.
    #[serde(default)]
    pub root_finder: RootFinderKind,

    /// Tolerance and iteration cap of the root finder.
    #[serde(default)]
    pub solver: SolverConfig,

    /// Bracket expansion controls.
    #[serde(default)]
    pub bracketing: BracketConfig,

    /// Compute every segment Jacobian eagerly during calibration.
    #[serde(default)]
    pub track_sensitivities: bool,
}

impl SpanConfig {
    /// Config with the given boundary condition and defaults elsewhere.
    #[must_use]
    pub fn with_boundary(boundary: BoundaryCondition) -> Self {
        Self {
            boundary,
            ..Self::default()
        }
    }

    /// Enables eager Jacobian tracking.
    #[must_use]
    pub fn tracking_sensitivities(mut self) -> Self {
        self.track_sensitivities = true;
        self
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> SplineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SplineError::invalid_input(format!("span config: {e}")))?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> SplineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SplineError::invalid_input(format!("span config: {e}")))
    }
}

impl Validate for SpanConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = self.solver.validate() {
            errors.push(ValidationError::with_rule(
                "solver",
                e.to_string(),
                "terminating_solver",
            ));
        }

        if !(self.bracketing.initial_step.is_finite() && self.bracketing.initial_step > 0.0) {
            errors.push(ValidationError::with_rule(
                "bracketing.initial_step",
                "Initial bracket step must be positive",
                "positive_step",
            ));
        }

        if !(self.bracketing.expansion_factor.is_finite() && self.bracketing.expansion_factor > 1.0)
        {
            errors.push(ValidationError::with_rule(
                "bracketing.expansion_factor",
                "Expansion factor must exceed 1",
                "expanding_bracket",
            ));
        }

        if self.bracketing.max_expansions == 0 {
            errors.push(ValidationError::new(
                "bracketing.max_expansions",
                "At least one bracket expansion is required",
            ));
        }

        errors
    }
}
