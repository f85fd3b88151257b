//! One calibratable segment of a spline chain.
//!
//! A segment owns its range, coefficient vector and calibration record, and
//! shares its basis evaluator read-only with other segments.
//!
//! # Calibration system
//!
//! With `M` basis functions the segment solves an `M x M` system whose rows
//! come, in this order, from:
//!
//! 1. response value constraints `Σ wₖ f(xₖ) = v`
//! 2. basis flexure constraints `Σ aⱼ cⱼ = v`
//! 3. left-edge derivatives of order 1, 2, ...
//! 4. right-edge derivatives of order 1, 2, ...
//! 5. penalty rows filling the remainder
//!
//! The penalty rows are the stationarity conditions of
//! `Σ amplitude ∫₀¹ (f⁽ᵐ⁾)² du + Σ w (f(u) - y)²` restricted to the null space
//! of rows 1-4, so the fit minimizes the penalty subject to the exact
//! constraints.
//!
//! The inverse of the system matrix is the Jacobian of the coefficients with
//! respect to the right-hand side. It is computed on first request, or
//! eagerly when sensitivities are tracked, and dropped on recalibration.

mod clip;
mod monotone;

pub use monotone::Monotonicity;

use std::cell::OnceCell;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use stretch_math::linear_algebra::{invert, null_space, solve, solve_with_inverse};
use stretch_math::quadrature::{GaussLegendre, DEFAULT_ORDER};
use tracing::trace;

use crate::basis::{BasisEvaluator, LocalFrame};
use crate::config::SegmentDesign;
use crate::constraint::{
    BestFitResponse, EdgeDerivatives, ResponseValueConstraint, SegmentConstraints,
};
use crate::error::{SplineError, SplineResult};
use crate::range::SegmentRange;

/// Segment edge selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// The left edge.
    Left,
    /// The right edge.
    Right,
}

/// Origin of one row of the calibration system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowKind {
    /// The k-th response value constraint.
    Response(usize),
    /// A basis flexure constraint.
    Flexure,
    /// Left-edge derivative of the given order.
    LeftDerivative(usize),
    /// Right-edge derivative of the given order.
    RightDerivative(usize),
    /// Penalty stationarity row.
    Penalty,
}

/// The system a segment was last calibrated with.
#[derive(Debug, Clone, PartialEq)]
struct Calibration {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    rows: Vec<RowKind>,
    left_value_row: Option<usize>,
    right_value_row: Option<usize>,
}

/// A calibratable segment.
#[derive(Debug, Clone)]
pub struct Segment {
    range: SegmentRange,
    evaluator: Arc<BasisEvaluator>,
    design: SegmentDesign,
    coefficients: Option<DVector<f64>>,
    calibration: Option<Calibration>,
    jacobian: OnceCell<DMatrix<f64>>,
}

impl Segment {
    /// Creates an uncalibrated segment.
    #[must_use]
    pub fn new(range: SegmentRange, evaluator: Arc<BasisEvaluator>, design: SegmentDesign) -> Self {
        Self {
            range,
            evaluator,
            design,
            coefficients: None,
            calibration: None,
            jacobian: OnceCell::new(),
        }
    }

    /// The segment range.
    #[must_use]
    pub fn range(&self) -> &SegmentRange {
        &self.range
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.range.left()
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.range.right()
    }

    /// Shared basis evaluator.
    #[must_use]
    pub fn evaluator(&self) -> &Arc<BasisEvaluator> {
        &self.evaluator
    }

    /// Evaluator for a segment over `range`, a part of this one, that spans
    /// the same functions of the global ordinate.
    pub(crate) fn sub_evaluator(&self, range: &SegmentRange) -> Arc<BasisEvaluator> {
        if range == &self.range {
            return self.evaluator.clone();
        }
        Arc::new(
            self.evaluator
                .reframed(LocalFrame::of_subrange(&self.range, range)),
        )
    }

    /// Continuity and penalty design.
    #[must_use]
    pub fn design(&self) -> &SegmentDesign {
        &self.design
    }

    /// Number of basis coefficients.
    #[must_use]
    pub fn basis_count(&self) -> usize {
        self.evaluator.basis_count()
    }

    /// Fitted coefficients, if calibrated.
    #[must_use]
    pub fn coefficients(&self) -> Option<&DVector<f64>> {
        self.coefficients.as_ref()
    }

    /// True once a calibration has succeeded.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Calibrates against `constraints`.
    ///
    /// On failure the segment keeps its previous state.
    pub fn calibrate(&mut self, constraints: &SegmentConstraints) -> SplineResult<()> {
        self.calibrate_tracked(constraints, false)
    }

    /// Calibrates and, when `track_sensitivities` is set, computes the
    /// coefficient Jacobian in the same pass.
    pub fn calibrate_tracked(
        &mut self,
        constraints: &SegmentConstraints,
        track_sensitivities: bool,
    ) -> SplineResult<()> {
        let basis = self.basis_count();
        let explicit_rows = constraints.row_count();
        if explicit_rows > basis {
            return Err(SplineError::InsufficientConstraints {
                rows: explicit_rows,
                basis,
            });
        }

        let system = self.assemble(constraints)?;
        let (coefficients, jacobian) = if track_sensitivities {
            let solved = solve_with_inverse(&system.matrix, &system.rhs)?;
            (solved.solution, Some(solved.inverse))
        } else {
            (solve(&system.matrix, &system.rhs)?, None)
        };

        trace!(
            left = self.left(),
            right = self.right(),
            basis,
            explicit_rows,
            penalty_rows = basis - explicit_rows,
            "segment calibrated"
        );

        self.coefficients = Some(coefficients);
        self.calibration = Some(system);
        self.jacobian = jacobian.map_or_else(OnceCell::new, OnceCell::from);
        Ok(())
    }

    /// Hermite calibration from edge values and derivatives.
    pub fn calibrate_edges(
        &mut self,
        left: &EdgeDerivatives,
        right: &EdgeDerivatives,
        best_fit: Option<&BestFitResponse>,
    ) -> SplineResult<()> {
        let constraints = SegmentConstraints::hermite(&self.range, left, right)?
            .with_best_fit(best_fit.and_then(|fit| fit.size_to_segment(&self.range)));
        self.calibrate(&constraints)
    }

    /// Constraints for the first segment of a chain: the leading and trailing
    /// response constraints, plus the left slope when `ck >= 1`.
    pub(crate) fn leading_constraints(
        &self,
        leading: &ResponseValueConstraint,
        left_slope: f64,
        trailing: &ResponseValueConstraint,
        best_fit: Option<&BestFitResponse>,
    ) -> SegmentConstraints {
        let left_derivatives = if self.design.ck >= 1 {
            vec![left_slope]
        } else {
            Vec::new()
        };
        SegmentConstraints {
            response: vec![leading.clone(), trailing.clone()],
            left_derivatives,
            best_fit: best_fit.and_then(|fit| fit.size_to_segment(&self.range)),
            ..SegmentConstraints::default()
        }
    }

    /// Constraints continuing `previous`: its right-edge value and derivatives
    /// up to the shared continuity order, plus the trailing constraint.
    pub(crate) fn continuation_constraints(
        &self,
        previous: &Segment,
        trailing: &ResponseValueConstraint,
        best_fit: Option<&BestFitResponse>,
    ) -> SplineResult<SegmentConstraints> {
        if previous.right() != self.left() {
            return Err(SplineError::invalid_input(format!(
                "segment starting at {} cannot continue one ending at {}",
                self.left(),
                previous.right()
            )));
        }
        let ck = self.design.ck.min(previous.design.ck);
        let edge = previous.edge_derivatives(Edge::Right, ck)?;
        Ok(SegmentConstraints {
            response: vec![
                ResponseValueConstraint::point(self.left(), edge.value)?,
                trailing.clone(),
            ],
            left_derivatives: edge.derivatives,
            best_fit: best_fit.and_then(|fit| fit.size_to_segment(&self.range)),
            ..SegmentConstraints::default()
        })
    }

    /// Calibrates as the first segment of a chain with the given left slope.
    pub fn calibrate_leading(
        &mut self,
        leading: &ResponseValueConstraint,
        left_slope: f64,
        trailing: &ResponseValueConstraint,
        best_fit: Option<&BestFitResponse>,
    ) -> SplineResult<()> {
        let constraints = self.leading_constraints(leading, left_slope, trailing, best_fit);
        self.calibrate(&constraints)
    }

    /// Calibrates as the continuation of `previous`.
    pub fn calibrate_from(
        &mut self,
        previous: &Segment,
        trailing: &ResponseValueConstraint,
        best_fit: Option<&BestFitResponse>,
    ) -> SplineResult<()> {
        let constraints = self.continuation_constraints(previous, trailing, best_fit)?;
        self.calibrate(&constraints)
    }

    fn assemble(&self, constraints: &SegmentConstraints) -> SplineResult<Calibration> {
        let basis = self.basis_count();
        let width = self.range.width();
        let explicit_rows = constraints.row_count();

        let mut matrix = DMatrix::zeros(basis, basis);
        let mut rhs = DVector::zeros(basis);
        let mut rows = Vec::with_capacity(basis);
        let mut left_value_row = None;
        let mut right_value_row = None;

        for (k, constraint) in constraints.response.iter().enumerate() {
            let mut row = DVector::zeros(basis);
            for (&x, &w) in constraint.ordinates().iter().zip(constraint.weights()) {
                row += self.global_basis_row(x, 0)? * w;
            }
            let r = rows.len();
            matrix.set_row(r, &row.transpose());
            rhs[r] = constraint.value();
            rows.push(RowKind::Response(k));

            match constraint.as_point() {
                Some(x) if x == self.left() && left_value_row.is_none() => left_value_row = Some(r),
                Some(x) if x == self.right() && right_value_row.is_none() => {
                    right_value_row = Some(r);
                }
                _ => {}
            }
        }

        for constraint in &constraints.flexure {
            if constraint.weights().len() != basis {
                return Err(SplineError::invalid_input(format!(
                    "flexure constraint has {} weights for {basis} coefficients",
                    constraint.weights().len()
                )));
            }
            let r = rows.len();
            for (j, &w) in constraint.weights().iter().enumerate() {
                matrix[(r, j)] = w;
            }
            rhs[r] = constraint.value();
            rows.push(RowKind::Flexure);
        }

        let edges = [
            (0.0, &constraints.left_derivatives, true),
            (1.0, &constraints.right_derivatives, false),
        ];
        for (u, derivatives, is_left) in edges {
            for (i, &value) in derivatives.iter().enumerate() {
                let order = i + 1;
                if !value.is_finite() {
                    return Err(SplineError::invalid_input(format!(
                        "edge derivative of order {order} is not finite"
                    )));
                }
                let row = self.evaluator.basis_row(u, order, &self.range) / width.powi(order as i32);
                let r = rows.len();
                matrix.set_row(r, &row.transpose());
                rhs[r] = value;
                rows.push(if is_left {
                    RowKind::LeftDerivative(order)
                } else {
                    RowKind::RightDerivative(order)
                });
            }
        }

        let remaining = basis - explicit_rows;
        if remaining > 0 {
            let (gram, target) = self.objective(constraints.best_fit.as_ref())?;
            if gram.iter().all(|v| *v == 0.0) {
                return Err(SplineError::InsufficientConstraints {
                    rows: explicit_rows,
                    basis,
                });
            }
            let constrained = matrix.rows(0, explicit_rows).into_owned();
            let complement = null_space(&constrained, remaining)?;
            let penalty_rows = complement.transpose() * &gram;
            let penalty_rhs = complement.transpose() * &target;
            for k in 0..remaining {
                matrix.set_row(explicit_rows + k, &penalty_rows.row(k));
                rhs[explicit_rows + k] = penalty_rhs[k];
                rows.push(RowKind::Penalty);
            }
        }

        Ok(Calibration {
            matrix,
            rhs,
            rows,
            left_value_row,
            right_value_row,
        })
    }

    /// Quadratic objective `(G, q)` of the penalties and best-fit points:
    /// minimizing `½cᵀGc - qᵀc`.
    fn objective(
        &self,
        best_fit: Option<&BestFitResponse>,
    ) -> SplineResult<(DMatrix<f64>, DVector<f64>)> {
        let basis = self.basis_count();
        let mut gram = DMatrix::zeros(basis, basis);
        let mut target = DVector::zeros(basis);

        let rule = GaussLegendre::new(DEFAULT_ORDER)?;
        for penalty in self.design.penalties() {
            for (u, w) in rule.mapped(0.0, 1.0) {
                let row = self
                    .evaluator
                    .basis_row(u, penalty.derivative_order, &self.range);
                gram += &row * row.transpose() * (w * penalty.amplitude);
            }
        }

        if let Some(fit) = best_fit {
            for (x, y, w) in fit.points() {
                let row = self.global_basis_row(x, 0)?;
                gram += &row * row.transpose() * w;
                target += row * (w * y);
            }
        }

        Ok((gram, target))
    }

    /// Global-ordinate derivative row of every basis function at `x`.
    pub(crate) fn global_basis_row(&self, x: f64, order: usize) -> SplineResult<DVector<f64>> {
        let u = self.localize_checked(x)?;
        Ok(self.evaluator.basis_row(u, order, &self.range) / self.range.width().powi(order as i32))
    }

    fn localize_checked(&self, x: f64) -> SplineResult<f64> {
        if !self.range.contains(x) {
            return Err(SplineError::out_of_domain(x, self.left(), self.right()));
        }
        Ok(self.range.localize(x))
    }

    fn fitted(&self) -> SplineResult<&DVector<f64>> {
        self.coefficients.as_ref().ok_or(SplineError::NotCalibrated)
    }

    /// Response value at global ordinate `x`.
    pub fn response_value(&self, x: f64) -> SplineResult<f64> {
        self.response_value_derivative(x, 0)
    }

    /// Global derivative of the given order at `x`.
    pub fn response_value_derivative(&self, x: f64, order: usize) -> SplineResult<f64> {
        let coefficients = self.fitted()?;
        let u = self.localize_checked(x)?;
        Ok(self
            .evaluator
            .response_derivative(coefficients, u, order, &self.range)
            / self.range.width().powi(order as i32))
    }

    /// Value and the first `count` derivatives at `x`.
    pub fn derivatives_at(&self, x: f64, count: usize) -> SplineResult<EdgeDerivatives> {
        let value = self.response_value(x)?;
        let derivatives = (1..=count)
            .map(|order| self.response_value_derivative(x, order))
            .collect::<SplineResult<Vec<_>>>()?;
        Ok(EdgeDerivatives::new(value, derivatives))
    }

    /// Value and the first `count` derivatives at an edge.
    pub fn edge_derivatives(&self, edge: Edge, count: usize) -> SplineResult<EdgeDerivatives> {
        match edge {
            Edge::Left => self.derivatives_at(self.left(), count),
            Edge::Right => self.derivatives_at(self.right(), count),
        }
    }

    /// Left-edge value and derivatives of orders `1..=count`.
    pub fn left_edge_derivatives(&self, count: usize) -> SplineResult<EdgeDerivatives> {
        self.edge_derivatives(Edge::Left, count)
    }

    /// Right-edge value and derivatives of orders `1..=count`.
    pub fn right_edge_derivatives(&self, count: usize) -> SplineResult<EdgeDerivatives> {
        self.edge_derivatives(Edge::Right, count)
    }

    fn recorded(&self) -> SplineResult<&Calibration> {
        self.calibration.as_ref().ok_or(SplineError::NotCalibrated)
    }

    /// `∂c/∂r`: the `M x M` Jacobian of the coefficients with respect to the
    /// right-hand side of the last calibration.
    pub fn jack_dcoeff_dedge_inputs(&self) -> SplineResult<&DMatrix<f64>> {
        if let Some(jacobian) = self.jacobian.get() {
            return Ok(jacobian);
        }
        let inverse = invert(&self.recorded()?.matrix)?;
        Ok(self.jacobian.get_or_init(|| inverse))
    }

    /// `∂f⁽ᵒʳᵈᵉʳ⁾(x)/∂r`, one entry per calibration row.
    pub fn jack_dresponse_dedge_inputs(&self, x: f64, order: usize) -> SplineResult<DVector<f64>> {
        let row = self.global_basis_row(x, order)?;
        Ok(self.jack_dcoeff_dedge_inputs()?.transpose() * row)
    }

    /// `M x 2` Jacobian of the coefficients with respect to the left and
    /// right edge values.
    pub fn jack_dcoeff_dedge_values(&self) -> SplineResult<DMatrix<f64>> {
        let left = self.value_row(Edge::Left)?;
        let right = self.value_row(Edge::Right)?;
        let jacobian = self.jack_dcoeff_dedge_inputs()?;
        let mut edges = DMatrix::zeros(self.basis_count(), 2);
        edges.set_column(0, &jacobian.column(left));
        edges.set_column(1, &jacobian.column(right));
        Ok(edges)
    }

    fn value_row(&self, edge: Edge) -> SplineResult<usize> {
        let calibration = self.recorded()?;
        match edge {
            Edge::Left => calibration.left_value_row,
            Edge::Right => calibration.right_value_row,
        }
        .ok_or_else(|| {
            SplineError::invalid_input(format!("segment was not calibrated to a {edge:?} edge value"))
        })
    }

    /// Origin of every row of the last calibration, in system order.
    pub(crate) fn row_kinds(&self) -> SplineResult<&[RowKind]> {
        Ok(&self.recorded()?.rows)
    }

    /// Replaces the recorded edge value and re-solves the recorded system.
    ///
    /// The system matrix is unchanged, so a cached Jacobian stays valid.
    pub fn reset_node(&mut self, edge: Edge, value: f64) -> SplineResult<()> {
        if !value.is_finite() {
            return Err(SplineError::invalid_input("node value must be finite"));
        }
        let row = self.value_row(edge)?;
        let mut rhs = self.recorded()?.rhs.clone();
        rhs[row] = value;

        let coefficients = match self.jacobian.get() {
            Some(jacobian) => jacobian * &rhs,
            None => solve(&self.recorded()?.matrix, &rhs)?,
        };

        if let Some(calibration) = self.calibration.as_mut() {
            calibration.rhs = rhs;
        }
        self.coefficients = Some(coefficients);
        Ok(())
    }
}
