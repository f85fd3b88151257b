//! Sensitivity of a span's coefficients to its knot responses.
//!
//! For a sequential span the Jacobian is propagated exactly: each segment's
//! right-hand side depends linearly on the knot responses, on the previous
//! segment's coefficients through the continuity rows, and on the starting
//! slope. A natural or financial boundary removes the slope through the
//! implicit-function rule `ds/dp = -(∂g/∂p) / (∂g/∂s)`, where `g` is the
//! boundary residual.
//!
//! For a locally calibrated span every segment depends on its two edge
//! values only; edge derivatives are held fixed.

use nalgebra::{DMatrix, DVector};

use super::{CalibrationMode, Span};
use crate::error::{SplineError, SplineResult};
use crate::segment::{RowKind, Segment};
use crate::sequence::SequenceBuilder;

impl Span {
    /// `∂c/∂y`: rows are the stacked coefficients of every segment, columns
    /// the knot responses `y₀ ..= yₙ`.
    pub fn jack_dcoeff_dknot_responses(&self) -> SplineResult<DMatrix<f64>> {
        match &self.mode {
            CalibrationMode::Uncalibrated => Err(SplineError::NotCalibrated),
            CalibrationMode::Sequential { builder, .. } => self.sequential_jacobian(builder),
            CalibrationMode::Local => self.local_jacobian(),
        }
    }

    /// `∂f(x)/∂y`: sensitivity of the response at `x` to every knot response.
    pub fn jack_dresponse_dknot_responses(&self, x: f64) -> SplineResult<DVector<f64>> {
        let index = self.segment_index(x)?;
        let offset: usize = self.segments[..index].iter().map(Segment::basis_count).sum();
        let segment = &self.segments[index];
        let basis = segment.global_basis_row(x, 0)?;

        let jacobian = self.jack_dcoeff_dknot_responses()?;
        let block = jacobian.rows(offset, segment.basis_count());
        Ok(block.transpose() * basis)
    }

    fn total_rows(&self) -> usize {
        self.segments.iter().map(Segment::basis_count).sum()
    }

    fn local_jacobian(&self) -> SplineResult<DMatrix<f64>> {
        let knots = self.segments.len() + 1;
        let mut jacobian = DMatrix::zeros(self.total_rows(), knots);
        let mut offset = 0;
        for (i, segment) in self.segments.iter().enumerate() {
            let edges = segment.jack_dcoeff_dedge_values()?;
            let m = segment.basis_count();
            jacobian.view_mut((offset, i), (m, 2)).copy_from(&edges);
            offset += m;
        }
        Ok(jacobian)
    }

    fn sequential_jacobian(&self, builder: &SequenceBuilder) -> SplineResult<DMatrix<f64>> {
        let knots = self.segments.len() + 1;
        // last column carries the starting slope
        let slope_column = knots;
        let columns = knots + 1;

        let mut blocks: Vec<DMatrix<f64>> = Vec::with_capacity(self.segments.len());
        for (i, segment) in self.segments.iter().enumerate() {
            let m = segment.basis_count();
            let mut inputs = DMatrix::zeros(m, columns);

            for (r, kind) in segment.row_kinds()?.iter().enumerate() {
                match (*kind, blocks.last()) {
                    (RowKind::Response(0), None) => inputs[(r, 0)] = 1.0,
                    (RowKind::Response(1), _) => inputs[(r, i + 1)] = 1.0,
                    (RowKind::LeftDerivative(1), None) => inputs[(r, slope_column)] = 1.0,
                    (RowKind::Response(0), Some(previous)) => {
                        let row = self.continuity_row(i - 1, 0, previous)?;
                        inputs.set_row(r, &row);
                    }
                    (RowKind::LeftDerivative(order), Some(previous)) => {
                        let row = self.continuity_row(i - 1, order, previous)?;
                        inputs.set_row(r, &row);
                    }
                    (RowKind::Flexure | RowKind::Penalty, _) => {}
                    (RowKind::RightDerivative(order), _) => {
                        return Err(SplineError::invalid_input(format!(
                            "segment {i} pins a right-edge derivative of order {order}, \
                             which sequential calibration never does"
                        )));
                    }
                    (other, _) => {
                        return Err(SplineError::invalid_input(format!(
                            "segment {i} has an unexpected {other:?} row for sequential sensitivities"
                        )));
                    }
                }
            }

            let inverse = segment.jack_dcoeff_dedge_inputs()?;
            blocks.push(inverse * inputs);
        }

        let mut stacked = DMatrix::zeros(self.total_rows(), columns);
        let mut offset = 0;
        for block in &blocks {
            stacked.view_mut((offset, 0), block.shape()).copy_from(block);
            offset += block.nrows();
        }

        if let Some(order) = builder.boundary().target_derivative_order() {
            let last = self.segments.len() - 1;
            let residual = self.continuity_row(last, order, &blocks[last])?;
            let d_slope = residual[slope_column];
            if d_slope == 0.0 {
                return Err(SplineError::SingularSystem);
            }
            let slope_sensitivity = residual.columns(0, knots).into_owned() * (-1.0 / d_slope);
            let slope_effect = stacked.column(slope_column) * slope_sensitivity;
            let mut result = stacked.columns(0, knots).into_owned();
            result += slope_effect;
            return Ok(result);
        }

        Ok(stacked.columns(0, knots).into_owned())
    }

    /// Sensitivity of segment `index`'s right-edge derivative of `order`,
    /// given that segment's coefficient sensitivities.
    fn continuity_row(
        &self,
        index: usize,
        order: usize,
        coefficients: &DMatrix<f64>,
    ) -> SplineResult<nalgebra::RowDVector<f64>> {
        let segment = &self.segments[index];
        let basis = segment.global_basis_row(segment.right(), order)?;
        Ok(basis.transpose() * coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SpanBuilder;
    use crate::sequence::BoundaryCondition;
    use crate::span::tests::knot_span;
    use approx::assert_relative_eq;

    const X: [f64; 4] = [0.0, 1.0, 2.5, 3.0];
    const Y: [f64; 4] = [1.0, 2.0, 1.5, 3.0];
    // responses enter linearly, so a large bump has no truncation error
    const BUMP: f64 = 1e-3;

    fn bumped(y: &[f64], k: usize) -> Vec<f64> {
        let mut out = y.to_vec();
        out[k] += BUMP;
        out
    }

    fn check_against_bump(build: impl Fn(&[f64]) -> Span) {
        let base = build(&Y);
        let sample_points = [0.3, 1.0, 1.7, 2.9];
        for k in 0..Y.len() {
            let moved = build(&bumped(&Y, k));
            for &x in &sample_points {
                let analytic = base.jack_dresponse_dknot_responses(x).unwrap()[k];
                let fd = (moved.response_value(x).unwrap() - base.response_value(x).unwrap()) / BUMP;
                assert_relative_eq!(analytic, fd, epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_floating_matches_bump() {
        check_against_bump(|y| knot_span(&X, y));
    }

    #[test]
    fn test_natural_matches_bump() {
        check_against_bump(|y| {
            SpanBuilder::new("natural")
                .with_boundary(BoundaryCondition::Natural)
                .create_calibrated(&X, y)
                .unwrap()
        });
    }

    #[test]
    fn test_financial_matches_bump() {
        check_against_bump(|y| {
            SpanBuilder::new("financial")
                .with_boundary(BoundaryCondition::Financial)
                .create_calibrated(&X, y)
                .unwrap()
        });
    }

    #[test]
    fn test_hermite_matches_bump() {
        let slopes = [0.5, 0.0, -0.2, 1.0];
        check_against_bump(|y| {
            SpanBuilder::new("hermite")
                .create_hermite(&X, y, &slopes)
                .unwrap()
        });
    }

    #[test]
    fn test_knot_rows_are_unit() {
        let span = knot_span(&X, &Y);
        for (k, &x) in X.iter().enumerate() {
            let row = span.jack_dresponse_dknot_responses(x).unwrap();
            for j in 0..X.len() {
                let expected = if j == k { 1.0 } else { 0.0 };
                assert_relative_eq!(row[j], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_shape_and_uncalibrated() {
        let span = knot_span(&X, &Y);
        let jacobian = span.jack_dcoeff_dknot_responses().unwrap();
        assert_eq!(jacobian.shape(), (12, 4));

        let raw = SpanBuilder::new("raw").create_uncalibrated(&X).unwrap();
        assert_eq!(
            raw.jack_dcoeff_dknot_responses(),
            Err(SplineError::NotCalibrated)
        );
    }
}
