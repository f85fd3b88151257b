//! Response evaluation from basis coefficients.

use nalgebra::DVector;
use stretch_math::combinatorics::binomial;

use super::{BasisSetParams, FunctionSet, FunctionSetBuilder, ShapeControl};
use crate::error::{SplineError, SplineResult};
use crate::range::SegmentRange;

/// Affine map `v = offset + scale·u` from a segment's local ordinate `u` to
/// the argument `v` of its basis functions.
///
/// Segments cut out of a wider segment keep the parent's frame, so the basis
/// spans the same functions of the global ordinate as it did on the parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// Basis argument at `u = 0`.
    pub offset: f64,
    /// Change of the basis argument per unit of `u`.
    pub scale: f64,
}

impl Default for LocalFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LocalFrame {
    /// `v = u`.
    pub const IDENTITY: LocalFrame = LocalFrame {
        offset: 0.0,
        scale: 1.0,
    };

    /// Frame placing `inner` inside the local ordinate of `outer`.
    #[must_use]
    pub fn of_subrange(outer: &SegmentRange, inner: &SegmentRange) -> Self {
        Self {
            offset: outer.localize(inner.left()),
            scale: inner.width() / outer.width(),
        }
    }

    /// Basis argument at `u`.
    #[must_use]
    pub fn argument(&self, u: f64) -> f64 {
        self.offset + self.scale * u
    }

    /// This frame applied after `inner`.
    #[must_use]
    pub fn compose(&self, inner: &LocalFrame) -> Self {
        Self {
            offset: self.argument(inner.offset),
            scale: self.scale * inner.scale,
        }
    }
}

/// A basis set with an optional shape multiplier.
///
/// The response on a segment is `s(t) Σᵢ cᵢ bᵢ(v)` where `v` is the frame's
/// image of the local ordinate `u` and `t` is `v` or the global ordinate
/// depending on the shape control. Every derivative here is taken with
/// respect to `u`; callers rescale to global derivatives. Evaluators are
/// shared read-only between segments, so the segment range is passed in.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisEvaluator {
    functions: FunctionSet,
    shape: Option<ShapeControl>,
    frame: LocalFrame,
}

impl BasisEvaluator {
    /// Wraps a function set.
    #[must_use]
    pub fn new(functions: FunctionSet, shape: Option<ShapeControl>) -> Self {
        Self {
            functions,
            shape,
            frame: LocalFrame::IDENTITY,
        }
    }

    /// Builds the function set for `basis` through [`FunctionSetBuilder`].
    pub fn from_params(basis: &BasisSetParams, shape: Option<ShapeControl>) -> SplineResult<Self> {
        let functions = FunctionSetBuilder::build(basis).ok_or_else(|| {
            SplineError::invalid_input(format!("invalid basis parameters {basis:?}"))
        })?;
        Ok(Self::new(functions, shape))
    }

    /// The same basis seen through `frame` on top of the current one.
    #[must_use]
    pub fn reframed(&self, frame: LocalFrame) -> Self {
        Self {
            frame: self.frame.compose(&frame),
            ..self.clone()
        }
    }

    /// Frame from the local ordinate to the basis argument.
    #[must_use]
    pub fn frame(&self) -> LocalFrame {
        self.frame
    }

    /// Number of basis functions.
    #[must_use]
    pub fn basis_count(&self) -> usize {
        self.functions.len()
    }

    /// The underlying basis set.
    #[must_use]
    pub fn functions(&self) -> &FunctionSet {
        &self.functions
    }

    /// The shape control, if any.
    #[must_use]
    pub fn shape(&self) -> Option<&ShapeControl> {
        self.shape.as_ref()
    }

    /// `dʲs/duʲ` for `j = 0..=order`.
    fn shape_factors(&self, u: f64, order: usize, range: &SegmentRange) -> Option<Vec<f64>> {
        let control = self.shape.as_ref()?;
        let (t, scale) = if control.localize {
            (self.frame.argument(u), self.frame.scale)
        } else {
            (range.delocalize(u), range.width())
        };
        let mut factors = control.function.derivatives(t, order);
        for (j, f) in factors.iter_mut().enumerate() {
            *f *= scale.powi(j as i32);
        }
        Some(factors)
    }

    /// `dᵏbᵢ/duᵏ` through the frame.
    fn framed(&self, index: usize, u: f64, order: usize) -> f64 {
        self.frame.scale.powi(order as i32)
            * self
                .functions
                .derivative(index, self.frame.argument(u), order)
    }

    fn shaped(&self, index: usize, u: f64, order: usize, factors: Option<&[f64]>) -> f64 {
        match factors {
            None => self.framed(index, u, order),
            Some(s) => (0..=order)
                .map(|j| binomial(order, j) * s[j] * self.framed(index, u, order - j))
                .sum(),
        }
    }

    /// Local derivative of basis function `index` at `u`.
    #[must_use]
    pub fn basis_derivative(&self, index: usize, u: f64, order: usize, range: &SegmentRange) -> f64 {
        let factors = self.shape_factors(u, order, range);
        self.shaped(index, u, order, factors.as_deref())
    }

    /// Local derivatives of every basis function at `u`.
    #[must_use]
    pub fn basis_row(&self, u: f64, order: usize, range: &SegmentRange) -> DVector<f64> {
        let factors = self.shape_factors(u, order, range);
        DVector::from_iterator(
            self.basis_count(),
            (0..self.basis_count()).map(|i| self.shaped(i, u, order, factors.as_deref())),
        )
    }

    /// Response value at `u`.
    #[must_use]
    pub fn response_value(&self, coefficients: &DVector<f64>, u: f64, range: &SegmentRange) -> f64 {
        self.response_derivative(coefficients, u, 0, range)
    }

    /// Local derivative of the response at `u`.
    #[must_use]
    pub fn response_derivative(
        &self,
        coefficients: &DVector<f64>,
        u: f64,
        order: usize,
        range: &SegmentRange,
    ) -> f64 {
        self.basis_row(u, order, range).dot(coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::ShapeFunction;
    use approx::assert_relative_eq;

    fn unit_range() -> SegmentRange {
        SegmentRange::new(0.0, 1.0).unwrap()
    }

    #[test]
    fn test_cubic_response() {
        let evaluator = BasisEvaluator::from_params(&BasisSetParams::cubic(), None).unwrap();
        let c = DVector::from_vec(vec![1.0, 2.0, 0.0, -1.0]);
        let range = unit_range();

        assert_relative_eq!(evaluator.response_value(&c, 0.5, &range), 1.875);
        assert_relative_eq!(evaluator.response_derivative(&c, 0.5, 1, &range), 1.25);
        assert_relative_eq!(evaluator.response_derivative(&c, 0.5, 2, &range), -3.0);
        assert_eq!(evaluator.basis_count(), 4);
    }

    #[test]
    fn test_shape_applied_by_leibniz() {
        let shape = ShapeControl::local(ShapeFunction::ExponentialDecay(0.8));
        let evaluator =
            BasisEvaluator::from_params(&BasisSetParams::Polynomial { degree: 2 }, Some(shape))
                .unwrap();
        let range = unit_range();
        let h = 1e-6;

        for i in 0..3 {
            let fd = (evaluator.basis_derivative(i, 0.4 + h, 0, &range)
                - evaluator.basis_derivative(i, 0.4 - h, 0, &range))
                / (2.0 * h);
            assert_relative_eq!(evaluator.basis_derivative(i, 0.4, 1, &range), fd, epsilon = 1e-8);
        }
        assert_relative_eq!(
            evaluator.basis_derivative(0, 0.4, 0, &range),
            (-0.32_f64).exp()
        );
    }

    #[test]
    fn test_global_shape_rescales() {
        let range = SegmentRange::new(2.0, 4.0).unwrap();
        let shape = ShapeControl::global(ShapeFunction::LinearRational(0.5));
        let evaluator =
            BasisEvaluator::from_params(&BasisSetParams::Polynomial { degree: 1 }, Some(shape))
                .unwrap();

        // s(x) = 1 / (1 + 0.5 x) at x = 3, ds/du = width * ds/dx
        let s = 1.0 / 2.5;
        let ds_dx = -0.5 / (2.5 * 2.5);
        assert_relative_eq!(evaluator.basis_derivative(0, 0.5, 0, &range), s);
        assert_relative_eq!(evaluator.basis_derivative(0, 0.5, 1, &range), 2.0 * ds_dx);
    }

    #[test]
    fn test_reframed_basis_follows_parent() {
        let parent = SegmentRange::new(1.0, 5.0).unwrap();
        let child = SegmentRange::new(2.0, 3.0).unwrap();
        let frame = LocalFrame::of_subrange(&parent, &child);
        assert_relative_eq!(frame.offset, 0.25);
        assert_relative_eq!(frame.scale, 0.25);

        let shape = ShapeControl::local(ShapeFunction::QuadraticRational(2.0));
        let evaluator = BasisEvaluator::from_params(
            &BasisSetParams::HyperbolicTension { tension: 3.0 },
            Some(shape),
        )
        .unwrap();
        let reframed = evaluator.reframed(frame);

        // global derivatives agree wherever both segments are defined
        for &x in &[2.0, 2.4, 3.0] {
            let (u_parent, u_child) = (parent.localize(x), child.localize(x));
            for i in 0..4 {
                for order in 0..3 {
                    let on_parent = evaluator.basis_derivative(i, u_parent, order, &parent)
                        / parent.width().powi(order as i32);
                    let on_child = reframed.basis_derivative(i, u_child, order, &child)
                        / child.width().powi(order as i32);
                    assert_relative_eq!(on_child, on_parent, epsilon = 1e-10, max_relative = 1e-10);
                }
            }
        }

        let nested = reframed.reframed(LocalFrame::of_subrange(
            &child,
            &SegmentRange::new(2.5, 3.0).unwrap(),
        ));
        assert_relative_eq!(nested.frame().offset, 0.375);
        assert_relative_eq!(nested.frame().scale, 0.125);
    }

    #[test]
    fn test_invalid_params() {
        assert!(BasisEvaluator::from_params(&BasisSetParams::Polynomial { degree: 0 }, None).is_err());
    }
}
