//! Monotonicity classification of a calibrated segment.

use serde::{Deserialize, Serialize};
use stretch_math::solvers::{search_root, RootSearch, SolverConfig};

use super::{Edge, Segment};
use crate::error::SplineResult;

/// Cells used when scanning the first derivative for sign changes.
const SCAN_CELLS: usize = 32;

/// Roots closer than this to a local edge are edge extrema, not interior ones.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Derivative magnitudes below this fraction of the response scale are zero.
const FLAT_TOLERANCE: f64 = 1e-11;

/// Shape of the response inside a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Monotonicity {
    /// No interior extremum.
    Monotonic,
    /// A single interior maximum.
    Maxima,
    /// A single interior minimum.
    Minima,
    /// A stationary point with zero curvature.
    Inflection,
    /// Conflicting interior extrema.
    NonMonotonic,
}

impl Monotonicity {
    fn combine(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::NonMonotonic
        }
    }
}

impl Segment {
    /// Threshold under which a local derivative is treated as zero.
    fn flat_floor(&self) -> SplineResult<f64> {
        let scale = 1.0
            + self.response_value(self.left())?.abs()
            + self.response_value(self.right())?.abs();
        Ok(FLAT_TOLERANCE * scale)
    }

    /// Local derivative at `u`, snapped to zero below `floor`.
    fn snapped_local_derivative(&self, u: f64, order: usize, floor: f64) -> SplineResult<f64> {
        let coefficients = self.fitted()?;
        let value = self
            .evaluator
            .response_derivative(coefficients, u, order, &self.range);
        Ok(if value.abs() <= floor { 0.0 } else { value })
    }

    /// Classifies the segment from the interior roots of its first derivative.
    ///
    /// The local ordinate is split into cells and each cell is searched for a
    /// root with Brent; the sign of the second derivative at each root picks
    /// maximum, minimum or inflection. A stationary point shared by two cells
    /// is seen twice and classified once. A flat segment is monotonic.
    pub fn monotone_type(&self) -> SplineResult<Monotonicity> {
        let floor = self.flat_floor()?;
        let coefficients = self.fitted()?;

        let slope = |u: f64| {
            let v = self
                .evaluator
                .response_derivative(coefficients, u, 1, &self.range);
            if v.abs() <= floor {
                0.0
            } else {
                v
            }
        };

        let flat = (0..=SCAN_CELLS).all(|k| slope(k as f64 / SCAN_CELLS as f64) == 0.0);
        if flat {
            return Ok(Monotonicity::Monotonic);
        }

        let config = SolverConfig::default();
        let mut kind: Option<Monotonicity> = None;
        for cell in 0..SCAN_CELLS {
            let lo = cell as f64 / SCAN_CELLS as f64;
            let hi = (cell + 1) as f64 / SCAN_CELLS as f64;
            let root = match search_root(&slope, lo, hi, &config)? {
                RootSearch::Found(found) => found.root,
                RootSearch::NoRoot => continue,
            };
            if root <= EDGE_TOLERANCE || root >= 1.0 - EDGE_TOLERANCE {
                continue;
            }
            let curvature = self.snapped_local_derivative(root, 2, floor)?;
            let here = if curvature < 0.0 {
                Monotonicity::Maxima
            } else if curvature > 0.0 {
                Monotonicity::Minima
            } else {
                Monotonicity::Inflection
            };
            kind = Some(kind.map_or(here, |k| k.combine(here)));
        }

        Ok(kind.unwrap_or(Monotonicity::Monotonic))
    }

    /// Direction of travel next to an edge: `+1` rising, `-1` falling, `0` flat.
    ///
    /// At the right edge this is the direction arriving at the edge, at the
    /// left edge the direction leaving it. A zero slope defers to the
    /// curvature, so a stationary edge still reports which way the response
    /// moves beside it.
    pub fn edge_direction(&self, edge: Edge) -> SplineResult<f64> {
        let floor = self.flat_floor()?;
        let u = match edge {
            Edge::Left => 0.0,
            Edge::Right => 1.0,
        };
        let slope = self.snapped_local_derivative(u, 1, floor)?;
        if slope != 0.0 {
            return Ok(slope.signum());
        }
        let curvature = self.snapped_local_derivative(u, 2, floor)?;
        if curvature == 0.0 {
            return Ok(0.0);
        }
        Ok(match edge {
            Edge::Left => curvature.signum(),
            Edge::Right => -curvature.signum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisSetParams;
    use crate::constraint::EdgeDerivatives;
    use crate::segment::tests::segment;

    fn hermite(left: (f64, f64), right: (f64, f64)) -> Segment {
        let mut seg = segment(0.0, 1.0, BasisSetParams::cubic());
        seg.calibrate_edges(
            &EdgeDerivatives::with_slope(left.0, left.1),
            &EdgeDerivatives::with_slope(right.0, right.1),
            None,
        )
        .unwrap();
        seg
    }

    #[test]
    fn test_monotonic() {
        assert_eq!(
            hermite((0.0, 1.0), (1.0, 1.0)).monotone_type().unwrap(),
            Monotonicity::Monotonic
        );
    }

    #[test]
    fn test_edge_extremum_is_monotonic() {
        // 2u - u² peaks exactly at u = 1
        assert_eq!(
            hermite((0.0, 2.0), (1.0, 0.0)).monotone_type().unwrap(),
            Monotonicity::Monotonic
        );
    }

    #[test]
    fn test_maxima_and_minima() {
        // u - u² peaks at u = 0.5, shared by two scan cells
        assert_eq!(
            hermite((0.0, 1.0), (0.0, -1.0)).monotone_type().unwrap(),
            Monotonicity::Maxima
        );
        assert_eq!(
            hermite((0.0, -1.0), (0.0, 1.0)).monotone_type().unwrap(),
            Monotonicity::Minima
        );
    }

    #[test]
    fn test_two_extrema_non_monotonic() {
        // Rises, dips, rises: one maximum and one minimum
        assert_eq!(
            hermite((0.0, 3.0), (0.0, 3.0)).monotone_type().unwrap(),
            Monotonicity::NonMonotonic
        );
    }

    #[test]
    fn test_flat_segment() {
        assert_eq!(
            hermite((3.0, 0.0), (3.0, 0.0)).monotone_type().unwrap(),
            Monotonicity::Monotonic
        );
    }

    #[test]
    fn test_edge_direction() {
        let peak_at_right = hermite((0.0, 2.0), (1.0, 0.0));
        assert_eq!(peak_at_right.edge_direction(Edge::Right).unwrap(), 1.0);
        assert_eq!(peak_at_right.edge_direction(Edge::Left).unwrap(), 1.0);

        let falling_from_left = hermite((1.0, 0.0), (0.0, 0.0));
        assert_eq!(falling_from_left.edge_direction(Edge::Left).unwrap(), -1.0);
        assert_eq!(falling_from_left.edge_direction(Edge::Right).unwrap(), -1.0);
    }
}
