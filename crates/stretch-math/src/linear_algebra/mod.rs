//! Dense linear algebra used by segment calibration.
//!
//! Segment systems are small (one row per basis function), so everything here
//! works on `nalgebra` dynamic matrices and returns the inverse alongside the
//! solution: the inverse is the sensitivity of the fitted coefficients to the
//! right-hand side.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector, Dyn, FullPivLU, SymmetricEigen};

/// Relative pivot size below which a matrix is treated as singular.
pub const SINGULARITY_THRESHOLD: f64 = 1e-13;

/// Solution of `A x = b` together with `A⁻¹`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSolution {
    /// The solution vector `x`.
    pub solution: DVector<f64>,
    /// The inverse of the system matrix.
    pub inverse: DMatrix<f64>,
}

/// Factorizes `A` and rejects it when the smallest pivot is negligible
/// relative to the largest.
fn factorize(a: &DMatrix<f64>) -> MathResult<FullPivLU<f64, Dyn, Dyn>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(MathError::invalid_input(format!(
            "Matrix must be square, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }
    if n == 0 {
        return Err(MathError::insufficient_data(1, 0));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("matrix holds non-finite entries"));
    }

    let lu = a.clone().full_piv_lu();
    let pivots = lu.u().diagonal();
    let largest = pivots.iter().fold(0.0_f64, |m, p| m.max(p.abs()));
    let smallest = pivots.iter().fold(f64::INFINITY, |m, p| m.min(p.abs()));
    if largest == 0.0 || smallest <= SINGULARITY_THRESHOLD * largest {
        return Err(MathError::SingularMatrix);
    }
    Ok(lu)
}

fn check_rhs(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<()> {
    if a.nrows() != b.len() {
        return Err(MathError::DimensionMismatch {
            rows1: a.nrows(),
            cols1: a.ncols(),
            rows2: b.len(),
            cols2: 1,
        });
    }
    if b.iter().any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("right-hand side holds non-finite entries"));
    }
    Ok(())
}

/// Solves `A x = b` by fully pivoted LU.
///
/// # Errors
///
/// * [`MathError::InvalidInput`] if `A` is not square or anything is non-finite.
/// * [`MathError::DimensionMismatch`] if `b` does not match `A`.
/// * [`MathError::SingularMatrix`] if `A` cannot be inverted.
pub fn solve(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    check_rhs(a, b)?;
    let lu = factorize(a)?;
    let solution = lu.solve(b).ok_or(MathError::SingularMatrix)?;
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(MathError::SingularMatrix);
    }
    Ok(solution)
}

/// Inverts `A`.
pub fn invert(a: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let inverse = factorize(a)?
        .try_inverse()
        .ok_or(MathError::SingularMatrix)?;
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(MathError::SingularMatrix);
    }
    Ok(inverse)
}

/// Solves `A x = b` and returns the solution together with `A⁻¹`.
///
/// Same failure contract as [`solve`].
pub fn solve_with_inverse(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<LinearSolution> {
    check_rhs(a, b)?;
    let inverse = invert(a)?;
    let solution = &inverse * b;
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(MathError::SingularMatrix);
    }
    Ok(LinearSolution { solution, inverse })
}

/// Returns an orthonormal basis (as columns) of the null space of the
/// `p x m` matrix `c`, assuming its rows are independent.
///
/// The basis has `m - p` columns; with no rows the identity is returned.
/// Columns are the eigenvectors of `cᵀc` with the smallest eigenvalues.
pub fn null_space(c: &DMatrix<f64>, columns: usize) -> MathResult<DMatrix<f64>> {
    let m = c.ncols();
    if columns > m {
        return Err(MathError::invalid_input(format!(
            "null space of width {columns} requested for {m} unknowns"
        )));
    }
    if c.nrows() == 0 {
        return Ok(DMatrix::identity(m, m).columns(0, columns).into_owned());
    }

    let gram = c.transpose() * c;
    let eigen = SymmetricEigen::new(gram);
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

    let mut basis = DMatrix::zeros(m, columns);
    for (k, &idx) in order.iter().take(columns).enumerate() {
        basis.set_column(k, &eigen.eigenvectors.column(idx));
    }
    Ok(basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_with_inverse() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![5.0, 5.0]);

        let sol = solve_with_inverse(&a, &b).unwrap();

        assert_relative_eq!(sol.solution[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(sol.solution[1], 1.0, epsilon = 1e-12);

        let identity = &a * &sol.inverse;
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(identity[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_hermite_cubic_system() {
        // Monomial cubic: f(0) = 1, f(1) = 2, f'(0) = 0, f'(1) = 0
        let a = DMatrix::from_row_slice(
            4,
            4,
            &[
                1.0, 0.0, 0.0, 0.0, //
                1.0, 1.0, 1.0, 1.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 1.0, 2.0, 3.0,
            ],
        );
        let b = DVector::from_vec(vec![1.0, 2.0, 0.0, 0.0]);

        let sol = solve_with_inverse(&a, &b).unwrap();

        assert_relative_eq!(sol.solution[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(sol.solution[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(sol.solution[2], 3.0, epsilon = 1e-12);
        assert_relative_eq!(sol.solution[3], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_matches_inverse() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0]);
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        let direct = solve(&a, &b).unwrap();
        let via_inverse = invert(&a).unwrap() * &b;

        for i in 0..3 {
            assert_relative_eq!(direct[i], via_inverse[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_singular_detected() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(solve_with_inverse(&a, &b), Err(MathError::SingularMatrix));
        assert_eq!(solve(&a, &b), Err(MathError::SingularMatrix));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = DMatrix::identity(3, 3);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            solve_with_inverse(&a, &b),
            Err(MathError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_null_space_is_orthogonal_to_rows() {
        let c = DMatrix::from_row_slice(2, 4, &[1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);

        let n = null_space(&c, 2).unwrap();
        let product = &c * &n;

        assert_eq!(n.ncols(), 2);
        for v in product.iter() {
            assert!(v.abs() < 1e-12);
        }
        let gram = n.transpose() * &n;
        assert_relative_eq!(gram[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(gram[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_null_space_without_rows() {
        let c = DMatrix::<f64>::zeros(0, 3);
        let n = null_space(&c, 3).unwrap();
        assert_eq!(n, DMatrix::identity(3, 3));
    }
}
