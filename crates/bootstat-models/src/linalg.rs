//! Dense linear algebra helpers
//!
//! Design matrices live in `ndarray` containers; the factorizations come
//! from `nalgebra`. The functions here convert at the boundary and map
//! factorization failures onto [`ModelError`].

use nalgebra::{linalg::Cholesky, DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::base::{ModelError, Result};

/// Relative tolerance under which a design column counts as linearly
/// dependent on the columns before it
pub const RANK_TOLERANCE: f64 = 1e-7;

/// Singular values below this fraction of the largest are treated as zero
const SVD_EPS: f64 = 1e-12;

pub(crate) fn to_dmatrix(x: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)])
}

pub(crate) fn to_dvector(v: ArrayView1<'_, f64>) -> DVector<f64> {
    DVector::from_iterator(v.len(), v.iter().copied())
}

pub(crate) fn from_dvector(v: &DVector<f64>) -> Array1<f64> {
    v.iter().copied().collect()
}

pub(crate) fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Indices of the columns of `x` that are linearly independent of the
/// columns preceding them.
///
/// Runs modified Gram-Schmidt over the columns in order. A column whose
/// component orthogonal to the accepted columns is no larger than
/// `tolerance` times its own norm is aliased and skipped; all-zero columns
/// are always skipped. When two columns are collinear, the later one is the
/// one dropped.
pub fn independent_columns(x: &Array2<f64>, tolerance: f64) -> Vec<usize> {
    let mut basis: Vec<Array1<f64>> = Vec::new();
    let mut kept = Vec::new();

    for (j, column) in x.axis_iter(Axis(1)).enumerate() {
        let norm = column.dot(&column).sqrt();
        if norm == 0.0 || !norm.is_finite() {
            continue;
        }

        let mut v = column.to_owned();
        // Two passes keep the projection accurate for nearly collinear columns
        for _ in 0..2 {
            for q in &basis {
                let proj = q.dot(&v);
                v.scaled_add(-proj, q);
            }
        }

        let residual = v.dot(&v).sqrt();
        if residual > tolerance * norm {
            v /= residual;
            basis.push(v);
            kept.push(j);
        }
    }

    kept
}

/// Least-squares solution of `x * beta = y` via singular value decomposition
pub fn lstsq(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    if x.nrows() != y.len() {
        return Err(ModelError::numerical(
            "lstsq",
            format!("design has {} rows, response {}", x.nrows(), y.len()),
        ));
    }

    let svd = to_dmatrix(x).svd(true, true);
    let beta = svd
        .solve(&to_dvector(y.view()), SVD_EPS)
        .map_err(|e| ModelError::numerical("lstsq", e))?;

    Ok(from_dvector(&beta))
}

/// Solve the symmetric positive definite system `a * beta = b`, returning the
/// solution and `a^{-1}`
pub fn spd_solve(
    a: &Array2<f64>,
    b: &Array1<f64>,
    operation: &'static str,
) -> Result<(Array1<f64>, Array2<f64>)> {
    let chol = Cholesky::new(to_dmatrix(a)).ok_or(ModelError::SingularMatrix(operation))?;
    let beta = chol.solve(&to_dvector(b.view()));
    let inverse = chol.inverse();
    Ok((from_dvector(&beta), from_dmatrix(&inverse)))
}

/// Inverse of a symmetric positive definite matrix
pub fn spd_inverse(a: &Array2<f64>, operation: &'static str) -> Result<Array2<f64>> {
    let chol = Cholesky::new(to_dmatrix(a)).ok_or(ModelError::SingularMatrix(operation))?;
    Ok(from_dmatrix(&chol.inverse()))
}

/// `x' * x`
pub fn gram(x: &Array2<f64>) -> Array2<f64> {
    x.t().dot(x)
}

/// `x' * diag(w) * x`
pub fn weighted_gram(x: &Array2<f64>, w: &Array1<f64>) -> Array2<f64> {
    let wx = x * &w.view().insert_axis(Axis(1));
    x.t().dot(&wx)
}

/// Determinant of a square matrix
pub fn determinant(a: &Array2<f64>) -> f64 {
    if a.is_empty() {
        return 1.0;
    }
    to_dmatrix(a).determinant()
}

/// Diagonal of the hat matrix `x (x'x)^{-1} x'`, given `(x'x)^{-1}`
pub fn leverage(x: &Array2<f64>, xtx_inv: &Array2<f64>) -> Array1<f64> {
    (&x.dot(xtx_inv) * x).sum_axis(Axis(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_independent_columns_drops_later_alias() {
        let x = array![
            [1.0, 2.0, 4.0, 0.0],
            [1.0, 3.0, 6.0, 0.0],
            [1.0, 5.0, 10.0, 0.0],
            [1.0, 7.0, 14.0, 0.0],
        ];
        assert_eq!(independent_columns(&x, RANK_TOLERANCE), vec![0, 1]);
    }

    #[test]
    fn test_independent_columns_sum_to_intercept() {
        // Full dummy coding next to an intercept: the last indicator is aliased
        let x = array![
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 1.0],
        ];
        assert_eq!(independent_columns(&x, RANK_TOLERANCE), vec![0, 1]);
    }

    #[test]
    fn test_lstsq_exact_solution() {
        let x = array![[1.0, 1.0], [1.0, 2.0], [1.0, 3.0], [1.0, 4.0]];
        let y = array![3.0, 5.0, 7.0, 9.0];
        let beta = lstsq(&x, &y).unwrap();
        assert_abs_diff_eq!(beta[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(beta[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_spd_solve_and_inverse() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];
        let (beta, inv) = spd_solve(&a, &b, "test").unwrap();
        assert_abs_diff_eq!(a.dot(&beta), b, epsilon = 1e-12);
        assert_abs_diff_eq!(a.dot(&inv), Array2::<f64>::eye(2), epsilon = 1e-12);

        let singular = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            spd_inverse(&singular, "test"),
            Err(ModelError::SingularMatrix("test"))
        ));
    }

    #[test]
    fn test_determinant_and_leverage() {
        assert_abs_diff_eq!(determinant(&array![[2.0, 1.0], [1.0, 2.0]]), 3.0, epsilon = 1e-12);

        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]];
        let inv = spd_inverse(&gram(&x), "test").unwrap();
        let h = leverage(&x, &inv);
        // Leverages sum to the number of columns
        assert_abs_diff_eq!(h.sum(), 2.0, epsilon = 1e-12);
    }
}
