use nalgebra::DMatrix;
use ndarray::{Array2, ArrayBase, Data, Ix2};

use crate::error::QueryError;

const SYMMETRY_EPS: f64 = 1e-12;

fn to_dmatrix<S>(a: &ArrayBase<S, Ix2>) -> DMatrix<f64>
where
    S: Data<Elem = f64>,
{
    let (rows, cols) = a.dim();
    DMatrix::from_fn(rows, cols, |i, j| a[[i, j]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Invert a square matrix.
///
/// Symmetric positive definite inputs (regularized kernels and their
/// principal blocks) go through a Cholesky factorization; anything else
/// falls back to LU.
///
/// # Returns
///
/// The inverse of `a`, `QueryError::ShapeMismatch` if `a` is not square, or
/// `QueryError::SingularMatrix` when neither factorization succeeds or the
/// result is not finite.
pub fn invert<S>(a: &ArrayBase<S, Ix2>) -> Result<Array2<f64>, QueryError>
where
    S: Data<Elem = f64>,
{
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(QueryError::ShapeMismatch {
            context: "matrix inversion",
            expected: (rows, rows),
            found: (rows, cols),
        });
    }
    if rows == 0 {
        return Ok(Array2::zeros((0, 0)));
    }

    let m = to_dmatrix(a);
    // cholesky() only reads the lower triangle
    let cholesky = if m.relative_eq(&m.transpose(), SYMMETRY_EPS, SYMMETRY_EPS) {
        m.clone().cholesky()
    } else {
        None
    };
    let inverse = match cholesky {
        Some(chol) => chol.inverse(),
        None => {
            log::trace!("No Cholesky factor for {}x{} matrix, falling back to LU", rows, cols);
            m.try_inverse().ok_or(QueryError::SingularMatrix)?
        }
    };
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(QueryError::SingularMatrix);
    }
    Ok(from_dmatrix(&inverse))
}

/// Extract the submatrix `a[rows, cols]`.
pub fn submatrix<S>(a: &ArrayBase<S, Ix2>, rows: &[usize], cols: &[usize]) -> Array2<f64>
where
    S: Data<Elem = f64>,
{
    Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| a[[rows[i], cols[j]]])
}
