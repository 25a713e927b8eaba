//! Kernel matrices between instances.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, ArrayBase, Axis, Data, Ix2};

use crate::config::KernelType;
use crate::error::QueryError;

/// User-supplied kernel: `k(X, Y)` must return an `X.nrows() x Y.nrows()` matrix.
pub type KernelFn = dyn Fn(&Array2<f64>, &Array2<f64>) -> Array2<f64> + Send + Sync;

/// A named kernel or a callable one.
#[derive(Clone)]
pub enum Kernel {
    Named(KernelType),
    Custom(Arc<KernelFn>),
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Named(kind) => write!(f, "Kernel::Named({:?})", kind),
            Kernel::Custom(_) => write!(f, "Kernel::Custom(..)"),
        }
    }
}

impl From<KernelType> for Kernel {
    fn from(kind: KernelType) -> Self {
        Kernel::Named(kind)
    }
}

impl Kernel {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Array2<f64>, &Array2<f64>) -> Array2<f64> + Send + Sync + 'static,
    {
        Kernel::Custom(Arc::new(f))
    }

    /// Parse a kernel tag (`linear`, `poly`, `rbf`) with default parameters.
    pub fn from_name(name: &str) -> Result<Self, QueryError> {
        Ok(Kernel::Named(name.parse()?))
    }

    /// Kernel matrix between the rows of `x` and the rows of `y`.
    pub fn compute<S, T>(
        &self,
        x: &ArrayBase<S, Ix2>,
        y: &ArrayBase<T, Ix2>,
    ) -> Result<Array2<f64>, QueryError>
    where
        S: Data<Elem = f64>,
        T: Data<Elem = f64>,
    {
        if x.ncols() != y.ncols() {
            return Err(QueryError::ShapeMismatch {
                context: "kernel inputs must share the feature dimension",
                expected: (y.nrows(), x.ncols()),
                found: y.dim(),
            });
        }
        let k = match self {
            Kernel::Named(KernelType::Linear) => linear_kernel(x, y),
            Kernel::Named(KernelType::Poly {
                gamma,
                coef0,
                degree,
            }) => polynomial_kernel(x, y, *gamma, *coef0, *degree),
            Kernel::Named(KernelType::Rbf { gamma }) => rbf_kernel(x, y, *gamma),
            Kernel::Custom(f) => (**f)(&x.to_owned(), &y.to_owned()),
        };

        let expected = (x.nrows(), y.nrows());
        if k.dim() != expected {
            return Err(QueryError::ShapeMismatch {
                context: "kernel matrix",
                expected,
                found: k.dim(),
            });
        }
        Ok(k)
    }
}

/// `K = X Yᵀ`
pub fn linear_kernel<S, T>(x: &ArrayBase<S, Ix2>, y: &ArrayBase<T, Ix2>) -> Array2<f64>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
{
    x.dot(&y.t())
}

/// `K = (gamma X Yᵀ + coef0)^degree`
pub fn polynomial_kernel<S, T>(
    x: &ArrayBase<S, Ix2>,
    y: &ArrayBase<T, Ix2>,
    gamma: f64,
    coef0: f64,
    degree: i32,
) -> Array2<f64>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
{
    linear_kernel(x, y).mapv(|v| (gamma * v + coef0).powi(degree))
}

/// `K[i][j] = exp(-gamma ||x_i - y_j||²)`
pub fn rbf_kernel<S, T>(x: &ArrayBase<S, Ix2>, y: &ArrayBase<T, Ix2>, gamma: f64) -> Array2<f64>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
{
    let x_sq = x.map_axis(Axis(1), |row| row.dot(&row));
    let y_sq = y.map_axis(Axis(1), |row| row.dot(&row));
    let mut k = linear_kernel(x, y);
    for ((i, j), v) in k.indexed_iter_mut() {
        // clamp tiny negatives from cancellation
        let dist = (x_sq[i] + y_sq[j] - 2.0 * *v).max(0.0);
        *v = (-gamma * dist).exp();
    }
    k
}
