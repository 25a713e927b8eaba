//! QUIRE for instance-label pairs.
//!
//! Scores each unlabeled pair by combining how well it is explained by the
//! labeled pairs (informativeness) with how it is tied to the rest of the
//! unlabeled pairs (representativeness), using the regularized inverse
//! `L = (K + λI)⁻¹` of the kernel matrix.
//!
//! Reference: Huang, S.; Jin, R.; and Zhou, Z. 2014. Active learning by
//! querying informative and representative examples. IEEE TPAMI 36(10).

use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

use crate::config::QuireConfig;
use crate::data_handling::{validate_partition, LabelMatrix, LabelPair};
use crate::error::QueryError;
use crate::kernels::Kernel;
use crate::math::{invert, submatrix};
use crate::models::utils::nsmallest_arg;
use crate::query::MultiLabelQuery;

pub struct QuireSelector {
    lambda: f64,
    kernel_matrix: Array2<f64>,
    l: Array2<f64>,
    labels: LabelMatrix,
}

impl QuireSelector {
    /// Build the selector: compute K once and its regularized inverse.
    ///
    /// # Arguments
    ///
    /// * `x` - Feature matrix of the whole dataset.
    /// * `y` - Label matrix of the whole dataset (codes -1, 0, 0.5, 1).
    /// * `kernel` - Named kernel or callable.
    /// * `lambda` - Regularization added to the kernel diagonal.
    pub fn new<S, T>(
        x: &ArrayBase<S, Ix2>,
        y: &ArrayBase<T, Ix2>,
        kernel: impl Into<Kernel>,
        lambda: f64,
    ) -> Result<Self, QueryError>
    where
        S: Data<Elem = f64>,
        T: Data<Elem = f64>,
    {
        if x.nrows() != y.nrows() {
            return Err(QueryError::ShapeMismatch {
                context: "feature and label matrices must have the same number of rows",
                expected: (x.nrows(), y.ncols()),
                found: y.dim(),
            });
        }
        let labels = LabelMatrix::new(y)?;
        let kernel = kernel.into();
        let kernel_matrix = kernel.compute(x, x)?;

        let n = x.nrows();
        let regularized = &kernel_matrix + &(Array2::<f64>::eye(n) * lambda);
        let l = invert(&regularized)?;

        log::debug!(
            "QUIRE: {:?} kernel over {} instances, {} labels, lambda = {}",
            kernel,
            n,
            labels.n_labels(),
            lambda
        );

        Ok(Self {
            lambda,
            kernel_matrix,
            l,
            labels,
        })
    }

    pub fn from_config<S, T>(
        x: &ArrayBase<S, Ix2>,
        y: &ArrayBase<T, Ix2>,
        config: &QuireConfig,
    ) -> Result<Self, QueryError>
    where
        S: Data<Elem = f64>,
        T: Data<Elem = f64>,
    {
        Self::new(x, y, config.kernel.clone(), config.lambda)
    }

    pub fn kernel_matrix(&self) -> &Array2<f64> {
        &self.kernel_matrix
    }

    /// `(K + λI)⁻¹`
    pub fn regularized_inverse(&self) -> &Array2<f64> {
        &self.l
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn n_instances(&self) -> usize {
        self.labels.n_instances()
    }

    /// Number of labels, not counting the dummy class.
    pub fn n_classes(&self) -> usize {
        self.labels.n_labels()
    }

    /// Precision between two pairs. Labels are independent problems sharing
    /// one kernel, so pairs of different classes are uncoupled.
    fn pair_precision(&self, a: LabelPair, b: LabelPair) -> f64 {
        if a.class == b.class {
            self.l[[a.instance, b.instance]]
        } else {
            0.0
        }
    }

    fn pair_block(&self, rows: &[LabelPair], cols: &[LabelPair]) -> Array2<f64> {
        Array2::from_shape_fn((rows.len(), cols.len()), |(i, j)| {
            self.pair_precision(rows[i], cols[j])
        })
    }

    /// Selection score of every unlabeled pair; lower is selected first.
    pub fn scores(
        &self,
        labeled: &[LabelPair],
        unlabeled: &[LabelPair],
    ) -> Result<Array1<f64>, QueryError> {
        if unlabeled.is_empty() {
            return Err(QueryError::EmptyCandidateSet);
        }
        validate_partition(labeled, unlabeled, self.n_instances(), self.n_classes())?;

        let n_u = unlabeled.len();
        let luu = self.pair_block(unlabeled, unlabeled);
        let lsu = self.pair_block(labeled, unlabeled);
        let ll = invert(&luu)?;

        let ys: Array1<f64> = labeled.iter().map(|&p| self.labels.get(p)).collect();
        let ys_lsu = if labeled.is_empty() {
            Array1::zeros(n_u)
        } else {
            ys.dot(&lsu)
        };

        let mut vals = Array1::<f64>::zeros(n_u);
        for i in 0..n_u {
            let rest: Vec<usize> = (0..n_u).filter(|&j| j != i).collect();
            let lqq = luu[[i, i]];
            let lqr: Array1<f64> = rest.iter().map(|&j| luu[[i, j]]).collect();
            let inv_lrr = leave_one_out_inverse(&ll, i);

            let vt1: Array1<f64> = rest.iter().map(|&j| ys_lsu[j]).collect();
            let vt2 = 2.0 * ys_lsu[i];

            // the candidate's unknown label taken as +1 and as -1
            let plus = &vt1 + &lqr;
            let minus = &vt1 - &lqr;
            let t1 = vt2 - plus.dot(&inv_lrr.dot(&plus));
            let t2 = -vt2 - minus.dot(&inv_lrr.dot(&minus));

            vals[i] = (lqq + t1).max(lqq + t2);
        }

        Ok(vals)
    }

    /// The single best unlabeled pair.
    pub fn select_pair(
        &self,
        labeled: &[LabelPair],
        unlabeled: &[LabelPair],
    ) -> Result<LabelPair, QueryError> {
        match unlabeled {
            [] => Err(QueryError::EmptyCandidateSet),
            [only] => Ok(*only),
            _ => {
                let vals = self.scores(labeled, unlabeled)?;
                let best = nsmallest_arg(&vals.to_vec(), 1)[0];
                log::trace!(
                    "QUIRE selected {} with score {:.6} among {} candidates",
                    unlabeled[best],
                    vals[best],
                    unlabeled.len()
                );
                Ok(unlabeled[best])
            }
        }
    }
}

impl MultiLabelQuery for QuireSelector {
    fn select(
        &mut self,
        labeled: &[LabelPair],
        unlabeled: &[LabelPair],
    ) -> Result<Vec<LabelPair>, QueryError> {
        self.select_pair(labeled, unlabeled).map(|pair| vec![pair])
    }

    fn name(&self) -> &str {
        "QUIRE"
    }
}

/// Inverse of `A` with row and column `i` removed, given `inv = A⁻¹`.
///
/// Uses the rank-one correction `inv[r, r] - inv[r, i] inv[i, r] / inv[i, i]`
/// instead of re-inverting the (n-1) x (n-1) block.
pub fn leave_one_out_inverse(inv: &Array2<f64>, i: usize) -> Array2<f64> {
    let rest: Vec<usize> = (0..inv.nrows()).filter(|&j| j != i).collect();
    let pivot = inv[[i, i]];
    let b: Array1<f64> = rest.iter().map(|&j| inv[[i, j]]).collect();
    let mut out = submatrix(inv, &rest, &rest);
    for ((r, c), v) in out.indexed_iter_mut() {
        *v -= b[r] * b[c] / pivot;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelType;
    use ndarray::array;

    fn toy() -> (Array2<f64>, Array2<f64>) {
        let x = array![
            [1.0, 0.0, 2.0],
            [0.0, 1.0, -1.0],
            [1.0, 1.0, 0.0],
            [-1.0, 0.5, 1.0]
        ];
        let y = array![[1.0, -1.0], [-1.0, 1.0], [0.0, 0.0], [0.5, -1.0]];
        (x, y)
    }

    fn pairs(v: &[(usize, usize)]) -> Vec<LabelPair> {
        v.iter().map(|&p| p.into()).collect()
    }

    #[test]
    fn test_single_candidate_short_circuit() {
        let (x, y) = toy();
        let quire = QuireSelector::new(&x, &y, KernelType::Linear, 1.0).unwrap();
        let unlabeled = pairs(&[(3, 1)]);
        // no decision needed, so the partition is not inspected
        let labeled = pairs(&[(3, 1)]);
        assert_eq!(quire.select_pair(&labeled, &unlabeled).unwrap(), unlabeled[0]);
    }

    #[test]
    fn test_empty_candidates() {
        let (x, y) = toy();
        let quire = QuireSelector::new(&x, &y, KernelType::Linear, 1.0).unwrap();
        assert_eq!(
            quire.select_pair(&pairs(&[(0, 0)]), &[]),
            Err(QueryError::EmptyCandidateSet)
        );
    }

    #[test]
    fn test_pairs_of_different_classes_are_uncoupled() {
        let (x, y) = toy();
        let quire = QuireSelector::new(&x, &y, KernelType::Linear, 1.0).unwrap();
        let block = quire.pair_block(&pairs(&[(0, 0), (1, 1)]), &pairs(&[(1, 0), (1, 1)]));
        assert_eq!(block[[0, 0]], quire.regularized_inverse()[[0, 1]]);
        assert_eq!(block[[0, 1]], 0.0);
        assert_eq!(block[[1, 0]], 0.0);
        assert_eq!(block[[1, 1]], quire.regularized_inverse()[[1, 1]]);
    }

    #[test]
    fn test_leave_one_out_inverse_small() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let inv = invert(&a).unwrap();
        let loo = leave_one_out_inverse(&inv, 1);
        let direct = invert(&submatrix(&a, &[0, 2], &[0, 2])).unwrap();
        for (p, q) in loo.iter().zip(direct.iter()) {
            assert!((p - q).abs() < 1e-10);
        }
    }
}
