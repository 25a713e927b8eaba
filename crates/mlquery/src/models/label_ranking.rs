//! Label ranking model combined with threshold learning.
//!
//! Each class (including the dummy class) owns `num_sub` sub-prototypes, so
//! the score of an instance for a class is the best of several bilinear
//! scores `b_kᵀ V x`. Training is online margin-ranking SGD with sampled
//! negatives, and predictions use a Polyak average of the parameters. A class
//! is predicted relevant when it outscores the dummy class, which acts as a
//! per-instance threshold.

use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;

use crate::config::RankingConfig;
use crate::data_handling::{LabelMatrix, LabelPair};
use crate::error::QueryError;
use crate::math::{project_columns_onto_ball, project_onto_ball};
use crate::models::utils::{harmonic_costs, randperm};

/// Optional per-instance preference: `positive` should rank above `negative`.
///
/// When the anchor class of a training pair equals `positive`, `negative` is
/// added to the negatives sampled for that pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankingHint {
    pub positive: Option<usize>,
    pub negative: Option<usize>,
}

/// Mutable parameters of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingState {
    /// Sub-prototypes, D x (n_classes * num_sub), class-major
    pub b: Array2<f64>,
    /// Random-feature projection, D x d
    pub v: Array2<f64>,
    pub ab: Array2<f64>,
    pub av: Array2<f64>,
    pub anum: usize,
    /// Number of SGD updates taken so far
    pub trounds: usize,
}

/// Draws up to `remaining` negatives uniformly, with replacement.
struct NegativeSampler<'a, R: Rng> {
    pool: &'a [usize],
    remaining: usize,
    rng: &'a mut R,
}

impl<'a, R: Rng> NegativeSampler<'a, R> {
    fn new(pool: &'a [usize], rng: &'a mut R) -> Self {
        Self {
            pool,
            remaining: pool.len(),
            rng,
        }
    }
}

impl<'a, R: Rng> Iterator for NegativeSampler<'a, R> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.pool[self.rng.gen_range(0..self.pool.len())])
    }
}

/// Best sub-prototype score of `class` for an embedded instance.
fn best_sub_prototype(
    b: &Array2<f64>,
    num_sub: usize,
    class: usize,
    embedding: &Array1<f64>,
) -> (f64, usize) {
    (0..num_sub)
        .map(|s| (b.column(class * num_sub + s).dot(embedding), s))
        .fold((f64::NEG_INFINITY, 0), |best, cur| {
            if cur.0 > best.0 {
                cur
            } else {
                best
            }
        })
}

pub struct LabelRankingModel {
    config: RankingConfig,
    n_classes: usize,
    n_dims: usize,
    costs: Vec<f64>,
    max_query: usize,
    state: RankingState,
    rng: StdRng,
}

impl LabelRankingModel {
    /// Initialize the model on `(x, y)` and warm-start it with
    /// `config.n_repeat` training passes.
    ///
    /// # Arguments
    ///
    /// * `x` - Feature matrix, one row per instance.
    /// * `y` - Label matrix using the codes -1, 0, 0.5, 1, with an optional
    ///   trailing dummy column of 2s.
    /// * `config` - Model hyper-parameters.
    ///
    /// # Returns
    ///
    /// The trained model, `ShapeMismatch` / `InvalidLabelCode` on bad input, or
    /// `InvalidConfig` when `num_sub` or `average_size` is zero.
    pub fn new<S, T>(
        x: &ArrayBase<S, Ix2>,
        y: &ArrayBase<T, Ix2>,
        config: RankingConfig,
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

        if config.num_sub == 0 {
            return Err(QueryError::InvalidConfig(
                "num_sub must be at least 1".to_string(),
            ));
        }
        if config.average_size == 0 {
            return Err(QueryError::InvalidConfig(
                "average_size must be at least 1".to_string(),
            ));
        }

        let d = x.ncols();
        if d == 0 {
            return Err(QueryError::ShapeMismatch {
                context: "feature matrix has no columns",
                expected: (x.nrows(), 1),
                found: x.dim(),
            });
        }
        let n_classes = labels.n_classes();
        let num_sub = config.num_sub;
        let big_d = config.n_features;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let normal = Normal::new(0.0, 1.0 / (d as f64).sqrt())
            .map_err(|e| QueryError::InvalidConfig(format!("initial weight distribution: {}", e)))?;

        let mut v = Array2::from_shape_simple_fn((big_d, d), || normal.sample(&mut rng));
        let mut b = Array2::from_shape_simple_fn((big_d, n_classes * num_sub), || {
            normal.sample(&mut rng)
        });
        project_columns_onto_ball(&mut v, config.norm_bound());
        project_columns_onto_ball(&mut b, config.norm_bound());

        let state = RankingState {
            ab: Array2::zeros(b.dim()),
            av: Array2::zeros(v.dim()),
            b,
            v,
            anum: 0,
            trounds: 0,
        };

        let n = labels.n_instances();
        let mut model = Self {
            costs: harmonic_costs(n_classes * num_sub),
            max_query: n * (n_classes - 1) / 2,
            n_classes,
            n_dims: d,
            config,
            state,
            rng,
        };

        log::debug!(
            "Initialized label ranking model: {} instances, {} features, {} classes (incl. dummy), D = {}",
            n,
            d,
            n_classes,
            big_d
        );

        for pass in 0..model.config.n_repeat {
            let updates = model.train(x, &labels, None)?;
            log::trace!("Warm-start pass {}: {} updates", pass, updates);
        }

        Ok(model)
    }

    /// Run one SGD pass over the relevant and dummy pairs of `targets`.
    ///
    /// Pairs are visited in a fresh random permutation. Returns the number of
    /// updates taken, i.e. how many pairs found a margin-violating negative.
    pub fn train<S>(
        &mut self,
        data: &ArrayBase<S, Ix2>,
        targets: &LabelMatrix,
        hints: Option<&[RankingHint]>,
    ) -> Result<usize, QueryError>
    where
        S: Data<Elem = f64>,
    {
        self.check_data(data)?;
        if data.nrows() != targets.n_instances() || targets.n_classes() != self.n_classes {
            return Err(QueryError::ShapeMismatch {
                context: "training targets",
                expected: (data.nrows(), self.n_classes),
                found: (targets.n_instances(), targets.n_classes()),
            });
        }
        if let Some(hints) = hints {
            if hints.len() != targets.n_instances() {
                return Err(QueryError::ShapeMismatch {
                    context: "one ranking hint per instance",
                    expected: (targets.n_instances(), 1),
                    found: (hints.len(), 1),
                });
            }
        }

        let num_sub = self.config.num_sub;
        let norm_up = self.config.norm_bound();
        let dummy = targets.dummy_class();
        let anchors = targets.anchors();
        let order = randperm(anchors.len(), &mut self.rng);
        let mut updates = 0;

        for (visit, &idx) in order.iter().enumerate() {
            let LabelPair { instance, class } = anchors[idx];
            let x = data.row(instance);
            let embedding = self.state.v.dot(&x);
            let (fy, sub_y) = best_sub_prototype(&self.state.b, num_sub, class, &embedding);

            let pool = negative_pool(targets, hints, instance, class, dummy);
            let n_irr = pool.len();
            let b = &self.state.b;
            let violation = NegativeSampler::new(&pool, &mut self.rng)
                .enumerate()
                .map(|(attempt, neg)| {
                    let (fyn, sub_n) = best_sub_prototype(b, num_sub, neg, &embedding);
                    (attempt, neg, fyn, sub_n)
                })
                .find(|&(_, _, fyn, _)| fyn > fy - 1.0);

            if let Some((attempt, neg, _, sub_n)) = violation {
                let step_size = self.config.step_size0
                    / (1.0 + self.config.lambda * self.state.trounds as f64 * self.config.step_size0);
                self.state.trounds += 1;
                let rank = (n_irr / (attempt + 1)).clamp(1, self.costs.len());
                let scale = step_size * self.costs[rank - 1];

                self.sgd_step(
                    x,
                    &embedding,
                    class * num_sub + sub_y,
                    neg * num_sub + sub_n,
                    scale,
                    norm_up,
                );
                updates += 1;
            }

            if self.state.trounds > self.config.average_begin
                && visit % self.config.average_size == 0
            {
                self.state.ab += &self.state.b;
                self.state.av += &self.state.v;
                self.state.anum += 1;
            }
        }

        Ok(updates)
    }

    /// Move the true sub-prototype towards the embedding, the violating one
    /// away from it, and V along the matching gradient.
    fn sgd_step(
        &mut self,
        x: ArrayView1<f64>,
        embedding: &Array1<f64>,
        col_pos: usize,
        col_neg: usize,
        scale: f64,
        norm_up: f64,
    ) {
        let b_pos = self.state.b.column(col_pos).to_owned();
        let b_neg = self.state.b.column(col_neg).to_owned();

        let mut new_pos = &b_pos + &(embedding * scale);
        project_onto_ball(&mut new_pos, norm_up);
        let mut new_neg = &b_neg - &(embedding * scale);
        project_onto_ball(&mut new_neg, norm_up);

        // V -= scale * (b_neg - b_pos) x^T
        let diff = (&b_neg - &b_pos) * scale;
        for (mut row, &dv) in self.state.v.rows_mut().into_iter().zip(diff.iter()) {
            row.scaled_add(-dv, &x);
        }
        project_columns_onto_ball(&mut self.state.v, norm_up);

        self.state.b.column_mut(col_pos).assign(&new_pos);
        self.state.b.column_mut(col_neg).assign(&new_neg);
    }

    /// The averaged product `(AV / Anum)ᵀ (AB / Anum)`, d x (n_classes * num_sub).
    ///
    /// Falls back to the live parameters until the first average is taken.
    pub fn averaged_bv(&self) -> Array2<f64> {
        if self.state.anum == 0 {
            return self.state.v.t().dot(&self.state.b);
        }
        let anum = self.state.anum as f64;
        let av = &self.state.av / anum;
        let ab = &self.state.ab / anum;
        av.t().dot(&ab)
    }

    /// Score every class of every instance and threshold against the dummy.
    ///
    /// # Returns
    ///
    /// `(scores, labels)`: scores is n x n_classes (dummy last), labels is
    /// n x (n_classes - 1) with 1 for relevant and -1 for irrelevant.
    pub fn predict<S>(&self, data: &ArrayBase<S, Ix2>) -> Result<(Array2<f64>, Array2<f64>), QueryError>
    where
        S: Data<Elem = f64>,
    {
        self.check_data(data)?;
        let bv = self.averaged_bv();
        predict_with(&bv, data, self.config.num_sub)
    }

    fn check_data<S>(&self, data: &ArrayBase<S, Ix2>) -> Result<(), QueryError>
    where
        S: Data<Elem = f64>,
    {
        if data.ncols() != self.n_dims {
            return Err(QueryError::ShapeMismatch {
                context: "feature dimension differs from the one the model was built with",
                expected: (data.nrows(), self.n_dims),
                found: data.dim(),
            });
        }
        Ok(())
    }

    pub fn state(&self) -> &RankingState {
        &self.state
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Number of classes including the dummy.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Query budget `floor(n * (n_classes - 1) / 2)` of the initial data.
    pub fn max_query(&self) -> usize {
        self.max_query
    }
}

/// Candidate negatives for the anchor `(instance, class)`.
fn negative_pool(
    targets: &LabelMatrix,
    hints: Option<&[RankingHint]>,
    instance: usize,
    class: usize,
    dummy: usize,
) -> Vec<usize> {
    let mut pool = targets.irrelevant_classes(instance);
    if class == dummy {
        return pool;
    }
    let hint = hints.map(|h| h[instance]).unwrap_or_default();
    if hint.positive == Some(class) {
        if let Some(neg) = hint.negative {
            if neg != class && neg < targets.n_classes() {
                pool.push(neg);
            }
        }
    }
    pool.push(dummy);
    pool
}

/// Score `data` with a precomputed `BV` and threshold against the dummy class.
///
/// `bv` is d x (n_classes * num_sub) with the dummy class last, as returned by
/// `LabelRankingModel::averaged_bv`.
pub fn predict_with<S>(
    bv: &Array2<f64>,
    data: &ArrayBase<S, Ix2>,
    num_sub: usize,
) -> Result<(Array2<f64>, Array2<f64>), QueryError>
where
    S: Data<Elem = f64>,
{
    if data.ncols() != bv.nrows() {
        return Err(QueryError::ShapeMismatch {
            context: "feature dimension differs from the rows of BV",
            expected: (data.nrows(), bv.nrows()),
            found: data.dim(),
        });
    }
    if num_sub == 0 || bv.ncols() < num_sub || bv.ncols() % num_sub != 0 {
        return Err(QueryError::ShapeMismatch {
            context: "BV must hold num_sub columns per class, dummy included",
            expected: (bv.nrows(), num_sub.max(1)),
            found: bv.dim(),
        });
    }

    let fs = data.dot(bv);
    let n = data.nrows();
    let n_classes = fs.ncols() / num_sub;

    let scores = Array2::from_shape_fn((n, n_classes), |(i, c)| {
        (0..num_sub).fold(f64::NEG_INFINITY, |acc, s| acc.max(fs[[i, c * num_sub + s]]))
    });

    let dummy = n_classes - 1;
    let labels = Array2::from_shape_fn((n, dummy), |(i, c)| {
        if scores[[i, c]] > scores[[i, dummy]] {
            1.0
        } else {
            -1.0
        }
    });

    Ok((scores, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_config() -> RankingConfig {
        RankingConfig {
            n_features: 16,
            n_repeat: 3,
            ..RankingConfig::default()
        }
        .with_seed(11)
    }

    #[test]
    fn test_negative_pool() {
        let y = array![[1.0, -1.0, 0.0], [-1.0, 1.0, 1.0]];
        let labels = LabelMatrix::new(&y).unwrap();
        let dummy = labels.dummy_class();

        assert_eq!(negative_pool(&labels, None, 0, 0, dummy), vec![1, 3]);
        assert_eq!(negative_pool(&labels, None, 0, dummy, dummy), vec![1]);

        let hints = vec![
            RankingHint::default(),
            RankingHint {
                positive: Some(1),
                negative: Some(2),
            },
        ];
        assert_eq!(negative_pool(&labels, Some(&hints), 1, 1, dummy), vec![0, 2, 3]);
        assert_eq!(negative_pool(&labels, Some(&hints), 1, 2, dummy), vec![0, 3]);
    }

    #[test]
    fn test_negative_sampler_is_bounded() {
        let pool = vec![4, 7, 9];
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<usize> = NegativeSampler::new(&pool, &mut rng).collect();
        assert_eq!(draws.len(), 3);
        assert!(draws.iter().all(|d| pool.contains(d)));

        let empty: Vec<usize> = vec![];
        assert_eq!(NegativeSampler::new(&empty, &mut rng).count(), 0);
    }

    #[test]
    fn test_best_sub_prototype() {
        let b = array![[1.0, 0.0, 0.0, 5.0], [0.0, 2.0, 1.0, 0.0]];
        let e = array![1.0, 1.0];
        assert_eq!(best_sub_prototype(&b, 2, 0, &e), (2.0, 1));
        assert_eq!(best_sub_prototype(&b, 2, 1, &e), (5.0, 1));
    }

    #[test]
    fn test_shapes_after_init() {
        let x = array![[1.0, 0.0, 0.5], [0.0, 1.0, -0.5], [1.0, 1.0, 0.0]];
        let y = array![[1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];
        let model = LabelRankingModel::new(&x, &y, small_config()).unwrap();

        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.state().v.dim(), (16, 3));
        assert_eq!(model.state().b.dim(), (16, 15));
        assert_eq!(model.costs().len(), 15);
        assert_eq!(model.max_query(), 3);

        let (scores, labels) = model.predict(&x).unwrap();
        assert_eq!(scores.dim(), (3, 3));
        assert_eq!(labels.dim(), (3, 2));
        assert!(labels.iter().all(|&l| l == 1.0 || l == -1.0));
    }

    #[test]
    fn test_row_mismatch_rejected() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[1.0, -1.0]];
        assert!(matches!(
            LabelRankingModel::new(&x, &y, small_config()),
            Err(QueryError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_predict_with_thresholds_on_dummy() {
        // two classes + dummy, one sub-prototype each, identity features
        let bv = array![[3.0, 0.0, 1.0], [0.0, 0.5, 1.0]];
        let data = array![[1.0, 1.0]];
        let (scores, labels) = predict_with(&bv, &data, 1).unwrap();
        assert_eq!(scores, array![[3.0, 0.5, 2.0]]);
        assert_eq!(labels, array![[1.0, -1.0]]);
    }

    #[test]
    fn test_predict_with_rejects_bad_layouts() {
        let data = array![[1.0, 1.0]];

        let bv = array![[1.0, 2.0], [0.5, 1.0]];
        assert!(matches!(
            predict_with(&bv, &data, 0),
            Err(QueryError::ShapeMismatch { .. })
        ));

        let empty = Array2::<f64>::zeros((2, 0));
        assert!(matches!(
            predict_with(&empty, &data, 5),
            Err(QueryError::ShapeMismatch { .. })
        ));

        let ragged = Array2::<f64>::zeros((2, 7));
        assert!(matches!(
            predict_with(&ragged, &data, 5),
            Err(QueryError::ShapeMismatch { .. })
        ));

        let wide = array![[1.0, 1.0, 1.0]];
        assert!(matches!(
            predict_with(&bv, &wide, 1),
            Err(QueryError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_sub_prototypes_rejected() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let y = array![[1.0, -1.0], [-1.0, 1.0]];
        let config = RankingConfig {
            num_sub: 0,
            ..small_config()
        };
        assert!(matches!(
            LabelRankingModel::new(&x, &y, config),
            Err(QueryError::InvalidConfig(_))
        ));

        let config = RankingConfig {
            average_size: 0,
            ..small_config()
        };
        assert!(matches!(
            LabelRankingModel::new(&x, &y, config),
            Err(QueryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_feature_matrix_rejected() {
        let x = Array2::<f64>::zeros((2, 0));
        let y = array![[1.0], [-1.0]];
        assert_eq!(
            LabelRankingModel::new(&x, &y, small_config()).err(),
            Some(QueryError::ShapeMismatch {
                context: "feature matrix has no columns",
                expected: (2, 1),
                found: (2, 0),
            })
        );
    }
}
