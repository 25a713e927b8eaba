use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data_handling::{validate_partition, LabelPair};
use crate::error::QueryError;
use crate::query::MultiLabelQuery;

/// Uniform random selection of instance-label pairs, the usual baseline for
/// the informed strategies.
pub struct RandomQuery {
    n_instances: usize,
    n_classes: usize,
    batch_size: usize,
    rng: StdRng,
}

impl RandomQuery {
    pub fn new(n_instances: usize, n_classes: usize) -> Self {
        RandomQuery {
            n_instances,
            n_classes,
            batch_size: 1,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl MultiLabelQuery for RandomQuery {
    fn select(
        &mut self,
        labeled: &[LabelPair],
        unlabeled: &[LabelPair],
    ) -> Result<Vec<LabelPair>, QueryError> {
        if unlabeled.is_empty() {
            return Err(QueryError::EmptyCandidateSet);
        }
        validate_partition(labeled, unlabeled, self.n_instances, self.n_classes)?;
        Ok(unlabeled
            .choose_multiple(&mut self.rng, self.batch_size)
            .copied()
            .collect())
    }

    fn name(&self) -> &str {
        "random"
    }
}
