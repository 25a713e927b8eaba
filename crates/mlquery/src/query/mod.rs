//! Query strategies that pick the next instance-label pairs to annotate.
pub mod quire;
pub mod random;

use crate::data_handling::LabelPair;
use crate::error::QueryError;

pub use quire::QuireSelector;
pub use random::RandomQuery;

/// Contract shared by the pair-wise multi-label query strategies.
pub trait MultiLabelQuery {
    /// Select the pair(s) to annotate next from `unlabeled`.
    ///
    /// `labeled` and `unlabeled` must be disjoint and in range for the
    /// dataset the strategy was built on.
    fn select(
        &mut self,
        labeled: &[LabelPair],
        unlabeled: &[LabelPair],
    ) -> Result<Vec<LabelPair>, QueryError>;

    fn name(&self) -> &str {
        "query"
    }
}
