//! mlquery: multi-label active learning query strategies.
//!
//! This crate selects the instance-label pairs whose annotation is expected
//! to help a multi-label classifier most. It provides the QUIRE selector
//! (kernel-regularized informativeness and representativeness), a random
//! baseline, and the label ranking model with threshold learning used by the
//! AURO/AUDI family of strategies.
//!
//! Everything runs synchronously on `ndarray` matrices; callers own the
//! dataset and the labeled/unlabeled partition and ask for one query round
//! at a time.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod kernels;
pub mod math;
pub mod models;
pub mod query;

pub use config::{KernelType, QuireConfig, RankingConfig};
pub use data_handling::{LabelCode, LabelMatrix, LabelPair};
pub use error::QueryError;
pub use kernels::Kernel;
pub use models::label_ranking::{LabelRankingModel, RankingHint};
pub use query::{MultiLabelQuery, QuireSelector, RandomQuery};
