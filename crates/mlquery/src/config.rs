use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::QueryError;

/// Hyper-parameters of the label ranking model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RankingConfig {
    /// Number of random features D (rows of V and B)
    pub n_features: usize,
    /// Sub-prototypes per class
    pub num_sub: usize,
    /// Column norm bound for V and B; `None` leaves them unbounded
    pub norm_up: Option<f64>,
    pub lambda: f64,
    pub step_size0: f64,
    pub average_begin: usize,
    pub average_size: usize,
    /// Warm-start passes run at initialization
    pub n_repeat: usize,
    /// Fixed seed for initialization, permutations and negative sampling
    pub seed: Option<u64>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            n_features: 200,
            num_sub: 5,
            norm_up: None,
            lambda: 0.0,
            step_size0: 0.05,
            average_begin: 10,
            average_size: 5,
            n_repeat: 10,
            seed: None,
        }
    }
}

impl RankingConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn norm_bound(&self) -> f64 {
        self.norm_up.unwrap_or(f64::INFINITY)
    }
}

/// Named kernels and their parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum KernelType {
    Linear,
    Poly { gamma: f64, coef0: f64, degree: i32 },
    Rbf { gamma: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Rbf { gamma: 1.0 }
    }
}

impl FromStr for KernelType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(KernelType::Linear),
            "poly" => Ok(KernelType::Poly {
                gamma: 1.0,
                coef0: 1.0,
                degree: 3,
            }),
            "rbf" => Ok(KernelType::Rbf { gamma: 1.0 }),
            _ => Err(QueryError::UnsupportedKernel(s.to_string())),
        }
    }
}

/// Configuration of the QUIRE selector.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct QuireConfig {
    /// Regularization added to the kernel diagonal before inversion
    pub lambda: f64,
    pub kernel: KernelType,
}

impl QuireConfig {
    pub fn new(lambda: f64, kernel: KernelType) -> Self {
        Self { lambda, kernel }
    }
}

impl Default for QuireConfig {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            kernel: KernelType::default(),
        }
    }
}
