use std::error::Error;
use std::fmt;

use crate::data_handling::LabelPair;

/// Errors raised by the query strategies and the label ranking model.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Two shapes that must agree do not (X vs y rows, kernel output, ...)
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    UnsupportedKernel(String),
    /// A label value outside {-1, 0, 0.5, 1, 2}, or a dummy code outside the dummy column
    InvalidLabelCode { row: usize, col: usize, value: f64 },
    EmptyCandidateSet,
    SingularMatrix,
    IndexOutOfRange {
        pair: LabelPair,
        n_instances: usize,
        n_classes: usize,
    },
    OverlappingPartition(LabelPair),
    /// A hyper-parameter outside its valid range
    InvalidConfig(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryError::ShapeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "{}: expected shape ({}, {}), found ({}, {})",
                context, expected.0, expected.1, found.0, found.1
            ),
            QueryError::UnsupportedKernel(name) => write!(
                f,
                "Unsupported kernel: {}. Valid options are: linear, poly, rbf or a callable",
                name
            ),
            QueryError::InvalidLabelCode { row, col, value } => write!(
                f,
                "Invalid label code {} at ({}, {}); expected one of -1, 0, 0.5, 1 (2 only in the dummy column)",
                value, row, col
            ),
            QueryError::EmptyCandidateSet => write!(f, "No unlabeled candidates to select from"),
            QueryError::SingularMatrix => write!(
                f,
                "Matrix is singular; increase lambda or remove near-duplicate instances"
            ),
            QueryError::IndexOutOfRange {
                pair,
                n_instances,
                n_classes,
            } => write!(
                f,
                "Index pair {} is out of range for {} instances and {} classes",
                pair, n_instances, n_classes
            ),
            QueryError::OverlappingPartition(pair) => write!(
                f,
                "Index pair {} appears more than once across the labeled and unlabeled sets",
                pair
            ),
            QueryError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl Error for QueryError {}
