//! Label matrices, instance-label pairs and partition checks shared by the
//! query strategies.
//!
//! A `LabelMatrix` always carries the dummy class as its last column. The
//! dummy separates relevant from irrelevant classes in the ranking model, so
//! keeping it as a fixed, named index avoids re-detecting it on every call.
use std::collections::HashSet;
use std::fmt;

use ndarray::{s, Array2, ArrayBase, ArrayView2, Data, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// An (instance, class) index pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelPair {
    pub instance: usize,
    pub class: usize,
}

impl LabelPair {
    pub fn new(instance: usize, class: usize) -> Self {
        Self { instance, class }
    }
}

impl From<(usize, usize)> for LabelPair {
    fn from((instance, class): (usize, usize)) -> Self {
        Self::new(instance, class)
    }
}

impl fmt::Display for LabelPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.instance, self.class)
    }
}

/// The closed set of label codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelCode {
    Irrelevant,
    Unknown,
    PartiallyRelevant,
    Relevant,
    Dummy,
}

impl LabelCode {
    pub fn from_value(value: f64) -> Option<Self> {
        if value == -1.0 {
            Some(LabelCode::Irrelevant)
        } else if value == 0.0 {
            Some(LabelCode::Unknown)
        } else if value == 0.5 {
            Some(LabelCode::PartiallyRelevant)
        } else if value == 1.0 {
            Some(LabelCode::Relevant)
        } else if value == 2.0 {
            Some(LabelCode::Dummy)
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        match self {
            LabelCode::Irrelevant => -1.0,
            LabelCode::Unknown => 0.0,
            LabelCode::PartiallyRelevant => 0.5,
            LabelCode::Relevant => 1.0,
            LabelCode::Dummy => 2.0,
        }
    }

    /// Codes the ranking model trains on as the "true" class of a pair.
    pub fn is_anchor(self) -> bool {
        matches!(self, LabelCode::Relevant | LabelCode::Dummy)
    }
}

/// Label matrix with a trailing dummy class.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatrix {
    values: Array2<f64>,
}

impl LabelMatrix {
    /// Validate `y` and append the dummy column when it is missing.
    ///
    /// A trailing column made entirely of `2` is taken as the dummy column.
    /// Any other `2`, or any value outside {-1, 0, 0.5, 1}, is rejected.
    pub fn new<S>(y: &ArrayBase<S, Ix2>) -> Result<Self, QueryError>
    where
        S: Data<Elem = f64>,
    {
        let (n, cols) = y.dim();
        let has_dummy = cols > 0 && n > 0 && y.column(cols - 1).iter().all(|&v| v == 2.0);
        let n_labels = if has_dummy { cols - 1 } else { cols };

        for ((row, col), &value) in y.slice(s![.., ..n_labels]).indexed_iter() {
            match LabelCode::from_value(value) {
                Some(LabelCode::Dummy) | None => {
                    return Err(QueryError::InvalidLabelCode { row, col, value })
                }
                Some(_) => {}
            }
        }

        let mut values = Array2::from_elem((n, n_labels + 1), LabelCode::Dummy.value());
        values
            .slice_mut(s![.., ..n_labels])
            .assign(&y.slice(s![.., ..n_labels]));
        if !has_dummy && cols > 0 {
            log::trace!("Appending dummy column to {}x{} label matrix", n, cols);
        }
        Ok(Self { values })
    }

    pub fn n_instances(&self) -> usize {
        self.values.nrows()
    }

    /// Number of classes including the dummy.
    pub fn n_classes(&self) -> usize {
        self.values.ncols()
    }

    /// Number of real (non-dummy) labels.
    pub fn n_labels(&self) -> usize {
        self.values.ncols() - 1
    }

    pub fn dummy_class(&self) -> usize {
        self.values.ncols() - 1
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn get(&self, pair: LabelPair) -> f64 {
        self.values[[pair.instance, pair.class]]
    }

    pub fn code(&self, pair: LabelPair) -> Option<LabelCode> {
        LabelCode::from_value(self.get(pair))
    }

    /// Classes explicitly marked irrelevant for `instance`.
    pub fn irrelevant_classes(&self, instance: usize) -> Vec<usize> {
        self.values
            .row(instance)
            .iter()
            .enumerate()
            .filter_map(|(c, &v)| if v == -1.0 { Some(c) } else { None })
            .collect()
    }

    /// Relevant pairs and dummy pairs in row-major order.
    pub fn anchors(&self) -> Vec<LabelPair> {
        self.values
            .indexed_iter()
            .filter_map(|((i, c), &v)| match LabelCode::from_value(v) {
                Some(code) if code.is_anchor() => Some(LabelPair::new(i, c)),
                _ => None,
            })
            .collect()
    }
}

/// Check that every pair is in range and that no pair appears twice across
/// the labeled and unlabeled sets.
///
/// Coverage of the whole label space is not required.
pub fn validate_partition(
    labeled: &[LabelPair],
    unlabeled: &[LabelPair],
    n_instances: usize,
    n_classes: usize,
) -> Result<(), QueryError> {
    let mut seen = HashSet::with_capacity(labeled.len() + unlabeled.len());
    for &pair in labeled.iter().chain(unlabeled.iter()) {
        if pair.instance >= n_instances || pair.class >= n_classes {
            return Err(QueryError::IndexOutOfRange {
                pair,
                n_instances,
                n_classes,
            });
        }
        if !seen.insert(pair) {
            return Err(QueryError::OverlappingPartition(pair));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dummy_column_appended() {
        let y = array![[1.0, -1.0], [0.0, 0.5]];
        let labels = LabelMatrix::new(&y).unwrap();
        assert_eq!(labels.n_classes(), 3);
        assert_eq!(labels.n_labels(), 2);
        assert_eq!(labels.dummy_class(), 2);
        assert_eq!(labels.get(LabelPair::new(1, 2)), 2.0);
        assert_eq!(labels.get(LabelPair::new(1, 1)), 0.5);
    }

    #[test]
    fn test_existing_dummy_column_kept() {
        let y = array![[1.0, 2.0], [-1.0, 2.0]];
        let labels = LabelMatrix::new(&y).unwrap();
        assert_eq!(labels.n_classes(), 2);
        assert_eq!(labels.n_labels(), 1);
    }

    #[test]
    fn test_stray_dummy_code_rejected() {
        let y = array![[2.0, 1.0], [-1.0, 1.0]];
        assert_eq!(
            LabelMatrix::new(&y),
            Err(QueryError::InvalidLabelCode {
                row: 0,
                col: 0,
                value: 2.0
            })
        );
    }

    #[test]
    fn test_out_of_set_code_rejected() {
        let y = array![[1.0, 0.3]];
        assert!(matches!(
            LabelMatrix::new(&y),
            Err(QueryError::InvalidLabelCode { row: 0, col: 1, .. })
        ));
    }

    #[test]
    fn test_anchors_and_irrelevant() {
        let y = array![[1.0, -1.0, 0.5], [0.0, 1.0, -1.0]];
        let labels = LabelMatrix::new(&y).unwrap();
        assert_eq!(
            labels.anchors(),
            vec![
                LabelPair::new(0, 0),
                LabelPair::new(0, 3),
                LabelPair::new(1, 1),
                LabelPair::new(1, 3),
            ]
        );
        assert_eq!(labels.irrelevant_classes(0), vec![1]);
        assert_eq!(labels.irrelevant_classes(1), vec![2]);
    }

    #[test]
    fn test_validate_partition() {
        let labeled = vec![LabelPair::new(0, 0)];
        let unlabeled = vec![LabelPair::new(0, 1), LabelPair::new(1, 0)];
        assert!(validate_partition(&labeled, &unlabeled, 2, 2).is_ok());

        let overlap = vec![LabelPair::new(0, 0)];
        assert_eq!(
            validate_partition(&labeled, &overlap, 2, 2),
            Err(QueryError::OverlappingPartition(LabelPair::new(0, 0)))
        );

        let out_of_range = vec![LabelPair::new(0, 2)];
        assert!(matches!(
            validate_partition(&labeled, &out_of_range, 2, 2),
            Err(QueryError::IndexOutOfRange { .. })
        ));
    }
}
