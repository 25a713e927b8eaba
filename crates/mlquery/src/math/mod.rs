//! Dense linear algebra helpers on top of `ndarray`.
//!
//! Inversion is delegated to `nalgebra`; principal submatrices and norm-ball
//! projection work directly on `ndarray` views.
pub mod linalg;
pub mod projection;

pub use linalg::{invert, submatrix};
pub use projection::{project_columns_onto_ball, project_onto_ball};
