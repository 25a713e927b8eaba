use ndarray::{Array2, ArrayBase, DataMut, Ix1};

/// Rescale `v` in place so that its Euclidean norm is at most `radius`.
///
/// Does nothing when the norm is already within bounds or `radius` is not
/// finite.
pub fn project_onto_ball<S>(v: &mut ArrayBase<S, Ix1>, radius: f64)
where
    S: DataMut<Elem = f64>,
{
    if !radius.is_finite() {
        return;
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > radius {
        let factor = radius / norm;
        v.mapv_inplace(|x| x * factor);
    }
}

/// Project every column of `m` onto the ball of the given `radius`.
pub fn project_columns_onto_ball(m: &mut Array2<f64>, radius: f64) {
    if !radius.is_finite() {
        return;
    }
    for mut col in m.columns_mut() {
        project_onto_ball(&mut col, radius);
    }
}
