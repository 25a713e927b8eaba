use rand::seq::SliceRandom;
use rand::Rng;

/// Cumulative harmonic cost table: `costs[k] = 1 + 1/2 + ... + 1/(k + 1)`.
///
/// Indexed by the estimated rank of a margin violator, so violators found
/// early (high estimated rank) cost more per step.
pub fn harmonic_costs(len: usize) -> Vec<f64> {
    (1..=len)
        .scan(0.0, |acc, k| {
            *acc += 1.0 / k as f64;
            Some(*acc)
        })
        .collect()
}

/// Indices of the `k` smallest values in ascending order of value.
///
/// Ties keep input order, so the first occurrence wins. NaN values sort last.
pub fn nsmallest_arg(values: &[f64], k: usize) -> Vec<usize> {
    let mut indices = (0..values.len()).collect::<Vec<usize>>();
    indices.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or_else(|| values[a].is_nan().cmp(&values[b].is_nan()))
    });
    indices.truncate(k);
    indices
}

/// A uniform random permutation of `0..n`.
pub fn randperm<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut perm = (0..n).collect::<Vec<usize>>();
    perm.shuffle(rng);
    perm
}
