//! Algorithms for uniform random sampling from containers. These are written to be generic
//! over the container type so the same draw works for slices, id lists and set iterators.

use rand::Rng;

/// Sample a random element uniformly from a container of known length.
///
/// We do not assume the container is randomly indexable, only that it can be iterated over.
/// Exactly one value is drawn from `rng` when the container is non-empty and none otherwise.
pub fn sample_single_from_known_length<I, R, T>(rng: &mut R, mut iter: I) -> Option<T>
where
    R: Rng,
    I: Iterator<Item = T> + ExactSizeIterator<Item = T>,
{
    let len = iter.len();
    if len == 0 {
        return None;
    }
    let index = rng.random_range(0..len);
    // The container need not be randomly indexable, so we have to use the `nth` method.
    iter.nth(index)
}

/// Draws `n` uniform values in `[0, 1)` and rescales them so they sum to `total`.
///
/// Used to split an area budget across `n` locations. An all-zero draw (which the uniform
/// generator makes practically impossible) falls back to an equal split.
pub fn sample_partition<R: Rng>(rng: &mut R, n: usize, total: f64) -> Vec<f64> {
    let draws: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..1.0)).collect();
    let sum: f64 = draws.iter().sum();
    if sum > 0.0 {
        draws.into_iter().map(|d| total * d / sum).collect()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let share = total / n as f64;
        vec![share; n]
    }
}
