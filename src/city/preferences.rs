//! Distance-based visiting weights. Each agent weighs the stores and parks of the city by the
//! inverse of their distance from its home.

use crate::location::Location;

/// Offset added to every distance so that a facility next door does not get an infinite weight.
pub const DISTANCE_OFFSET: f64 = 0.1;

/// Euclidean distance between two locations' grid coordinates.
#[must_use]
pub fn compute_distance(a: &Location, b: &Location) -> f64 {
    let (ax, ay) = a.coordinates();
    let (bx, by) = b.coordinates();
    #[allow(clippy::cast_precision_loss)]
    let (dx, dy) = ((ax - bx) as f64, (ay - by) as f64);
    dx.hypot(dy)
}

/// Un-normalized visiting weights of `home`'s residents over `candidates`: the inverse of the
/// distance plus [`DISTANCE_OFFSET`].
pub fn preference_weights<'a>(
    home: &Location,
    candidates: impl IntoIterator<Item = &'a Location>,
) -> Vec<f64> {
    candidates
        .into_iter()
        .map(|candidate| (compute_distance(home, candidate) + DISTANCE_OFFSET).recip())
        .collect()
}
