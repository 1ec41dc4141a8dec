//! Floating point comparisons used by area bookkeeping and contamination decay.

use approx::AbsDiffEq;

/// Targeted accuracy instantiated over `f64`
pub const ACC: f64 = 10e-11;

/// Compares if two floats are close via `approx::abs_diff_eq` using a maximum absolute difference
/// (epsilon) of `acc`.
#[must_use]
pub fn almost_eq(a: f64, b: f64, acc: f64) -> bool {
    if a.is_infinite() && b.is_infinite() {
        return a == b;
    }
    a.abs_diff_eq(&b, acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;

    #[test]
    fn almost_eq_within_tolerance() {
        let a = 1.0;
        let b = 1.0 + 0.5e-11;
        assert!(almost_eq(a, b, ACC));
    }

    #[test]
    fn almost_eq_outside_tolerance() {
        let a = 1.0;
        let b = 1.0 + 2e-10;
        assert!(!almost_eq(a, b, ACC));
    }

    #[test]
    fn almost_eq_infinities() {
        assert!(almost_eq(f64::INFINITY, f64::INFINITY, ACC));
        assert!(!almost_eq(f64::INFINITY, f64::NEG_INFINITY, ACC));
    }

    #[test]
    fn assert_almost_eq_macro_passes() {
        assert_almost_eq!(0.30000000000000004, 0.3, 1e-12);
    }

    #[test]
    #[should_panic(expected = "values are not almost equal")]
    fn assert_almost_eq_macro_panics() {
        assert_almost_eq!(1.0, 1.001, 1e-4);
    }

    #[test]
    #[should_panic(expected = "area of park:3: left = 2")]
    fn assert_almost_eq_macro_custom_message() {
        let name = "park:3";
        assert_almost_eq!(2.0, 2.5, 1e-9, "area of {name}");
    }
}
