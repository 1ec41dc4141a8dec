/// Asserts that two `f64` values lie within `tolerance` of each other. An optional format string
/// and arguments replace the default message.
///
/// ```
/// use epi_city::assert_almost_eq;
///
/// let shares = [0.1, 0.2];
/// assert_almost_eq!(shares.iter().sum::<f64>(), 0.3, 1e-12, "area shares of {shares:?}");
/// ```
#[macro_export]
macro_rules! assert_almost_eq {
    ($left:expr, $right:expr, $tolerance:expr $(,)?) => {
        $crate::assert_almost_eq!($left, $right, $tolerance, "values are not almost equal")
    };
    ($left:expr, $right:expr, $tolerance:expr, $($message:tt)+) => {
        match (&$left, &$right, &$tolerance) {
            (left, right, tolerance) => {
                if !$crate::numeric::almost_eq(*left, *right, *tolerance) {
                    panic!(
                        "{}: left = {}, right = {}, tolerance = {:e}",
                        format_args!($($message)+),
                        left,
                        right,
                        tolerance
                    );
                }
            }
        }
    };
}
