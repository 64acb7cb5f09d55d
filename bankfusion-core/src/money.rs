//! Cent-level rounding helpers

/// Round to 2 decimal places, halves away from zero.
///
/// Scaling goes through a decimal string so that values like `1.005`
/// (stored as 1.00499…) still round to the nearest cent a human expects.
pub fn round_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scaled: f64 = format!("{:.6}", value * 100.0).parse().unwrap_or(value * 100.0);
    scaled.round() / 100.0
}

/// Mean of absolute values, rounded to cents. Empty input yields 0.
pub fn mean_abs(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v.abs(), n + 1));
    if n == 0 {
        0.0
    } else {
        round_cents(sum / n as f64)
    }
}
