//! Rate normalization shared by validation and the rate limiter

use std::time::Duration;

/// Digits kept after the decimal point
const FRACTION_DIGITS: usize = 6;

/// Split a positive rate into whole permits per power-of-ten cycle
///
/// The rate is rendered with six fractional digits and trailing zeros are
/// dropped: `2.5` becomes 25 permits every 10s, `0.05` becomes 5 permits
/// every 100s. Returns `None` when the rate rounds to zero permits or the
/// permit count does not fit in a `u64`.
pub fn normalize_rate(rate: f64) -> Option<(u64, Duration)> {
    let rendered = format!("{:.*}", FRACTION_DIGITS, rate);
    let (whole, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let permits: u64 = format!("{whole}{fraction}").parse().ok()?;
    if permits == 0 {
        return None;
    }

    let cycle_secs = 10u64.pow(fraction.len() as u32);
    Some((permits, Duration::from_secs(cycle_secs)))
}
