//! Duration encoding parser.
//!
//! Content platforms report durations in the compact ISO 8601 calendar
//! notation (`PT3M2S` is three minutes two seconds). Some exports carry plain
//! second counts instead; both are accepted.

use regex::Regex;
use std::sync::LazyLock;

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("duration pattern is valid")
});

/// Parse a duration encoding into whole seconds.
///
/// Accepts `P[nW][nD][T[nH][nM][n[.f]S]]` (case-insensitive, fractional
/// seconds truncated) or a non-negative integer number of seconds. Returns
/// `None` for anything else, including the degenerate `P` and `PT`.
///
/// # Example
///
/// ```
/// use ronda_ingest::duration::parse_duration;
///
/// assert_eq!(parse_duration("PT45S"), Some(45));
/// assert_eq!(parse_duration("PT3M2S"), Some(182));
/// assert_eq!(parse_duration("P1DT1H"), Some(90_000));
/// assert_eq!(parse_duration("three minutes"), None);
/// ```
pub fn parse_duration(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse::<i64>().ok();
    }

    let upper = trimmed.to_ascii_uppercase();
    let caps = ISO_DURATION.captures(&upper)?;

    const UNIT_SECONDS: [i64; 4] = [7 * 86_400, 86_400, 3_600, 60];

    let mut matched = false;
    let mut total: i64 = 0;
    for (group, unit) in (1..=4).zip(UNIT_SECONDS) {
        if let Some(m) = caps.get(group) {
            matched = true;
            total = total.checked_add(m.as_str().parse::<i64>().ok()?.checked_mul(unit)?)?;
        }
    }
    if let Some(m) = caps.get(5) {
        matched = true;
        let seconds = m.as_str().parse::<f64>().ok()?.trunc() as i64;
        total = total.checked_add(seconds)?;
    }

    matched.then_some(total)
}

/// Seconds for an optional encoding, 0 when missing or unparseable.
///
/// A zero result is rejected downstream by the positive-duration rule.
pub fn duration_seconds(raw: Option<&str>) -> i64 {
    raw.and_then(parse_duration).unwrap_or(0)
}
