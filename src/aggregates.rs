//! Derived values computed from a recipe's related rows.
//!
//! Nothing here is persisted; callers feed in the current rating scores or
//! time fields every time a value is needed.

/// Arithmetic mean of the given scores, `0.0` when there are none.
pub fn average_rating(scores: &[i64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let total: i64 = scores.iter().sum();
    total as f64 / scores.len() as f64
}

/// Minutes of preparation plus cooking. Missing halves count as nothing.
pub fn total_time(prep_time: Option<i64>, cook_time: Option<i64>) -> i64 {
    match (prep_time, cook_time) {
        (Some(prep), Some(cook)) => prep + cook,
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => 0,
    }
}

/// Parses the comma separated score list produced by `GROUP_CONCAT`.
pub fn parse_scores(concatenated: Option<&str>) -> Vec<i64> {
    concatenated
        .unwrap_or_default()
        .split(',')
        .filter_map(|score| score.trim().parse().ok())
        .collect()
}
