//! Numeric and batching helpers shared by the scoring stages.

/// Round `value` to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Split items into batches of at most `batch_size` elements.
///
/// A zero batch size yields a single batch.
#[must_use]
pub fn batches<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = if batch_size == 0 { items.len() } else { batch_size };
    items.chunks(size).map(<[T]>::to_vec).collect()
}

/// Truncate to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
