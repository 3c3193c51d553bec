//! Series handling: normalization and sliding-window feature construction.
//!
//! A series is a plain `&[f64]` owned by the caller. Nothing here mutates it;
//! windows and training examples are built fresh on every call.

use crate::domain::errors::SeriesError;

/// Default divisor mapping raw observations into the network's (0, 1) range.
pub const NORMALIZATION_SCALE: f64 = 100.0;

/// Fixed affine scaling between raw values and network space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    scale: f64,
}

impl Normalizer {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn normalize(&self, raw: f64) -> f64 {
        raw / self.scale
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.scale
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NORMALIZATION_SCALE)
    }
}

/// The k most recent normalized values, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow(Vec<f64>);

impl FeatureWindow {
    /// Builds a window from the last `size` raw values of `values`.
    ///
    /// Returns `None` when fewer than `size` values are available or any of
    /// them is not finite.
    pub fn from_tail(values: &[f64], size: usize, normalizer: &Normalizer) -> Option<Self> {
        if size == 0 || values.len() < size {
            return None;
        }
        let tail = &values[values.len() - size..];
        if tail.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self(tail.iter().map(|v| normalizer.normalize(*v)).collect()))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// A window paired with the normalized value that immediately follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub input: FeatureWindow,
    pub target: f64,
}

/// Index of the first non-finite observation, if any.
pub fn first_non_finite(series: &[f64]) -> Option<usize> {
    series.iter().position(|v| !v.is_finite())
}

/// Builds every causal training example of a series.
///
/// For a series of length `n` and window size `k` this yields `n - k`
/// examples: `x[i-k..i] -> x[i]` for `i` in `k..n`. Short series yield an
/// empty set.
pub fn build_training_set(
    series: &[f64],
    window_size: usize,
    normalizer: &Normalizer,
) -> Result<Vec<TrainingExample>, SeriesError> {
    if window_size == 0 {
        return Err(SeriesError::InvalidWindowSize);
    }
    if let Some(index) = first_non_finite(series) {
        return Err(SeriesError::NonFinite {
            index,
            value: series[index],
        });
    }
    if series.len() <= window_size {
        return Ok(Vec::new());
    }

    let normalized: Vec<f64> = series.iter().map(|v| normalizer.normalize(*v)).collect();
    let examples = normalized
        .windows(window_size + 1)
        .map(|chunk| TrainingExample {
            input: FeatureWindow(chunk[..window_size].to_vec()),
            target: chunk[window_size],
        })
        .collect();

    Ok(examples)
}
