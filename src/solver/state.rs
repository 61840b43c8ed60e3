//! Bookkeeping shared by both SMO variants: the residual cache and the
//! `(b_up, b_low)` threshold pair.

use crate::core::{Result, SVMError};

/// Per-sample residual cache.
///
/// `None` marks an entry that is stale and has to be recomputed from the
/// multipliers before use. Entries of free samples are always current.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCache {
    values: Vec<Option<f64>>,
}

impl ErrorCache {
    /// Cache with every residual known
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cached residual, if current
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values[i]
    }

    /// Cached residual of a sample the caller knows to be current
    pub fn current(&self, i: usize) -> Result<f64> {
        self.values[i].ok_or_else(|| {
            SVMError::UnexpectedState(format!("residual of sample {i} is stale"))
        })
    }

    pub fn store(&mut self, i: usize, value: f64) {
        self.values[i] = Some(value);
    }

    /// Add `delta` to a current entry; stale entries stay stale
    pub fn shift(&mut self, i: usize, delta: f64) {
        if let Some(value) = self.values[i].as_mut() {
            *value += delta;
        }
    }

    pub fn invalidate(&mut self, i: usize) {
        self.values[i] = None;
    }
}

/// Tightest known bounds on the optimal bias and the samples attaining them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub b_up: f64,
    pub b_up_idx: usize,
    pub b_low: f64,
    pub b_low_idx: usize,
}

impl Thresholds {
    /// Current optimality gap `b_low - b_up`
    pub fn gap(&self) -> f64 {
        self.b_low - self.b_up
    }

    /// Whether the gap has closed to within `2 * tol`
    pub fn is_optimal(&self, tol: f64) -> bool {
        self.b_up > self.b_low - 2.0 * tol
    }

    pub fn tighten_up(&mut self, i: usize, value: f64) {
        self.b_up = value;
        self.b_up_idx = i;
    }

    pub fn tighten_low(&mut self, i: usize, value: f64) {
        self.b_low = value;
        self.b_low_idx = i;
    }
}

/// Rescan of the threshold pair after a pair update.
///
/// `b_up` keeps the smallest offered value and `b_low` the largest.
#[derive(Debug, Default)]
pub struct ThresholdScan {
    up: Option<(usize, f64)>,
    low: Option<(usize, f64)>,
}

impl ThresholdScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate for `b_up`; returns whether it was taken
    pub fn offer_up(&mut self, i: usize, value: f64) -> bool {
        match self.up {
            Some((_, best)) if value >= best => false,
            _ => {
                self.up = Some((i, value));
                true
            }
        }
    }

    /// Offer a candidate for `b_low`; returns whether it was taken
    pub fn offer_low(&mut self, i: usize, value: f64) -> bool {
        match self.low {
            Some((_, best)) if value <= best => false,
            _ => {
                self.low = Some((i, value));
                true
            }
        }
    }

    /// Both bounds must have been attained by some sample
    pub fn finish(self) -> Result<Thresholds> {
        match (self.up, self.low) {
            (Some((b_up_idx, b_up)), Some((b_low_idx, b_low))) => Ok(Thresholds {
                b_up,
                b_up_idx,
                b_low,
                b_low_idx,
            }),
            (up, low) => Err(SVMError::UnexpectedState(format!(
                "threshold rescan found no bounding sample (b_up: {}, b_low: {})",
                if up.is_some() { "found" } else { "missing" },
                if low.is_some() { "found" } else { "missing" },
            ))),
        }
    }
}
