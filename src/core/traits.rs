//! Core traits for datasets and fitted models

use crate::core::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Dense dataset abstraction: one row of features per sample plus a target
pub trait Dataset {
    /// Feature matrix, `len() x dim()`
    fn features(&self) -> ArrayView2<'_, f64>;

    /// Class labels or regression targets, one per sample
    fn targets(&self) -> ArrayView1<'_, f64>;

    /// Number of samples in the dataset
    fn len(&self) -> usize {
        self.features().nrows()
    }

    /// Number of features (dimensionality)
    fn dim(&self) -> usize {
        self.features().ncols()
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fitted SVM that maps feature rows to outputs
pub trait SVMModel {
    /// Predict one output per row of `x`
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    /// Number of support vectors kept by the model
    fn n_support_vectors(&self) -> usize;

    /// Intercept of the decision function
    fn bias(&self) -> f64;
}
