//! Kernel trait definition

use ndarray::ArrayView1;

/// Kernel function trait
///
/// A kernel function K(x, y) should satisfy Mercer's condition to be valid for SVM.
/// The SMO solvers never call kernels directly: they read a Gram matrix built
/// from one of these (see [`crate::kernel::gram_matrix`]).
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64;

    /// Whether K(x, y) is the plain dot product.
    ///
    /// Solvers keep an explicit weight vector only for linear kernels.
    fn is_linear(&self) -> bool {
        false
    }
}
