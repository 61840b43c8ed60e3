//! Linear kernel implementation

use crate::kernel::Kernel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Linear kernel: K(x, y) = x^T * y
///
/// Models trained with this kernel also carry an explicit weight vector,
/// so prediction does not need the support vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        x.dot(&y)
    }

    fn is_linear(&self) -> bool {
        true
    }
}
