//! Laplacian kernel implementation
//!
//! K(x, y) = exp(-γ * ||x - y||₁)

use crate::kernel::Kernel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Laplacian kernel: K(x, y) = exp(-γ * ||x - y||₁)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaplacianKernel {
    gamma: f64,
}

impl LaplacianKernel {
    /// Create a new laplacian kernel
    ///
    /// # Panics
    /// Panics if gamma is not positive
    pub fn new(gamma: f64) -> Self {
        assert!(gamma > 0.0, "Gamma must be positive, got: {}", gamma);
        Self { gamma }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for LaplacianKernel {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let l1_distance: f64 = x.iter().zip(y.iter()).map(|(&a, &b)| (a - b).abs()).sum();
        (-self.gamma * l1_distance).exp()
    }
}
