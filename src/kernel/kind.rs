//! Runtime-selected kernel, used where the kernel comes from user input
//! or from a saved model.

use crate::kernel::{
    Kernel, LaplacianKernel, LinearKernel, PolynomialKernel, RBFKernel, SigmoidKernel,
};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Any of the kernels shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Polynomial(PolynomialKernel),
    Rbf(RBFKernel),
    Laplacian(LaplacianKernel),
    Sigmoid(SigmoidKernel),
}

impl Kernel for KernelKind {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        match self {
            KernelKind::Linear => LinearKernel.compute(x, y),
            KernelKind::Polynomial(kernel) => kernel.compute(x, y),
            KernelKind::Rbf(kernel) => kernel.compute(x, y),
            KernelKind::Laplacian(kernel) => kernel.compute(x, y),
            KernelKind::Sigmoid(kernel) => kernel.compute(x, y),
        }
    }

    fn is_linear(&self) -> bool {
        matches!(self, KernelKind::Linear)
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelKind::Linear => write!(f, "linear"),
            KernelKind::Polynomial(k) => write!(
                f,
                "polynomial(degree={}, gamma={}, coef0={})",
                k.degree, k.gamma, k.coef0
            ),
            KernelKind::Rbf(k) => write!(f, "rbf(gamma={})", k.gamma()),
            KernelKind::Laplacian(k) => write!(f, "laplacian(gamma={})", k.gamma()),
            KernelKind::Sigmoid(k) => write!(f, "sigmoid(gamma={}, coef0={})", k.gamma, k.coef0),
        }
    }
}

impl From<LinearKernel> for KernelKind {
    fn from(_: LinearKernel) -> Self {
        KernelKind::Linear
    }
}

impl From<PolynomialKernel> for KernelKind {
    fn from(kernel: PolynomialKernel) -> Self {
        KernelKind::Polynomial(kernel)
    }
}

impl From<RBFKernel> for KernelKind {
    fn from(kernel: RBFKernel) -> Self {
        KernelKind::Rbf(kernel)
    }
}

impl From<LaplacianKernel> for KernelKind {
    fn from(kernel: LaplacianKernel) -> Self {
        KernelKind::Laplacian(kernel)
    }
}

impl From<SigmoidKernel> for KernelKind {
    fn from(kernel: SigmoidKernel) -> Self {
        KernelKind::Sigmoid(kernel)
    }
}
