//! Support vector classification and regression trained with Sequential
//! Minimal Optimization.
//!
//! Both solvers follow the two-threshold formulation of SMO: optimality is
//! tracked through the pair `(b_up, b_low)` rather than a single bias, so the
//! stopping rule is exact and the second multiplier of each step is picked
//! from whichever threshold is most violated.
//!
//! - [`solver::train_classifier`] solves the C-SVM dual for labels in `{-1, +1}`.
//! - [`solver::train_regressor`] solves the epsilon-insensitive regression dual.
//! - [`api::SVC`] and [`api::SVR`] wrap the solvers with kernel evaluation,
//!   label mapping and prediction.

pub mod api;
pub mod core;
pub mod data;
pub mod kernel;
pub mod persistence;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{
    EvaluationMetrics, FittedSVC, FittedSVR, ModelInfo, RegressionMetrics, SVC, SVR,
};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SVMError};
pub use crate::data::{CSVDataset, LibSVMDataset};
pub use crate::kernel::{
    Gamma, Kernel, KernelKind, LaplacianKernel, LinearKernel, PolynomialKernel, RBFKernel,
    SigmoidKernel,
};
pub use crate::persistence::SerializableModel;
pub use crate::solver::{train_classifier, train_regressor};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
