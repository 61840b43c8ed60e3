//! Core type definitions shared by the solvers and the estimators

use crate::core::{Result, SVMError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Prediction result for a single sample of a binary classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label, in the label space the model was fitted on
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Configuration for the SMO solvers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoConfig {
    /// Box bound on every multiplier
    pub c: f64,
    /// Tolerance on the optimality gap `b_low - b_up`
    pub tol: f64,
    /// Width of the insensitive tube (regression only)
    pub epsilon: f64,
    /// Maintain the primal weight vector during training
    pub linear_kernel: bool,
}

impl Default for SmoConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            tol: 1e-3,
            epsilon: 0.1,
            linear_kernel: false,
        }
    }
}

impl SmoConfig {
    /// Reject parameters the solvers cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(SVMError::InvalidParameter(format!(
                "C must be positive and finite, got {}",
                self.c
            )));
        }
        if !(self.tol > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                self.tol
            )));
        }
        if !(self.epsilon >= 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Counters describing one SMO run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Number of sweeps of the outer loop (full and active-set)
    pub sweeps: usize,
    /// Number of successful pair updates
    pub updates: usize,
    /// Final optimality gap `b_low - b_up`
    pub gap: f64,
}

/// Result of training a binary classifier
#[derive(Debug, Clone)]
pub struct ClassificationSolution {
    /// One multiplier per training sample, in `[0, C]`
    pub alphas: Array1<f64>,
    /// Intercept, `-(b_low + b_up) / 2`
    pub bias: f64,
    /// Primal weights, only for a linear kernel
    pub weights: Option<Array1<f64>>,
    pub stats: SolverStats,
}

/// Result of training an epsilon-insensitive regressor
#[derive(Debug, Clone)]
pub struct RegressionSolution {
    pub alphas_plus: Array1<f64>,
    pub alphas_minus: Array1<f64>,
    /// Intercept, `(b_low + b_up) / 2`
    pub bias: f64,
    /// Primal weights, only for a linear kernel
    pub weights: Option<Array1<f64>>,
    pub stats: SolverStats,
}

impl RegressionSolution {
    /// Net dual coefficients `alpha_plus - alpha_minus`
    pub fn dual_coef(&self) -> Array1<f64> {
        &self.alphas_plus - &self.alphas_minus
    }
}
