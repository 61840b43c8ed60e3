//! Kernel width selection

use crate::core::{Result, SVMError};
use log::warn;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the `gamma` of an RBF, laplacian, polynomial or sigmoid kernel is chosen
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gamma {
    /// `1 / (n_features * Var(X))`, where the variance runs over every entry of X
    #[default]
    Scale,
    /// `1 / n_features`
    Auto,
    /// A fixed positive value
    Value(f64),
}

impl Gamma {
    /// Resolve to a concrete positive value for the training matrix `x`
    pub fn resolve(&self, x: ArrayView2<'_, f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match *self {
            Gamma::Value(gamma) => gamma,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                if x.is_empty() {
                    return 1.0;
                }
                let variance = x.var(0.0);
                if variance > 0.0 {
                    1.0 / (n_features * variance)
                } else {
                    warn!("Training features have zero variance, using gamma = 1.0");
                    1.0
                }
            }
        }
    }
}

impl FromStr for Gamma {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scale" => Ok(Gamma::Scale),
            "auto" => Ok(Gamma::Auto),
            other => {
                let value = other.parse::<f64>().map_err(|_| {
                    SVMError::InvalidParameter(format!(
                        "gamma must be 'scale', 'auto' or a number, got: {s}"
                    ))
                })?;
                if value > 0.0 && value.is_finite() {
                    Ok(Gamma::Value(value))
                } else {
                    Err(SVMError::InvalidParameter(format!(
                        "gamma must be > 0, got: {value}"
                    )))
                }
            }
        }
    }
}

impl fmt::Display for Gamma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gamma::Scale => write!(f, "scale"),
            Gamma::Auto => write!(f, "auto"),
            Gamma::Value(value) => write!(f, "{value}"),
        }
    }
}
