//! High-level estimators built on the SMO solvers
//!
//! [`SVC`] and [`SVR`] are builders: configure them, then `fit` on a
//! feature matrix and targets to get a [`FittedSVC`] / [`FittedSVR`] that
//! keeps only the support vectors.
//!
//! # Quick Start
//!
//! ```
//! use ndarray::array;
//! use smosvm::api::SVC;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let x = array![[2.0, 2.0], [3.0, 3.0], [-2.0, -2.0], [-3.0, -3.0]];
//! let y = array![1.0, 1.0, 0.0, 0.0];
//!
//! let model = SVC::new().with_c(10.0).fit(x.view(), y.view())?;
//! let labels = model.predict(array![[2.5, 2.0], [-1.0, -2.0]].view())?;
//! assert_eq!(labels, array![1.0, 0.0]);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    Dataset, Prediction, Result, SVMError, SVMModel, SmoConfig, SolverStats,
};
use crate::data::{CSVDataset, LibSVMDataset};
use crate::kernel::{cross_kernel_matrix, gram_matrix, Kernel, LinearKernel};
use crate::solver::{train_classifier, train_regressor};
use log::{info, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::path::Path;

/// Multipliers above this value mark a support vector
pub const SUPPORT_THRESHOLD: f64 = 1e-5;

/// Binary support vector classifier with builder pattern
pub struct SVC<K: Kernel = LinearKernel> {
    kernel: K,
    config: SmoConfig,
}

impl SVC<LinearKernel> {
    /// Create a new classifier with linear kernel and default parameters
    pub fn new() -> Self {
        Self::with_kernel(LinearKernel::new())
    }
}

impl Default for SVC<LinearKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> SVC<K> {
    /// Create classifier with custom kernel
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel,
            config: SmoConfig::default(),
        }
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set tolerance on the optimality gap
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    pub fn config(&self) -> &SmoConfig {
        &self.config
    }

    /// Fit on a feature matrix and exactly two distinct labels.
    ///
    /// The smaller label becomes the negative class.
    pub fn fit(self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<FittedSVC<K>> {
        check_training_data(x, y, &self.config)?;

        let classes = binary_classes(y)?;
        let signed = y.mapv(|label| if label == classes[1] { 1.0 } else { -1.0 });

        let config = SmoConfig {
            linear_kernel: self.kernel.is_linear(),
            ..self.config
        };
        let gram = gram_matrix(&self.kernel, x);
        let solution = train_classifier(x, signed.view(), gram.view(), &config)?;

        let support: Vec<usize> = solution
            .alphas
            .iter()
            .enumerate()
            .filter(|(_, &alpha)| alpha > SUPPORT_THRESHOLD)
            .map(|(i, _)| i)
            .collect();
        if support.is_empty() {
            warn!("classifier has no multiplier above {SUPPORT_THRESHOLD}; decisions use the bias only");
        }

        let dual_coef = support
            .iter()
            .map(|&i| solution.alphas[i] * signed[i])
            .collect::<Array1<f64>>();

        info!(
            "fitted SVC on {} samples x {} features: {} support vectors, {} sweeps, {} updates",
            x.nrows(),
            x.ncols(),
            support.len(),
            solution.stats.sweeps,
            solution.stats.updates
        );

        Ok(FittedSVC {
            kernel: self.kernel,
            config,
            classes,
            support_vectors: x.select(Axis(0), &support),
            support,
            dual_coef,
            coef: solution.weights,
            intercept: solution.bias,
            stats: solution.stats,
        })
    }

    /// Fit on any dataset
    pub fn fit_dataset<D: Dataset>(self, dataset: &D) -> Result<FittedSVC<K>> {
        self.fit(dataset.features(), dataset.targets())
    }

    /// Fit from LibSVM format file
    pub fn fit_from_file<P: AsRef<Path>>(self, path: P) -> Result<FittedSVC<K>> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.fit_dataset(&dataset)
    }

    /// Fit from CSV file (automatically detects headers)
    pub fn fit_from_csv<P: AsRef<Path>>(self, path: P) -> Result<FittedSVC<K>> {
        let dataset = CSVDataset::from_file(path)?;
        self.fit_dataset(&dataset)
    }
}

/// Fitted binary classifier
#[derive(Debug, Clone)]
pub struct FittedSVC<K: Kernel> {
    pub(crate) kernel: K,
    pub(crate) config: SmoConfig,
    /// `[negative, positive]` in the original label space
    pub(crate) classes: [f64; 2],
    pub(crate) support: Vec<usize>,
    pub(crate) support_vectors: Array2<f64>,
    /// `alpha_i * y_i` per support vector
    pub(crate) dual_coef: Array1<f64>,
    pub(crate) coef: Option<Array1<f64>>,
    pub(crate) intercept: f64,
    pub(crate) stats: SolverStats,
}

impl<K: Kernel> FittedSVC<K> {
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn config(&self) -> &SmoConfig {
        &self.config
    }

    /// Labels of the negative and the positive class
    pub fn classes(&self) -> [f64; 2] {
        self.classes
    }

    /// Training-set indices of the support vectors
    pub fn support(&self) -> &[usize] {
        &self.support
    }

    pub fn support_vectors(&self) -> ArrayView2<'_, f64> {
        self.support_vectors.view()
    }

    pub fn dual_coef(&self) -> ArrayView1<'_, f64> {
        self.dual_coef.view()
    }

    /// Primal weights, only available for a linear kernel
    pub fn coef(&self) -> Option<ArrayView1<'_, f64>> {
        self.coef.as_ref().map(|w| w.view())
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn n_features(&self) -> usize {
        self.support_vectors.ncols()
    }

    /// Signed distance-like score, positive for the larger label
    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_features(x, self.n_features())?;
        Ok(match &self.coef {
            Some(w) => x.dot(w) + self.intercept,
            None => {
                cross_kernel_matrix(&self.kernel, x, self.support_vectors.view())
                    .dot(&self.dual_coef)
                    + self.intercept
            }
        })
    }

    /// Predict labels in the original label space
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let [negative, positive] = self.classes;
        Ok(self
            .decision_function(x)?
            .mapv(|f| if f >= 0.0 { positive } else { negative }))
    }

    /// Predict labels together with the decision values
    pub fn predict_detailed(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Prediction>> {
        let [negative, positive] = self.classes;
        Ok(self
            .decision_function(x)?
            .iter()
            .map(|&f| Prediction::new(if f >= 0.0 { positive } else { negative }, f))
            .collect())
    }

    /// Accuracy on labelled data
    pub fn score(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<f64> {
        Ok(self.evaluate_detailed(x, y)?.accuracy())
    }

    /// Confusion counts with the larger label as the positive class
    pub fn evaluate_detailed(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<EvaluationMetrics> {
        check_targets(x, y)?;
        let predictions = self.predict(x)?;
        let positive = self.classes[1];

        let mut tp = 0; // True positives
        let mut tn = 0; // True negatives
        let mut fp = 0; // False positives
        let mut fn_ = 0; // False negatives

        for (&pred, &actual) in predictions.iter().zip(y.iter()) {
            match (pred == positive, actual == positive) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }

        Ok(EvaluationMetrics::new(tp, tn, fp, fn_))
    }

    pub fn evaluate_dataset<D: Dataset>(&self, dataset: &D) -> Result<EvaluationMetrics> {
        self.evaluate_detailed(dataset.features(), dataset.targets())
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            n_support_vectors: self.support.len(),
            bias: self.intercept,
            support_vector_indices: self.support.clone(),
        }
    }
}

impl<K: Kernel> SVMModel for FittedSVC<K> {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        FittedSVC::predict(self, x)
    }

    fn n_support_vectors(&self) -> usize {
        self.support.len()
    }

    fn bias(&self) -> f64 {
        self.intercept
    }
}

/// Epsilon-insensitive support vector regressor with builder pattern
pub struct SVR<K: Kernel = LinearKernel> {
    kernel: K,
    config: SmoConfig,
}

impl SVR<LinearKernel> {
    pub fn new() -> Self {
        Self::with_kernel(LinearKernel::new())
    }
}

impl Default for SVR<LinearKernel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> SVR<K> {
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel,
            config: SmoConfig::default(),
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    /// Set the half-width of the insensitive tube
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn config(&self) -> &SmoConfig {
        &self.config
    }

    pub fn fit(self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<FittedSVR<K>> {
        check_training_data(x, y, &self.config)?;
        if y.iter().any(|v| !v.is_finite()) {
            return Err(SVMError::InvalidDataset(
                "targets contain NaN or infinite values".to_string(),
            ));
        }

        let config = SmoConfig {
            linear_kernel: self.kernel.is_linear(),
            ..self.config
        };
        let gram = gram_matrix(&self.kernel, x);
        let solution = train_regressor(x, y, gram.view(), &config)?;

        let support: Vec<usize> = solution
            .alphas_plus
            .iter()
            .zip(solution.alphas_minus.iter())
            .enumerate()
            .filter(|(_, (&plus, &minus))| plus > SUPPORT_THRESHOLD || minus > SUPPORT_THRESHOLD)
            .map(|(i, _)| i)
            .collect();
        let net = solution.dual_coef();
        let dual_coef = support.iter().map(|&i| net[i]).collect::<Array1<f64>>();

        info!(
            "fitted SVR on {} samples x {} features: {} support vectors, {} sweeps, {} updates",
            x.nrows(),
            x.ncols(),
            support.len(),
            solution.stats.sweeps,
            solution.stats.updates
        );

        Ok(FittedSVR {
            kernel: self.kernel,
            config,
            support_vectors: x.select(Axis(0), &support),
            support,
            dual_coef,
            coef: solution.weights,
            intercept: solution.bias,
            stats: solution.stats,
        })
    }

    pub fn fit_dataset<D: Dataset>(self, dataset: &D) -> Result<FittedSVR<K>> {
        self.fit(dataset.features(), dataset.targets())
    }

    pub fn fit_from_file<P: AsRef<Path>>(self, path: P) -> Result<FittedSVR<K>> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.fit_dataset(&dataset)
    }

    pub fn fit_from_csv<P: AsRef<Path>>(self, path: P) -> Result<FittedSVR<K>> {
        let dataset = CSVDataset::from_file(path)?;
        self.fit_dataset(&dataset)
    }
}

/// Fitted regressor
#[derive(Debug, Clone)]
pub struct FittedSVR<K: Kernel> {
    pub(crate) kernel: K,
    pub(crate) config: SmoConfig,
    pub(crate) support: Vec<usize>,
    pub(crate) support_vectors: Array2<f64>,
    /// `alpha_plus_i - alpha_minus_i` per support vector
    pub(crate) dual_coef: Array1<f64>,
    pub(crate) coef: Option<Array1<f64>>,
    pub(crate) intercept: f64,
    pub(crate) stats: SolverStats,
}

impl<K: Kernel> FittedSVR<K> {
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn config(&self) -> &SmoConfig {
        &self.config
    }

    pub fn support(&self) -> &[usize] {
        &self.support
    }

    pub fn support_vectors(&self) -> ArrayView2<'_, f64> {
        self.support_vectors.view()
    }

    pub fn dual_coef(&self) -> ArrayView1<'_, f64> {
        self.dual_coef.view()
    }

    pub fn coef(&self) -> Option<ArrayView1<'_, f64>> {
        self.coef.as_ref().map(|w| w.view())
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn n_features(&self) -> usize {
        self.support_vectors.ncols()
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_features(x, self.n_features())?;
        Ok(match &self.coef {
            Some(w) => x.dot(w) + self.intercept,
            None => {
                cross_kernel_matrix(&self.kernel, x, self.support_vectors.view())
                    .dot(&self.dual_coef)
                    + self.intercept
            }
        })
    }

    /// Coefficient of determination
    pub fn score(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<f64> {
        Ok(self.evaluate_detailed(x, y)?.r2)
    }

    pub fn evaluate_detailed(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<RegressionMetrics> {
        check_targets(x, y)?;
        let predictions = self.predict(x)?;
        Ok(RegressionMetrics::new(predictions.view(), y))
    }

    pub fn evaluate_dataset<D: Dataset>(&self, dataset: &D) -> Result<RegressionMetrics> {
        self.evaluate_detailed(dataset.features(), dataset.targets())
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            n_support_vectors: self.support.len(),
            bias: self.intercept,
            support_vector_indices: self.support.clone(),
        }
    }
}

impl<K: Kernel> SVMModel for FittedSVR<K> {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        FittedSVR::predict(self, x)
    }

    fn n_support_vectors(&self) -> usize {
        self.support.len()
    }

    fn bias(&self) -> f64 {
        self.intercept
    }
}

fn check_training_data(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    config: &SmoConfig,
) -> Result<()> {
    if x.nrows() == 0 {
        return Err(SVMError::EmptyDataset);
    }
    check_targets(x, y)?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SVMError::InvalidDataset(
            "features contain NaN or infinite values".to_string(),
        ));
    }
    config.validate()
}

fn check_targets(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
    if y.len() != x.nrows() {
        return Err(SVMError::DimensionMismatch {
            expected: x.nrows(),
            actual: y.len(),
        });
    }
    Ok(())
}

fn check_features(x: ArrayView2<'_, f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(SVMError::DimensionMismatch {
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}

/// The two distinct labels in ascending order
fn binary_classes(y: ArrayView1<'_, f64>) -> Result<[f64; 2]> {
    if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
        return Err(SVMError::InvalidLabel(format!("label {bad} is not finite")));
    }

    let mut classes: Vec<f64> = y.to_vec();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();

    match classes[..] {
        [negative, positive] => Ok([negative, positive]),
        [only] => Err(SVMError::InvalidLabel(format!(
            "need two classes, all samples are labelled {only}"
        ))),
        _ => Err(SVMError::InvalidLabel(format!(
            "found {} classes, SVC is binary; train one classifier per class (one-vs-rest)",
            classes.len()
        ))),
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total =
            self.true_positives + self.true_negatives + self.false_positives + self.false_negatives;
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        let denominator = self.true_negatives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_negatives as f64 / denominator as f64
        }
    }
}

/// Error summary of a regressor on labelled data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub n_samples: usize,
    /// Mean squared error
    pub mse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination; 1.0 for a perfect fit of constant targets
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn new(predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Self {
        let n = actual.len();
        if n == 0 {
            return Self {
                n_samples: 0,
                mse: 0.0,
                mae: 0.0,
                r2: 0.0,
            };
        }

        let residuals = &actual - &predicted;
        let ss_res = residuals.mapv(|r| r * r).sum();
        let mean = actual.sum() / n as f64;
        let ss_tot = actual.mapv(|v| (v - mean) * (v - mean)).sum();

        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            n_samples: n,
            mse: ss_res / n as f64,
            mae: residuals.mapv(f64::abs).sum() / n as f64,
            r2,
        }
    }

    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub n_support_vectors: usize,
    pub bias: f64,
    pub support_vector_indices: Vec<usize>,
}
