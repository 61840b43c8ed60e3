//! Model serialization and persistence
//!
//! Fitted models are stored as pretty-printed JSON. Any fitted model whose
//! kernel converts into [`KernelKind`] can be saved; loading always yields a
//! `FittedSVC<KernelKind>` or `FittedSVR<KernelKind>`.

use crate::api::{FittedSVC, FittedSVR};
use crate::core::{Result, SVMError, SmoConfig, SolverStats};
use crate::kernel::{Kernel, KernelKind};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// What a saved model was trained for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Classify,
    Regress,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Classify => write!(f, "classification"),
            Task::Regress => write!(f, "regression"),
        }
    }
}

/// Serializable representation of a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableModel {
    pub task: Task,
    pub kernel: KernelKind,
    pub n_features: usize,
    /// Training-set indices of the support vectors
    pub support: Vec<usize>,
    /// One dense row per support vector
    pub support_vectors: Vec<Vec<f64>>,
    /// `alpha_i * y_i` (classification) or `alpha_plus_i - alpha_minus_i`
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    /// Primal weights of a linear model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef: Option<Vec<f64>>,
    /// `[negative, positive]` labels of a classifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<[f64; 2]>,
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    pub n_support_vectors: usize,
    pub training_params: TrainingParams,
    pub solver_stats: SolverStats,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// Training parameters for reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub c: f64,
    pub tol: f64,
    pub epsilon: f64,
}

impl From<&SmoConfig> for TrainingParams {
    fn from(config: &SmoConfig) -> Self {
        Self {
            c: config.c,
            tol: config.tol,
            epsilon: config.epsilon,
        }
    }
}

fn metadata(config: &SmoConfig, stats: &SolverStats, n_support_vectors: usize) -> ModelMetadata {
    ModelMetadata {
        library_version: env!("CARGO_PKG_VERSION").to_string(),
        n_support_vectors,
        training_params: TrainingParams::from(config),
        solver_stats: *stats,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

impl SerializableModel {
    /// Snapshot a fitted classifier
    pub fn from_classifier<K>(model: &FittedSVC<K>) -> Self
    where
        K: Kernel + Clone + Into<KernelKind>,
    {
        Self {
            task: Task::Classify,
            kernel: model.kernel().clone().into(),
            n_features: model.n_features(),
            support: model.support().to_vec(),
            support_vectors: model
                .support_vectors()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect(),
            dual_coef: model.dual_coef().to_vec(),
            intercept: model.intercept(),
            coef: model.coef().map(|w| w.to_vec()),
            classes: Some(model.classes()),
            metadata: metadata(model.config(), model.stats(), model.support().len()),
        }
    }

    /// Snapshot a fitted regressor
    pub fn from_regressor<K>(model: &FittedSVR<K>) -> Self
    where
        K: Kernel + Clone + Into<KernelKind>,
    {
        Self {
            task: Task::Regress,
            kernel: model.kernel().clone().into(),
            n_features: model.n_features(),
            support: model.support().to_vec(),
            support_vectors: model
                .support_vectors()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect(),
            dual_coef: model.dual_coef().to_vec(),
            intercept: model.intercept(),
            coef: model.coef().map(|w| w.to_vec()),
            classes: None,
            metadata: metadata(model.config(), model.stats(), model.support().len()),
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| SVMError::SerializationError(e.to_string()))
    }

    /// Rebuild the classifier; fails for a regression model
    pub fn to_classifier(&self) -> Result<FittedSVC<KernelKind>> {
        self.expect_task(Task::Classify)?;
        let classes = self.classes.ok_or_else(|| {
            SVMError::SerializationError("classifier is missing its class labels".to_string())
        })?;
        let (support_vectors, dual_coef, coef) = self.arrays()?;

        Ok(FittedSVC {
            kernel: self.kernel,
            config: self.config(),
            classes,
            support: self.support.clone(),
            support_vectors,
            dual_coef,
            coef,
            intercept: self.intercept,
            stats: self.metadata.solver_stats,
        })
    }

    /// Rebuild the regressor; fails for a classification model
    pub fn to_regressor(&self) -> Result<FittedSVR<KernelKind>> {
        self.expect_task(Task::Regress)?;
        let (support_vectors, dual_coef, coef) = self.arrays()?;

        Ok(FittedSVR {
            kernel: self.kernel,
            config: self.config(),
            support: self.support.clone(),
            support_vectors,
            dual_coef,
            coef,
            intercept: self.intercept,
            stats: self.metadata.solver_stats,
        })
    }

    fn expect_task(&self, task: Task) -> Result<()> {
        if self.task != task {
            return Err(SVMError::InvalidParameter(format!(
                "model was trained for {}, not {}",
                self.task, task
            )));
        }
        Ok(())
    }

    fn config(&self) -> SmoConfig {
        let params = self.metadata.training_params;
        SmoConfig {
            c: params.c,
            tol: params.tol,
            epsilon: params.epsilon,
            linear_kernel: self.kernel.is_linear(),
        }
    }

    /// Support vectors, dual coefficients and weights, shape-checked
    fn arrays(&self) -> Result<(Array2<f64>, Array1<f64>, Option<Array1<f64>>)> {
        let n_sv = self.support_vectors.len();
        if self.dual_coef.len() != n_sv || self.support.len() != n_sv {
            return Err(SVMError::SerializationError(format!(
                "{} support vectors but {} dual coefficients and {} indices",
                n_sv,
                self.dual_coef.len(),
                self.support.len()
            )));
        }
        if let Some(row) = self.support_vectors.iter().find(|row| row.len() != self.n_features) {
            return Err(SVMError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let flat: Vec<f64> = self.support_vectors.iter().flatten().copied().collect();
        let support_vectors = Array2::from_shape_vec((n_sv, self.n_features), flat)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;

        let coef = match &self.coef {
            Some(w) if w.len() != self.n_features => {
                return Err(SVMError::DimensionMismatch {
                    expected: self.n_features,
                    actual: w.len(),
                })
            }
            Some(w) => Some(Array1::from(w.clone())),
            None => None,
        };

        Ok((support_vectors, Array1::from(self.dual_coef.clone()), coef))
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== SVM Model Summary ===");
        println!("Task: {}", self.task);
        println!("Kernel: {}", self.kernel);
        println!("Features: {}", self.n_features);
        println!("Support Vectors: {}", self.metadata.n_support_vectors);
        println!("Intercept: {:.6}", self.intercept);
        if let Some([negative, positive]) = self.classes {
            println!("Classes: {negative} (negative), {positive} (positive)");
        }
        if let Some(w) = &self.coef {
            println!("Weights: {w:?}");
        }
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Training Parameters:");
        println!("  C: {}", self.metadata.training_params.c);
        println!("  Tolerance: {}", self.metadata.training_params.tol);
        if self.task == Task::Regress {
            println!("  Epsilon: {}", self.metadata.training_params.epsilon);
        }
        println!(
            "Solver: {} sweeps, {} updates, final gap {:.3e}",
            self.metadata.solver_stats.sweeps,
            self.metadata.solver_stats.updates,
            self.metadata.solver_stats.gap
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SVC, SVR};
    use crate::kernel::RBFKernel;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use tempfile::NamedTempFile;

    #[test]
    fn test_classifier_round_trip() -> Result<()> {
        let x = array![[2.0, 0.5], [1.5, 1.0], [-2.0, -0.5], [-1.0, -1.5]];
        let y = array![1.0, 1.0, 0.0, 0.0];
        let model = SVC::with_kernel(RBFKernel::new(0.5))
            .with_c(2.0)
            .fit(x.view(), y.view())?;
        let serializable = SerializableModel::from_classifier(&model);

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        serializable.save_to_file(temp_file.path())?;
        let loaded = SerializableModel::load_from_file(temp_file.path())?;

        assert_eq!(loaded.task, Task::Classify);
        assert_eq!(loaded.kernel, KernelKind::Rbf(RBFKernel::new(0.5)));
        assert_eq!(loaded.classes, Some([0.0, 1.0]));
        assert_eq!(loaded.metadata.training_params.c, 2.0);

        let restored = loaded.to_classifier()?;
        assert_eq!(restored.support(), model.support());
        assert_eq!(restored.predict(x.view())?, model.predict(x.view())?);
        let before = model.decision_function(x.view())?;
        let after = restored.decision_function(x.view())?;
        for (a, b) in before.iter().zip(after.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_regressor_round_trip() -> Result<()> {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];
        let model = SVR::new().with_c(5.0).fit(x.view(), y.view())?;
        let serializable = SerializableModel::from_regressor(&model);

        let json = serde_json::to_string(&serializable).unwrap();
        assert!(json.contains("\"task\":\"regress\""));
        assert!(!json.contains("\"classes\""));

        let loaded: SerializableModel = serde_json::from_str(&json).unwrap();
        let restored = loaded.to_regressor()?;
        assert_abs_diff_eq!(restored.coef().unwrap()[0], model.coef().unwrap()[0], epsilon = 1e-12);
        let before = model.predict(x.view())?;
        let after = restored.predict(x.view())?;
        for (a, b) in before.iter().zip(after.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_wrong_task_rejected() -> Result<()> {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let model = SVR::new().fit(x.view(), y.view())?;
        let serializable = SerializableModel::from_regressor(&model);

        assert!(matches!(
            serializable.to_classifier(),
            Err(SVMError::InvalidParameter(_))
        ));
        Ok(())
    }

    #[test]
    fn test_inconsistent_model_rejected() -> Result<()> {
        let x = array![[1.0, 1.0], [-1.0, -1.0]];
        let y = array![1.0, -1.0];
        let model = SVC::new().fit(x.view(), y.view())?;
        let mut serializable = SerializableModel::from_classifier(&model);
        serializable.n_features = 3;

        assert!(matches!(
            serializable.to_classifier(),
            Err(SVMError::DimensionMismatch { expected: 3, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_load_garbage_fails() {
        use std::io::Write;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "{{ not json").expect("Failed to write");
        let result = SerializableModel::load_from_file(temp_file.path());
        assert!(matches!(result, Err(SVMError::SerializationError(_))));
    }
}
