//! smosvm Command Line Interface
//!
//! Train, evaluate and apply SMO-trained classifiers and regressors on
//! LibSVM and CSV data.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use smosvm::api::{SVC, SVR};
use smosvm::core::{Dataset, Result, SVMError};
use smosvm::kernel::{
    Gamma, KernelKind, LaplacianKernel, PolynomialKernel, RBFKernel, SigmoidKernel,
};
use smosvm::persistence::{SerializableModel, Task};
use smosvm::{CSVDataset, LibSVMDataset};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "smosvm")]
#[command(about = "Support vector classification and regression trained with SMO")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new model
    Train(TrainArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on labelled data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliTask {
    /// Binary classification
    Classify,
    /// Epsilon-insensitive regression
    Regress,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    Linear,
    Polynomial,
    Rbf,
    Laplacian,
    Sigmoid,
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM or CSV format)
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,

    #[arg(long, value_enum, default_value = "classify")]
    task: CliTask,

    #[arg(short, long, value_enum, default_value = "linear")]
    kernel: CliKernel,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Tolerance on the optimality gap
    #[arg(long, default_value = "0.001")]
    tol: f64,

    /// Half-width of the insensitive tube (regression)
    #[arg(short, long, default_value = "0.1")]
    epsilon: f64,

    /// Kernel coefficient: scale, auto, or a positive number
    #[arg(short, long, default_value = "scale")]
    gamma: Gamma,

    /// Polynomial degree
    #[arg(long, default_value = "3")]
    degree: f64,

    /// Independent term of the polynomial and sigmoid kernels
    #[arg(long, default_value = "0.0")]
    coef0: f64,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Show decision values (classification)
    #[arg(long)]
    confidence: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Show detailed metrics
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training {:?} model with {:?} kernel", args.task, args.kernel);
    info!("Data file: {:?}", args.data);
    info!(
        "Parameters: C={}, tol={}, epsilon={}",
        args.c, args.tol, args.epsilon
    );

    let dataset = load_dataset(&args.data, &args.format, None)?;
    info!(
        "Loaded {} samples with {} dimensions",
        dataset.len(),
        dataset.dim()
    );

    if dataset.len() < 2 {
        return Err(SVMError::InvalidDataset(
            "Dataset must contain at least 2 samples".to_string(),
        ));
    }

    let kernel = build_kernel(&args, &*dataset)?;
    info!("Kernel: {kernel}");

    let serializable = match args.task {
        CliTask::Classify => {
            let model = SVC::with_kernel(kernel)
                .with_c(args.c)
                .with_tol(args.tol)
                .fit(dataset.features(), dataset.targets())?;
            let accuracy = model.score(dataset.features(), dataset.targets())?;
            info!("Support vectors: {}", model.support().len());
            info!("Training accuracy: {:.2}%", accuracy * 100.0);
            SerializableModel::from_classifier(&model)
        }
        CliTask::Regress => {
            let model = SVR::with_kernel(kernel)
                .with_c(args.c)
                .with_tol(args.tol)
                .with_epsilon(args.epsilon)
                .fit(dataset.features(), dataset.targets())?;
            let metrics = model.evaluate_detailed(dataset.features(), dataset.targets())?;
            info!("Support vectors: {}", model.support().len());
            info!(
                "Training MSE: {:.6}, R^2: {:.4}",
                metrics.mse, metrics.r2
            );
            SerializableModel::from_regressor(&model)
        }
    };

    serializable.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    Ok(())
}

fn build_kernel(args: &TrainArgs, dataset: &dyn Dataset) -> Result<KernelKind> {
    let gamma = || -> Result<f64> {
        let value = args.gamma.resolve(dataset.features());
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(SVMError::InvalidParameter(format!(
                "gamma must be positive, got {value}"
            )))
        }
    };

    Ok(match args.kernel {
        CliKernel::Linear => KernelKind::Linear,
        CliKernel::Polynomial => {
            if !(args.degree > 0.0) {
                return Err(SVMError::InvalidParameter(format!(
                    "degree must be positive, got {}",
                    args.degree
                )));
            }
            PolynomialKernel::new(args.degree, gamma()?, args.coef0).into()
        }
        CliKernel::Rbf => RBFKernel::new(gamma()?).into(),
        CliKernel::Laplacian => LaplacianKernel::new(gamma()?).into(),
        CliKernel::Sigmoid => SigmoidKernel::new(gamma()?, args.coef0).into(),
    })
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model = SerializableModel::load_from_file(&args.model)?;

    info!("Loading prediction data from: {:?}", args.data);
    let dataset = load_dataset(
        &args.data,
        &args.format,
        Some(serializable_model.n_features),
    )?;

    info!(
        "Making predictions using model with {} support vectors",
        serializable_model.metadata.n_support_vectors
    );

    let lines: Vec<String> = match serializable_model.task {
        Task::Classify => {
            let model = serializable_model.to_classifier()?;
            model
                .predict_detailed(dataset.features())?
                .iter()
                .enumerate()
                .map(|(i, pred)| {
                    if args.confidence {
                        format!("{} {} {:.6}", i, pred.label, pred.decision_value)
                    } else {
                        format!("{} {}", i, pred.label)
                    }
                })
                .collect()
        }
        Task::Regress => {
            let model = serializable_model.to_regressor()?;
            model
                .predict(dataset.features())?
                .iter()
                .enumerate()
                .map(|(i, value)| format!("{i} {value:.6}"))
                .collect()
        }
    };

    let header = format!(
        "# Predictions for {} samples\n# Format: sample_index {}{}",
        lines.len(),
        match serializable_model.task {
            Task::Classify => "predicted_label",
            Task::Regress => "predicted_value",
        },
        if args.confidence && serializable_model.task == Task::Classify {
            " decision_value"
        } else {
            ""
        }
    );

    match &args.output {
        Some(output_path) => {
            let file = File::create(output_path)?;
            write_predictions(BufWriter::new(file), &header, &lines)?;
            info!("Predictions saved to: {output_path:?}");
        }
        None => write_predictions(io::stdout().lock(), &header, &lines)?,
    }

    Ok(())
}

fn write_predictions<W: Write>(mut writer: W, header: &str, lines: &[String]) -> Result<()> {
    writeln!(writer, "{header}")?;
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model = SerializableModel::load_from_file(&args.model)?;

    info!("Loading test data from: {:?}", args.data);
    let dataset = load_dataset(
        &args.data,
        &args.format,
        Some(serializable_model.n_features),
    )?;

    println!("=== Model Evaluation ===");
    serializable_model.print_summary();
    println!("\nTest Results:");

    match serializable_model.task {
        Task::Classify => {
            let model = serializable_model.to_classifier()?;
            let metrics = model.evaluate_detailed(dataset.features(), dataset.targets())?;
            println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);

            if args.detailed {
                println!("\nDetailed Metrics:");
                println!("  True Positives:  {}", metrics.true_positives);
                println!("  True Negatives:  {}", metrics.true_negatives);
                println!("  False Positives: {}", metrics.false_positives);
                println!("  False Negatives: {}", metrics.false_negatives);
                println!("  Precision:       {:.4}", metrics.precision());
                println!("  Recall:          {:.4}", metrics.recall());
                println!("  F1 Score:        {:.4}", metrics.f1_score());
                println!("  Specificity:     {:.4}", metrics.specificity());
            }
        }
        Task::Regress => {
            let model = serializable_model.to_regressor()?;
            let metrics = model.evaluate_detailed(dataset.features(), dataset.targets())?;
            println!("  R^2: {:.4}", metrics.r2);

            if args.detailed {
                println!("\nDetailed Metrics:");
                println!("  Samples: {}", metrics.n_samples);
                println!("  MSE:     {:.6}", metrics.mse);
                println!("  RMSE:    {:.6}", metrics.rmse());
                println!("  MAE:     {:.6}", metrics.mae);
            }
        }
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model = SerializableModel::load_from_file(&args.model)?;

    serializable_model.print_summary();

    println!("\nSupport Vector Details:");
    println!("  Total: {}", serializable_model.support_vectors.len());
    if let Some(first_sv) = serializable_model.support_vectors.first() {
        let shown = first_sv.len().min(5);
        println!("  First SV: {:?}", &first_sv[..shown]);
        if first_sv.len() > shown {
            println!("    ... ({} more)", first_sv.len() - shown);
        }
    }

    println!("\nDual coefficients:");
    let dual_coef = &serializable_model.dual_coef;
    let n_show = dual_coef.len().min(10);
    for (sv, coef) in serializable_model
        .support
        .iter()
        .zip(dual_coef.iter())
        .take(n_show)
    {
        println!("  sample {sv}: {coef:.6}");
    }
    if dual_coef.len() > n_show {
        println!("  ... ({} more)", dual_coef.len() - n_show);
    }

    Ok(())
}

fn load_dataset(
    path: &Path,
    format: &str,
    n_features: Option<usize>,
) -> Result<Box<dyn Dataset>> {
    let format = if format == "auto" {
        detect_format(path)
    } else {
        format.to_string()
    };
    info!("Loading dataset as {format} format");

    let dataset: Box<dyn Dataset> = match format.as_str() {
        "libsvm" => match n_features {
            Some(n) => Box::new(LibSVMDataset::from_file_with_dim(path, n)?),
            None => Box::new(LibSVMDataset::from_file(path)?),
        },
        "csv" => Box::new(CSVDataset::from_file(path)?),
        _ => {
            return Err(SVMError::InvalidParameter(format!(
                "Unsupported format: {format}. Use 'libsvm' or 'csv'"
            )))
        }
    };
    Ok(dataset)
}

fn detect_format(path: &Path) -> String {
    if let Some(ext) = path.extension() {
        match ext.to_str() {
            Some("csv") => "csv".to_string(),
            Some("libsvm") | Some("svm") => "libsvm".to_string(),
            _ => {
                warn!("Unknown file extension, assuming LibSVM format");
                "libsvm".to_string()
            }
        }
    } else {
        warn!("No file extension, assuming LibSVM format");
        "libsvm".to_string()
    }
}
