//! Integration tests for the CLI application
//!
//! These tests verify that the CLI commands work correctly with real data files.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub libsvm_file: NamedTempFile,
    pub csv_file: NamedTempFile,
    pub test_libsvm_file: NamedTempFile,
    pub regression_csv_file: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        // LibSVM training data without an extension, auto-detected as LibSVM
        let mut libsvm_file = NamedTempFile::new()?;
        writeln!(libsvm_file, "+1 1:2.0 2:1.0")?;
        writeln!(libsvm_file, "-1 1:-2.0 2:-1.0")?;
        writeln!(libsvm_file, "+1 1:1.5 2:0.8")?;
        writeln!(libsvm_file, "-1 1:-1.5 2:-0.8")?;
        writeln!(libsvm_file, "+1 1:1.8 2:0.9")?;
        writeln!(libsvm_file, "-1 1:-1.8 2:-0.9")?;
        libsvm_file.flush()?;

        let mut csv_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(csv_file, "feature1,feature2,label")?;
        writeln!(csv_file, "2.0,1.0,1")?;
        writeln!(csv_file, "-2.0,-1.0,-1")?;
        writeln!(csv_file, "1.5,0.8,1")?;
        writeln!(csv_file, "-1.5,-0.8,-1")?;
        writeln!(csv_file, "1.8,0.9,1")?;
        writeln!(csv_file, "-1.8,-0.9,-1")?;
        csv_file.flush()?;

        // Second feature missing on one row, padded from the model width
        let mut test_libsvm_file = NamedTempFile::with_suffix(".libsvm")?;
        writeln!(test_libsvm_file, "+1 1:1.6 2:0.7")?;
        writeln!(test_libsvm_file, "-1 1:-1.6")?;
        test_libsvm_file.flush()?;

        // y = 2x + 1
        let mut regression_csv_file = NamedTempFile::with_suffix(".csv")?;
        for i in 0..11 {
            let x = i as f64 * 0.5 - 2.5;
            writeln!(regression_csv_file, "{},{}", x, 2.0 * x + 1.0)?;
        }
        regression_csv_file.flush()?;

        Ok(TestDataFiles {
            libsvm_file,
            csv_file,
            test_libsvm_file,
            regression_csv_file,
        })
    }
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_smosvm"))
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn train_model(data: &Path, model: &Path, extra: &[&str]) {
    let mut args = vec!["train", "--data", path_str(data), "--output", path_str(model)];
    args.extend_from_slice(extra);
    let output = run_cli(&args);

    assert!(
        output.status.success(),
        "Train command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(model.exists(), "Model file was not created");
}

#[test]
fn test_cli_train_command_libsvm() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(
        test_data.libsvm_file.path(),
        &model_path,
        &["--format", "libsvm", "-C", "1.0", "--tol", "0.001"],
    );

    let content = std::fs::read_to_string(&model_path).unwrap();
    assert!(content.contains("\"task\": \"classify\""));
    assert!(content.contains("\"type\": \"linear\""));
}

#[test]
fn test_cli_train_command_csv() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(
        test_data.csv_file.path(),
        &model_path,
        &["--format", "csv", "-C", "2.0"],
    );
}

#[test]
fn test_cli_train_rbf_kernel_with_gamma() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(
        test_data.csv_file.path(),
        &model_path,
        &["--kernel", "rbf", "--gamma", "0.5", "-C", "10"],
    );

    let content = std::fs::read_to_string(&model_path).unwrap();
    assert!(content.contains("\"type\": \"rbf\""));
    assert!(content.contains("0.5"));
}

#[test]
fn test_cli_predict_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");
    let predictions_path = temp_dir.path().join("predictions.txt");

    train_model(test_data.libsvm_file.path(), &model_path, &["-C", "10"]);

    let output = run_cli(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--output",
        path_str(&predictions_path),
    ]);

    assert!(
        output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let predictions = std::fs::read_to_string(&predictions_path).unwrap();
    let lines: Vec<&str> = predictions.lines().collect();
    assert_eq!(lines[0], "# Predictions for 2 samples");
    assert_eq!(lines[1], "# Format: sample_index predicted_label");
    assert_eq!(lines[2], "0 1");
    assert_eq!(lines[3], "1 -1");
}

#[test]
fn test_cli_predict_with_confidence_to_stdout() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(test_data.libsvm_file.path(), &model_path, &[]);

    let output = run_cli(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--confidence",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("predicted_label decision_value"));

    let first: Vec<&str> = stdout
        .lines()
        .find(|line| line.starts_with("0 "))
        .unwrap()
        .split_whitespace()
        .collect();
    assert_eq!(first.len(), 3);
    assert!(first[2].parse::<f64>().unwrap() > 0.0);
}

#[test]
fn test_cli_evaluate_detailed() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(test_data.csv_file.path(), &model_path, &[]);

    let output = run_cli(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.csv_file.path()),
        "--detailed",
    ]);

    assert!(
        output.status.success(),
        "Evaluate command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Accuracy: 100.00%"));
    assert!(stdout.contains("Precision"));
    assert!(stdout.contains("F1 Score"));
}

#[test]
fn test_cli_regression_workflow() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("svr.json");

    train_model(
        test_data.regression_csv_file.path(),
        &model_path,
        &["--task", "regress", "-C", "10", "--epsilon", "0.05"],
    );

    let output = run_cli(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.regression_csv_file.path()),
        "--detailed",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Task: regression"));
    assert!(stdout.contains("MSE"));

    let r2 = stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("R^2: "))
        .and_then(|value| value.parse::<f64>().ok())
        .expect("R^2 line missing");
    assert!(r2 > 0.99, "R^2 too low: {r2}");

    let output = run_cli(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.regression_csv_file.path()),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Format: sample_index predicted_value"));
    assert_eq!(stdout.lines().filter(|l| !l.starts_with('#')).count(), 11);
}

#[test]
fn test_cli_info_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(test_data.libsvm_file.path(), &model_path, &[]);

    let output = run_cli(&["info", path_str(&model_path)]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Task: classification"));
    assert!(stdout.contains("Support Vector Details"));
    assert!(stdout.contains("Dual coefficients"));
}

#[test]
fn test_cli_error_handling_invalid_file() {
    let output = run_cli(&[
        "train",
        "--data",
        "/nonexistent/file.libsvm",
        "--output",
        "/tmp/model.json",
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_cli_error_handling_invalid_format() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = run_cli(&[
        "train",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--output",
        path_str(&model_path),
        "--format",
        "parquet",
    ]);

    assert!(!output.status.success());
    assert!(!model_path.exists());
}

#[test]
fn test_cli_rejects_invalid_parameters() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");
    let data = path_str(test_data.csv_file.path());
    let model = path_str(&model_path);

    for extra in [
        ["-C", "-1"],
        ["--tol", "0"],
        ["--gamma", "fast"],
        ["--kernel", "cosine"],
    ] {
        let mut args = vec!["train", "--data", data, "--output", model];
        args.extend_from_slice(&extra);
        let output = run_cli(&args);
        assert!(!output.status.success(), "accepted {extra:?}");
    }
    assert!(!model_path.exists());
}

#[test]
fn test_cli_train_single_class_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let mut data = NamedTempFile::with_suffix(".libsvm").unwrap();
    writeln!(data, "+1 1:1.0").unwrap();
    writeln!(data, "+1 1:2.0").unwrap();
    data.flush().unwrap();

    let output = run_cli(&[
        "train",
        "--data",
        path_str(data.path()),
        "--output",
        path_str(&model_path),
    ]);

    assert!(!output.status.success());
    assert!(!model_path.exists());
}

#[test]
fn test_cli_verbose_and_debug_flags() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(test_data.libsvm_file.path(), &model_path, &["--verbose"]);
    train_model(test_data.libsvm_file.path(), &model_path, &["--debug"]);
}

#[test]
fn test_cli_help_and_version() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["train", "predict", "evaluate", "info"] {
        assert!(help.contains(command), "help is missing {command}");
    }

    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}
