//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! target index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1
//!
//! Indices are 1-based. Missing entries are zero in the dense feature
//! matrix. Targets are kept as written, so the same loader serves class
//! labels and regression targets.

use crate::core::{Dataset, Result, SVMError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

type SparseRow = Vec<(usize, f64)>;

/// Dense dataset read from a LibSVM format file
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    features: Array2<f64>,
    targets: Array1<f64>,
}

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a file whose rows must have exactly `n_features` columns, as
    /// when scoring a fitted model on a sparse test file.
    pub fn from_file_with_dim<P: AsRef<Path>>(path: P, n_features: usize) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader_with_dim(BufReader::new(file), Some(n_features))
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_dim(reader, None)
    }

    pub fn from_reader_with_dim<R: BufRead>(reader: R, n_features: Option<usize>) -> Result<Self> {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        let mut max_dimension = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (target, row) = Self::parse_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            if let Some(&(last, _)) = row.iter().max_by_key(|(idx, _)| *idx) {
                max_dimension = max_dimension.max(last + 1);
            }
            targets.push(target);
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let dim = match n_features {
            Some(n) if max_dimension > n => {
                return Err(SVMError::DimensionMismatch {
                    expected: n,
                    actual: max_dimension,
                })
            }
            Some(n) => n,
            None => max_dimension,
        };

        let mut features = Array2::zeros((rows.len(), dim));
        for (i, row) in rows.iter().enumerate() {
            for &(j, value) in row {
                features[[i, j]] = value;
            }
        }

        Ok(LibSVMDataset {
            features,
            targets: Array1::from(targets),
        })
    }

    /// Parse a single line into its target and 0-based sparse entries
    fn parse_line(line: &str) -> Result<(f64, SparseRow)> {
        let mut parts = line.split_whitespace();

        let target_str = parts
            .next()
            .ok_or_else(|| SVMError::ParseError("Empty line".to_string()))?;
        let target = target_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid target: {target_str}")))?;

        let mut row = Vec::new();
        for feature_str in parts {
            let (index_str, value_str) = feature_str.split_once(':').ok_or_else(|| {
                SVMError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index_str.parse::<usize>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature index: {index_str}"))
            })?;
            let value = value_str.parse::<f64>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature value: {value_str}"))
            })?;

            // libsvm uses 1-based indexing
            if index == 0 {
                return Err(SVMError::ParseError(
                    "Feature index must be positive: 0".to_string(),
                ));
            }
            row.push((index - 1, value));
        }

        Ok((target, row))
    }
}

impl Dataset for LibSVMDataset {
    fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    fn targets(&self) -> ArrayView1<'_, f64> {
        self.targets.view()
    }
}
