//! CSV format dataset implementation
//!
//! Supports loading datasets from CSV files where:
//! - The last column is the target (class label or regression value)
//! - All other columns are features
//! - First row can be headers (automatically detected)
//! - Lines starting with `#` are comments

use crate::core::{Dataset, Result, SVMError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dense dataset read from a CSV file
#[derive(Debug, Clone)]
pub struct CSVDataset {
    features: Array2<f64>,
    targets: Array1<f64>,
    header: Option<Vec<String>>,
}

impl CSVDataset {
    /// Load a dataset from a CSV file
    ///
    /// The last column is assumed to be the target.
    /// Headers are automatically detected if present.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_reader_with_options<R: BufRead>(
        reader: R,
        auto_detect_header: bool,
    ) -> Result<Self> {
        let mut values: Vec<f64> = Vec::new();
        let mut targets = Vec::new();
        let mut width: Option<usize> = None;
        let mut header = None;
        let mut first_data_line = true;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if first_data_line {
                first_data_line = false;
                if auto_detect_header && Self::is_header_line(line) {
                    header = Some(line.split(',').map(|f| f.trim().to_string()).collect());
                    continue;
                }
            }

            let (row, target) = Self::parse_data_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;

            match width {
                None => width = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(SVMError::ParseError(format!(
                        "Line {} has {} features, expected {}",
                        line_num + 1,
                        row.len(),
                        expected
                    )));
                }
                Some(_) => {}
            }

            values.extend(row);
            targets.push(target);
        }

        let dim = width.ok_or(SVMError::EmptyDataset)?;
        let features = Array2::from_shape_vec((targets.len(), dim), values)
            .map_err(|e| SVMError::InvalidDataset(e.to_string()))?;

        Ok(CSVDataset {
            features,
            targets: Array1::from(targets),
            header,
        })
    }

    /// Column names, if the file had a header row
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Check if a line appears to be a header
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();

        if fields.len() < 2 {
            return false;
        }

        // Most feature columns non-numeric
        let non_numeric_count = fields
            .iter()
            .take(fields.len() - 1)
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();

        non_numeric_count > fields.len() / 2
    }

    /// Parse a CSV data line into feature values and the target
    fn parse_data_line(line: &str) -> Result<(Vec<f64>, f64)> {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();

        let Some((target_str, feature_strs)) = fields.split_last().filter(|(_, f)| !f.is_empty())
        else {
            return Err(SVMError::ParseError(format!(
                "Line has too few fields: {line}"
            )));
        };

        let target = target_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid target: {target_str}")))?;

        let row = feature_strs
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                field.parse::<f64>().map_err(|_| {
                    SVMError::ParseError(format!(
                        "Invalid feature value at column {}: {}",
                        idx + 1,
                        field
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok((row, target))
    }
}

impl Dataset for CSVDataset {
    fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    fn targets(&self) -> ArrayView1<'_, f64> {
        self.targets.view()
    }
}
