//! Labelled numeric CSV datasets

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

/// Feature rows with binary labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    /// Load a CSV file whose header names every column. `label_column` is
    /// split off as the label; every other column becomes a feature.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let dataset = Self::from_csv_str(&text, label_column)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))?;

        info!(
            path = %path.display(),
            rows = dataset.len(),
            features = dataset.feature_names.len(),
            positives = dataset.positives(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_csv_str(text: &str, label_column: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines.next().context("Dataset is empty")?;
        let columns: Vec<String> = split_cells(header).map(str::to_string).collect();
        let label_index = columns
            .iter()
            .position(|c| c == label_column)
            .with_context(|| format!("Label column {:?} not in header", label_column))?;

        let feature_names: Vec<String> = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_index)
            .map(|(_, c)| c.clone())
            .collect();

        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (line_no, line) in lines {
            let cells: Vec<&str> = split_cells(line).collect();
            if cells.len() != columns.len() {
                bail!(
                    "line {}: expected {} columns, got {}",
                    line_no + 1,
                    columns.len(),
                    cells.len()
                );
            }

            let mut row = Vec::with_capacity(feature_names.len());
            for (i, cell) in cells.iter().enumerate() {
                let value: f64 = cell.parse().with_context(|| {
                    format!("line {}: column {:?} is not numeric: {:?}", line_no + 1, columns[i], cell)
                })?;
                if i == label_index {
                    let label = match value {
                        v if v == 0.0 => 0,
                        v if v == 1.0 => 1,
                        v => bail!("line {}: label must be 0 or 1, got {}", line_no + 1, v),
                    };
                    labels.push(label);
                } else {
                    row.push(value);
                }
            }
            rows.push(row);
        }

        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1).count()
    }

    /// Copy out the rows at `indices`.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

fn split_cells(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(|cell| cell.trim().trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\"Time\",\"V1\",\"Amount\",\"Class\"\n0,-1.35,149.62,\"0\"\n1,1.19,2.69,\"1\"\n\n2,-0.5,10.0,0\n";

    #[test]
    fn test_parse_quoted_csv() {
        let dataset = Dataset::from_csv_str(SAMPLE, "Class").unwrap();
        assert_eq!(dataset.feature_names, vec!["Time", "V1", "Amount"]);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.labels, vec![0, 1, 0]);
        assert_eq!(dataset.rows[1], vec![1.0, 1.19, 2.69]);
        assert_eq!(dataset.positives(), 1);
    }

    #[test]
    fn test_missing_label_column() {
        let err = Dataset::from_csv_str(SAMPLE, "Fraud").unwrap_err();
        assert!(err.to_string().contains("Fraud"));
    }

    #[test]
    fn test_rejects_bad_rows() {
        assert!(Dataset::from_csv_str("a,Class\n1,2\n", "Class").is_err());
        assert!(Dataset::from_csv_str("a,Class\n1\n", "Class").is_err());
        assert!(Dataset::from_csv_str("a,Class\nx,1\n", "Class").is_err());
        assert!(Dataset::from_csv_str("", "Class").is_err());
    }

    #[test]
    fn test_subset() {
        let dataset = Dataset::from_csv_str(SAMPLE, "Class").unwrap();
        let subset = dataset.subset(&[2, 1]);
        assert_eq!(subset.labels, vec![0, 1]);
        assert_eq!(subset.rows[0][2], 10.0);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(Dataset::from_csv_path(&path, "Class").unwrap().len(), 3);
        assert!(Dataset::from_csv_path(dir.path().join("missing.csv"), "Class").is_err());
    }
}
