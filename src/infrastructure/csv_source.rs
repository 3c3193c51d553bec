use crate::domain::ports::SeriesSource;
use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use tracing::debug;

/// Reads a single numeric column from a headed CSV file.
pub struct CsvSeriesSource {
    path: PathBuf,
    column: String,
}

impl CsvSeriesSource {
    pub fn new(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            column: column.into(),
        }
    }
}

impl SeriesSource for CsvSeriesSource {
    fn load_series(&self) -> Result<Vec<f64>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open series file {:?}", self.path))?;

        let column_index = rdr
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .position(|h| h == self.column)
            .ok_or_else(|| anyhow!("Column '{}' not found in {:?}", self.column, self.path))?;

        let mut values = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read CSV row {}", row + 1))?;
            let cell = record.get(column_index).unwrap_or("");
            if cell.is_empty() {
                continue;
            }
            let value = cell
                .parse::<f64>()
                .with_context(|| format!("Invalid value '{}' in CSV row {}", cell, row + 1))?;
            values.push(value);
        }

        debug!("Read {} values from {:?}", values.len(), self.path);
        Ok(values)
    }

    fn describe(&self) -> String {
        format!("{}#{}", self.path.display(), self.column)
    }
}
