use anyhow::{Context, Result};
use csv::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;

use crate::models::CorrelationResult;

pub struct CsvStorage;

impl CsvStorage {
    /// Writes correlation sweep rows in the order given.
    ///
    /// Format: symbol,price_horizon_hours,sentiment_window_hours,lag_hours,
    /// pearson_r,pearson_p,spearman_r,spearman_p,n_observations
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_correlations(path: &Path, rows: &[CorrelationResult]) -> Result<()> {
        if rows.is_empty() {
            // serde only emits the header alongside the first record.
            let mut writer = Self::create_writer(path)?;
            writer.write_record(CorrelationResult::COLUMNS)?;
            writer.flush()?;
            return Ok(());
        }
        Self::write_rows(path, rows)
    }

    /// Reads correlation sweep rows. Undefined statistics come back as NaN.
    ///
    /// # Errors
    /// Returns error if the file is missing or a row fails to parse
    pub fn read_correlations(path: &Path) -> Result<Vec<CorrelationResult>> {
        Self::read_rows(path)
    }

    /// Writes any serde-serializable rows with a header derived from field names.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
        let mut writer = Self::create_writer(path)?;

        for row in rows {
            writer.serialize(row)?;
        }

        writer.flush()?;
        Ok(())
    }

    fn create_writer(path: &Path) -> Result<Writer<File>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        Ok(Writer::from_writer(file))
    }

    /// # Errors
    /// Returns error if the file is missing or a row fails to parse
    pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let mut reader = Reader::from_reader(file);

        reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .with_context(|| format!("Malformed CSV file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(symbol: &str, lag: usize, r: f64, p: f64) -> CorrelationResult {
        CorrelationResult {
            symbol: symbol.to_string(),
            price_horizon_hours: 4,
            sentiment_window_hours: 6,
            lag_hours: lag,
            pearson_r: r,
            pearson_p: p,
            spearman_r: r,
            spearman_p: p,
            n_observations: 120,
        }
    }

    #[test]
    fn correlations_keep_order_and_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results/correlation_results.csv");
        let rows = vec![row("BTC", 0, 0.2, 0.01), row("ETH", 2, -0.1, 0.3)];

        CsvStorage::write_correlations(&path, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "symbol,price_horizon_hours,sentiment_window_hours,lag_hours,pearson_r,pearson_p,spearman_r,spearman_p,n_observations"
        ));
        assert_eq!(CsvStorage::read_correlations(&path).unwrap(), rows);
    }

    #[test]
    fn undefined_statistics_read_back_as_nan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nan.csv");

        CsvStorage::write_correlations(&path, &[row("BTC", 1, f64::NAN, f64::NAN)]).unwrap();
        let loaded = CsvStorage::read_correlations(&path).unwrap();

        assert!(loaded[0].pearson_r.is_nan());
        assert!(loaded[0].spearman_p.is_nan());
    }

    #[test]
    fn empty_correlation_table_still_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("top_significant.csv");

        CsvStorage::write_correlations(&path, &[]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), CorrelationResult::COLUMNS.join(","));
        assert!(CsvStorage::read_correlations(&path).unwrap().is_empty());
    }

    #[test]
    fn columns_match_serialized_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("one.csv");
        CsvStorage::write_correlations(&path, &[row("BTC", 0, 0.1, 0.2)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), CorrelationResult::COLUMNS.join(","));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(CsvStorage::read_correlations(&dir.path().join("absent.csv")).is_err());
    }
}
