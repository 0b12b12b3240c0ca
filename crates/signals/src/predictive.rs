//! Directional prediction from lagged sentiment.
//!
//! Trains a class-balanced, L2-regularized logistic regression that predicts
//! whether the close `H` hours ahead is above the current close, and scores it
//! with forward-chaining cross-validation so no fold trains on its future.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Range;

use cryptosent_core::{ModelConfig, PathsConfig};
use cryptosent_data::{CsvStorage, MasterTable};

use crate::validation::features::{
    future_returns, lagged, past_returns, rolling_mean, rolling_volatility,
};

/// Feature column names, in matrix column order.
pub const FEATURE_NAMES: [&str; 3] = ["lagged_sentiment", "past_return", "volatility"];

const FEATURES: usize = FEATURE_NAMES.len();

/// Feature matrix and binary targets, one row per usable hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<[f64; FEATURES]>,
    pub targets: Vec<bool>,
}

impl Dataset {
    /// Builds the dataset for one asset.
    ///
    /// Volatility needs at least two returns, so its window is `max(window, 2)`.
    /// Hours where any feature or the target is undefined are dropped.
    #[must_use]
    pub fn build(
        close: &[Option<f64>],
        sentiment: &[f64],
        horizon: usize,
        window: usize,
        lag: usize,
    ) -> Self {
        let sentiment = lagged(&rolling_mean(sentiment, window), lag);
        let momentum = past_returns(close, window);
        let volatility = rolling_volatility(close, window.max(2));
        let target = future_returns(close, horizon);

        let mut dataset = Self::default();
        for t in 0..close.len().min(sentiment.len()) {
            let (Some(s), Some(m), Some(v), Some(r)) =
                (sentiment[t], momentum[t], volatility[t], target[t])
            else {
                continue;
            };
            if [s, m, v, r].iter().all(|x| x.is_finite()) {
                dataset.features.push([s, m, v]);
                dataset.targets.push(r > 0.0);
            }
        }
        dataset
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Expanding-window splits: fold `i` trains on everything before its test
/// block. The test blocks are contiguous, equal sized and cover the tail.
#[must_use]
pub fn forward_chaining_splits(n: usize, folds: usize) -> Vec<(Range<usize>, Range<usize>)> {
    if folds == 0 {
        return Vec::new();
    }
    let test_size = n / (folds + 1);
    if test_size == 0 {
        return Vec::new();
    }
    let first_test = n - folds * test_size;
    (0..folds)
        .map(|i| {
            let start = first_test + i * test_size;
            (0..start, start..start + test_size)
        })
        .collect()
}

/// Per-feature standardization fitted on training rows only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fits mean and population standard deviation. Constant columns get a
    /// scale of 1 so they transform to zero.
    #[must_use]
    pub fn fit(rows: &[[f64; FEATURES]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; FEATURES];
        let mut scale = vec![1.0; FEATURES];

        for j in 0..FEATURES {
            mean[j] = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
            if var > 0.0 {
                scale[j] = var.sqrt();
            }
        }

        Self { mean, scale }
    }

    #[must_use]
    pub fn transform(&self, row: &[f64; FEATURES]) -> [f64; FEATURES] {
        let mut out = [0.0; FEATURES];
        for j in 0..FEATURES {
            out[j] = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }
}

/// Binary logistic regression trained by batch gradient descent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    /// Fits from zero initialization. Each class is weighted by
    /// `n / (2 * n_class)` so the minority class is not ignored; the L2
    /// penalty applies to the weights, not the bias.
    #[must_use]
    pub fn fit(x: &[[f64; FEATURES]], y: &[bool], config: &ModelConfig) -> Self {
        let mut model = Self {
            weights: vec![0.0; FEATURES],
            bias: 0.0,
        };
        if x.is_empty() {
            return model;
        }

        let n = x.len() as f64;
        let positives = y.iter().filter(|&&v| v).count() as f64;
        let negatives = n - positives;
        let class_weight = |label: bool| {
            let count = if label { positives } else { negatives };
            if count > 0.0 {
                n / (2.0 * count)
            } else {
                1.0
            }
        };

        for _ in 0..config.epochs {
            let mut grad_w = [0.0; FEATURES];
            let mut grad_b = 0.0;

            for (row, &label) in x.iter().zip(y) {
                let err = (model.probability(row) - f64::from(u8::from(label))) * class_weight(label);
                for j in 0..FEATURES {
                    grad_w[j] += err * row[j];
                }
                grad_b += err;
            }

            for j in 0..FEATURES {
                let grad = (grad_w[j] + config.l2 * model.weights[j]) / n;
                model.weights[j] -= config.learning_rate * grad;
            }
            model.bias -= config.learning_rate * grad_b / n;
        }

        model
    }

    #[must_use]
    pub fn probability(&self, row: &[f64; FEATURES]) -> f64 {
        let z = self.bias
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(w, v)| w * v)
                .sum::<f64>();
        sigmoid(z)
    }

    #[must_use]
    pub fn predict(&self, row: &[f64; FEATURES]) -> bool {
        self.probability(row) >= 0.5
    }
}

/// Classification quality on one set of predictions. Precision and recall
/// are zero when undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    #[must_use]
    pub fn compute(actual: &[bool], predicted: &[bool]) -> Self {
        if actual.is_empty() {
            return Self::default();
        }

        let (mut tp, mut fp, mut fneg, mut correct) = (0usize, 0usize, 0usize, 0usize);
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fneg += 1,
                (false, false) => {}
            }
            if a == p {
                correct += 1;
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fneg);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: ratio(correct, actual.len()),
            precision,
            recall,
            f1,
        }
    }
}

/// One cross-validation fold, as written to the prediction results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Accuracy of always predicting "up"
    pub baseline_accuracy: f64,
}

/// One-row run summary: fold-mean metrics next to the "always up" baseline
/// measured over the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub symbol: String,
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub baseline_up_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub feature: String,
    pub coefficient: f64,
}

/// Everything needed to reproduce predictions: grid point, scaler and weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub symbol: String,
    pub horizon_hours: usize,
    pub window_hours: usize,
    pub lag_hours: usize,
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub model: LogisticRegression,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub folds: Vec<FoldResult>,
    /// Fold means of every metric
    pub mean: ClassificationMetrics,
    pub mean_baseline_accuracy: f64,
    /// Share of "up" targets over every usable row
    pub baseline_up_rate: f64,
    /// Final-model coefficients, sorted descending
    pub coefficients: Vec<CoefficientRow>,
    pub artifact: ModelArtifact,
}

impl PredictionOutcome {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Accuracy: {:.3} (baseline {:.3}, fold baseline {:.3}), Precision: {:.3}, Recall: {:.3}, F1: {:.3}, Samples: {}",
            self.mean.accuracy,
            self.baseline_up_rate,
            self.mean_baseline_accuracy,
            self.mean.precision,
            self.mean.recall,
            self.mean.f1,
            self.artifact.samples
        )
    }

    #[must_use]
    pub fn summary_row(&self) -> PredictionSummary {
        PredictionSummary {
            symbol: self.artifact.symbol.clone(),
            samples: self.artifact.samples,
            accuracy: self.mean.accuracy,
            precision: self.mean.precision,
            recall: self.mean.recall,
            f1: self.mean.f1,
            baseline_up_rate: self.baseline_up_rate,
        }
    }

    /// Writes the fold metrics, run summary, coefficient table and model artifact.
    ///
    /// # Errors
    /// Returns error if any file cannot be written
    pub fn save(&self, paths: &PathsConfig) -> Result<()> {
        let symbol = &self.artifact.symbol;
        CsvStorage::write_rows(&paths.prediction_results_path(symbol), &self.folds)?;
        CsvStorage::write_rows(&paths.prediction_summary_path(symbol), &[self.summary_row()])?;
        CsvStorage::write_rows(&paths.coefficients_path(symbol), &self.coefficients)?;

        let artifact_path = paths.model_artifact_path(symbol);
        let json = serde_json::to_string_pretty(&self.artifact)?;
        fs::write(&artifact_path, json)
            .with_context(|| format!("Failed to write {}", artifact_path.display()))?;

        tracing::info!("Saved prediction outputs for {} to {}", symbol, paths.results_dir.display());
        Ok(())
    }
}

/// Grid point and training settings for one prediction run.
#[derive(Debug, Clone)]
pub struct PredictiveModel {
    pub horizon: usize,
    pub window: usize,
    pub lag: usize,
    pub config: ModelConfig,
}

impl PredictiveModel {
    #[must_use]
    pub fn new(horizon: usize, window: usize, lag: usize, config: ModelConfig) -> Self {
        Self {
            horizon,
            window,
            lag,
            config,
        }
    }

    /// Cross-validates and fits the final model for `symbol`.
    ///
    /// Returns `Ok(None)` when there are fewer usable rows than
    /// `min_samples` or too few to form the folds.
    ///
    /// # Errors
    /// Returns error if the symbol is not in the table
    pub fn evaluate(&self, table: &MasterTable, symbol: &str) -> Result<Option<PredictionOutcome>> {
        let (Some(close), Some(sentiment)) =
            (table.close_series(symbol), table.sentiment_series(symbol))
        else {
            anyhow::bail!("Symbol {} not present in master table", symbol);
        };

        let dataset = Dataset::build(&close, &sentiment, self.horizon, self.window, self.lag);
        if dataset.len() < self.config.min_samples {
            tracing::warn!(
                "Only {} usable rows for {} (need {}), skipping",
                dataset.len(),
                symbol,
                self.config.min_samples
            );
            return Ok(None);
        }

        let splits = forward_chaining_splits(dataset.len(), self.config.folds);
        if splits.is_empty() {
            tracing::warn!("Not enough rows for {} folds, skipping", self.config.folds);
            return Ok(None);
        }

        let mut folds = Vec::with_capacity(splits.len());
        for (i, (train, test)) in splits.into_iter().enumerate() {
            let result = self.run_fold(&dataset, train, test, i + 1);
            tracing::debug!("Fold {}: accuracy {:.3}", result.fold, result.accuracy);
            folds.push(result);
        }

        let k = folds.len() as f64;
        let mean = ClassificationMetrics {
            accuracy: folds.iter().map(|f| f.accuracy).sum::<f64>() / k,
            precision: folds.iter().map(|f| f.precision).sum::<f64>() / k,
            recall: folds.iter().map(|f| f.recall).sum::<f64>() / k,
            f1: folds.iter().map(|f| f.f1).sum::<f64>() / k,
        };
        let mean_baseline_accuracy = folds.iter().map(|f| f.baseline_accuracy).sum::<f64>() / k;
        let ups = dataset.targets.iter().filter(|&&up| up).count();
        let baseline_up_rate = ups as f64 / dataset.len() as f64;

        // Final model on all rows, for the coefficients and the artifact.
        let scaler = StandardScaler::fit(&dataset.features);
        let scaled: Vec<_> = dataset.features.iter().map(|r| scaler.transform(r)).collect();
        let model = LogisticRegression::fit(&scaled, &dataset.targets, &self.config);

        let mut coefficients: Vec<CoefficientRow> = FEATURE_NAMES
            .iter()
            .zip(&model.weights)
            .map(|(name, &w)| CoefficientRow {
                feature: (*name).to_string(),
                coefficient: w,
            })
            .collect();
        coefficients.sort_by(|a, b| b.coefficient.total_cmp(&a.coefficient));

        Ok(Some(PredictionOutcome {
            folds,
            mean,
            mean_baseline_accuracy,
            baseline_up_rate,
            coefficients,
            artifact: ModelArtifact {
                symbol: symbol.to_uppercase(),
                horizon_hours: self.horizon,
                window_hours: self.window,
                lag_hours: self.lag,
                feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
                scaler,
                model,
                samples: dataset.len(),
            },
        }))
    }

    fn run_fold(
        &self,
        dataset: &Dataset,
        train: Range<usize>,
        test: Range<usize>,
        fold: usize,
    ) -> FoldResult {
        let scaler = StandardScaler::fit(&dataset.features[train.clone()]);
        let train_x: Vec<_> = dataset.features[train.clone()]
            .iter()
            .map(|r| scaler.transform(r))
            .collect();
        let model = LogisticRegression::fit(&train_x, &dataset.targets[train.clone()], &self.config);

        let actual = &dataset.targets[test.clone()];
        let predicted: Vec<bool> = dataset.features[test.clone()]
            .iter()
            .map(|r| model.predict(&scaler.transform(r)))
            .collect();
        let metrics = ClassificationMetrics::compute(actual, &predicted);
        let baseline = ClassificationMetrics::compute(actual, &vec![true; actual.len()]);

        FoldResult {
            fold,
            train_size: train.len(),
            test_size: test.len(),
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1: metrics.f1,
            baseline_accuracy: baseline.accuracy,
        }
    }
}
