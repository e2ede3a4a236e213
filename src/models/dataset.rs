use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw tabular dataset as loaded from the input CSV.
///
/// Cells hold `None` where the source value was empty or failed to parse as a
/// number; cleaning and imputation decide what happens to them.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl RawDataset {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.headers.len()
    }
}

/// Per-feature standardization parameters, fit on the train split only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl FeatureScaler {
    /// Apply the scaler: `(x - mean) / std` per feature column.
    pub fn transform(&self, features: &Array2<f64>) -> Array2<f64> {
        let mut scaled = features.clone();
        for (j, mut column) in scaled.columns_mut().into_iter().enumerate() {
            let mean = self.means[j];
            let std = self.stds[j];
            column.mapv_inplace(|v| (v - mean) / std);
        }
        scaled
    }
}

/// A numeric feature/target split ready for model fitting.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub features: Array2<f64>,
    pub targets: Array1<f64>,
}

impl DatasetSplit {
    pub fn n_samples(&self) -> usize {
        self.targets.len()
    }
}

/// Schema of the processed artifacts, serialized as `schema.json` next to the
/// train and validation CSVs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedSchema {
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub scaler: FeatureScaler,
    /// Column medians used to fill missing feature cells
    pub imputation_medians: Vec<f64>,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub created_at: DateTime<Utc>,
}

/// Data quality assessment report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_rows: usize,
    pub usable_rows: usize,
    pub dropped_rows: usize,
    pub imputed_cells: usize,
    pub data_completeness: f64,
    pub target_min: f64,
    pub target_max: f64,
    pub is_sufficient: bool,
}

/// Summary returned by the data-processing stage.
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    pub quality: DataQualityReport,
    pub feature_count: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub processed_dir: PathBuf,
}
