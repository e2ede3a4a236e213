use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// Default location of the raw CSV consumed by the data-processing stage.
pub const DEFAULT_RAW_DATA_PATH: &str = "artifacts/raw/data.csv";
/// Default directory the processed train/validation artifacts are written to.
pub const DEFAULT_PROCESSED_DIR: &str = "artifacts/processed";
/// Default directory of the on-disk model registry.
pub const DEFAULT_MODEL_DIR: &str = "artifacts/models";

/// Top-level pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_data_path: PathBuf,
    pub processed_dir: PathBuf,
    pub model_dir: PathBuf,
    pub log_level: String,
    pub processing: ProcessingConfig,
    pub training: TrainingConfig,
}

impl PipelineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let raw_data_path: PathBuf = env::var("PIPELINE_RAW_DATA_PATH")
            .unwrap_or_else(|_| DEFAULT_RAW_DATA_PATH.to_string())
            .into();
        let processed_dir: PathBuf = env::var("PIPELINE_PROCESSED_DIR")
            .unwrap_or_else(|_| DEFAULT_PROCESSED_DIR.to_string())
            .into();
        let model_dir: PathBuf = env::var("PIPELINE_MODEL_DIR")
            .unwrap_or_else(|_| DEFAULT_MODEL_DIR.to_string())
            .into();
        let log_level = env::var("PIPELINE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut processing = ProcessingConfig {
            processed_dir: processed_dir.clone(),
            ..ProcessingConfig::default()
        };
        if let Ok(column) = env::var("PIPELINE_TARGET_COLUMN") {
            processing.target_column = Some(column);
        }
        if let Ok(split) = env::var("PIPELINE_VALIDATION_SPLIT") {
            processing.validation_split = parse_validation_split(&split)?;
        }

        let training = TrainingConfig {
            processed_dir: processed_dir.clone(),
            model_dir: model_dir.clone(),
            ..TrainingConfig::default()
        };

        Ok(Self {
            raw_data_path,
            processed_dir,
            model_dir,
            log_level,
            processing,
            training,
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data_path: DEFAULT_RAW_DATA_PATH.into(),
            processed_dir: DEFAULT_PROCESSED_DIR.into(),
            model_dir: DEFAULT_MODEL_DIR.into(),
            log_level: "info".to_string(),
            processing: ProcessingConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

/// Parse a validation split ratio, rejecting values that would leave either
/// split empty.
fn parse_validation_split(raw: &str) -> Result<f64> {
    let split: f64 = raw.parse()?;
    anyhow::ensure!(
        split > 0.0 && split < 1.0,
        "validation split must be strictly between 0 and 1, got {split}"
    );
    Ok(split)
}

/// Configuration for the data-processing stage
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// Directory the processed artifacts are written to
    pub processed_dir: PathBuf,
    /// Name of the target column; `None` means the last CSV column
    pub target_column: Option<String>,
    /// Validation split ratio (0.0 to 1.0)
    pub validation_split: f64,
    /// Seed for the shuffle that precedes the split
    pub shuffle_seed: u64,
    /// Minimum usable rows required after cleaning
    pub min_rows: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            processed_dir: DEFAULT_PROCESSED_DIR.into(),
            target_column: None,
            validation_split: 0.2,
            shuffle_seed: 42,
            min_rows: 10,
        }
    }
}

/// Configuration for the model-training stage
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Directory the processed artifacts are read from
    pub processed_dir: PathBuf,
    /// Directory of the model registry
    pub model_dir: PathBuf,
    /// Minimum number of training samples required
    pub min_training_samples: usize,
    /// Minimum number of training samples before k-NN is attempted
    pub knn_min_samples: usize,
    /// Neighbor count for the k-NN regressor
    pub knn_neighbors: usize,
    /// Target model accuracy (RMSE threshold), used for reporting
    pub target_rmse_threshold: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            processed_dir: DEFAULT_PROCESSED_DIR.into(),
            model_dir: DEFAULT_MODEL_DIR.into(),
            min_training_samples: 20,
            knn_min_samples: 50,
            knn_neighbors: 5,
            target_rmse_threshold: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_raw_path_is_the_conventional_artifact_location() {
        let config = PipelineConfig::default();
        assert_eq!(config.raw_data_path, PathBuf::from("artifacts/raw/data.csv"));
    }

    #[test]
    fn validation_split_must_leave_both_splits_nonempty() {
        assert!(parse_validation_split("0.3").is_ok());
        assert!(parse_validation_split("0.0").is_err());
        assert!(parse_validation_split("1.0").is_err());
        assert!(parse_validation_split("-0.2").is_err());
        assert!(parse_validation_split("1.5").is_err());
        assert!(parse_validation_split("not-a-ratio").is_err());
    }

    #[test]
    fn stage_configs_share_the_processed_dir_by_default() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.processing.processed_dir,
            config.training.processed_dir
        );
    }
}
