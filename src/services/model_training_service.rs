use anyhow::Result;
use csv::ReaderBuilder;
use ndarray::{Array1, Array2};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::TrainingConfig;
use crate::error::PipelineError;
use crate::models::{DatasetSplit, ModelMetrics, ProcessedSchema, TrainedModel, TrainingReport};
use crate::services::data_processing_service::{SCHEMA_FILE, TRAIN_FILE, VALIDATION_FILE};
use crate::services::{MLModelService, ModelVersioningService};

/// Model training stage: load the processed artifacts, train candidate
/// models, select the best one by validation RMSE, and persist it through
/// the model registry.
pub struct ModelTrainingService {
    config: TrainingConfig,
    ml_service: MLModelService,
    registry: ModelVersioningService,
}

impl ModelTrainingService {
    /// Create a service with default training settings.
    pub fn new() -> Self {
        Self::with_config(TrainingConfig::default())
    }

    /// Create a service with explicit training settings.
    pub fn with_config(config: TrainingConfig) -> Self {
        let registry = ModelVersioningService::new(&config.model_dir);
        Self {
            config,
            ml_service: MLModelService::new(),
            registry,
        }
    }

    /// Execute the whole stage and register the trained models.
    pub fn run(&self) -> Result<TrainingReport> {
        info!(
            "Starting model training from {}",
            self.config.processed_dir.display()
        );

        let (schema, train, validation) = self.load_processed()?;
        if train.n_samples() < self.config.min_training_samples {
            return Err(PipelineError::InsufficientSamples {
                got: train.n_samples(),
                need: self.config.min_training_samples,
            }
            .into());
        }
        info!(
            "Loaded {} train and {} validation samples over {} features",
            train.n_samples(),
            validation.n_samples(),
            schema.feature_names.len()
        );

        // A candidate failing to train is tolerated as long as one succeeds.
        let mut candidates: Vec<(TrainedModel, ModelMetrics)> = Vec::new();

        match self.ml_service.train_linear_regression(&train, &validation) {
            Ok((model, metrics)) => {
                info!(
                    "Linear regression model trained. RMSE: {:.2}, MAE: {:.2}, R²: {:.3}",
                    metrics.rmse, metrics.mae, metrics.r_squared
                );
                candidates.push((model, metrics));
            }
            Err(e) => {
                error!("Failed to train linear regression model: {}", e);
            }
        }

        if train.n_samples() >= self.config.knn_min_samples {
            match self
                .ml_service
                .train_knn(self.config.knn_neighbors, &train, &validation)
            {
                Ok((model, metrics)) => {
                    info!(
                        "k-NN model trained (k={}). RMSE: {:.2}, MAE: {:.2}, R²: {:.3}",
                        self.config.knn_neighbors, metrics.rmse, metrics.mae, metrics.r_squared
                    );
                    candidates.push((model, metrics));
                }
                Err(e) => {
                    error!("Failed to train k-NN model: {}", e);
                }
            }
        } else {
            warn!(
                "Skipping k-NN training - insufficient data ({} samples, need {}+)",
                train.n_samples(),
                self.config.knn_min_samples
            );
        }

        if candidates.is_empty() {
            return Err(PipelineError::NoModelTrained.into());
        }

        let best_index = candidates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.1.rmse
                    .partial_cmp(&b.1.rmse)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let mut candidate_metrics = Vec::new();
        let mut best_record = None;
        for (i, (model, metrics)) in candidates.iter().enumerate() {
            let record = self.registry.register_version(model, metrics.clone())?;
            candidate_metrics.push(record.metrics.clone());
            if i == best_index {
                best_record = Some(record);
            }
        }

        let best_record = best_record.expect("best candidate index is in range");
        let promoted = self.registry.promote(&best_record)?;

        if promoted.metrics.rmse > self.config.target_rmse_threshold {
            warn!(
                "Best model misses the RMSE target ({:.2} > {:.2})",
                promoted.metrics.rmse, self.config.target_rmse_threshold
            );
        }
        info!(
            "Best model: {} (RMSE: {:.2})",
            promoted.version, promoted.metrics.rmse
        );

        Ok(TrainingReport {
            candidate_metrics,
            best_version: promoted.version,
            best_rmse: promoted.metrics.rmse,
        })
    }

    /// Load the schema and both splits, verifying they agree.
    fn load_processed(&self) -> Result<(ProcessedSchema, DatasetSplit, DatasetSplit)> {
        let dir = &self.config.processed_dir;
        let schema_path = dir.join(SCHEMA_FILE);
        if !schema_path.exists() {
            return Err(PipelineError::ProcessedArtifactsMissing(dir.clone()).into());
        }

        let schema: ProcessedSchema = serde_json::from_slice(&fs::read(schema_path)?)?;
        let train = load_split_csv(&dir.join(TRAIN_FILE), &schema)?;
        let validation = load_split_csv(&dir.join(VALIDATION_FILE), &schema)?;

        if train.n_samples() != schema.train_rows {
            return Err(PipelineError::SchemaMismatch(format!(
                "train split has {} rows, schema says {}",
                train.n_samples(),
                schema.train_rows
            ))
            .into());
        }
        if validation.n_samples() == 0 {
            return Err(PipelineError::SchemaMismatch(
                "validation split has no rows, metrics cannot be computed".to_string(),
            )
            .into());
        }
        if validation.n_samples() != schema.validation_rows {
            return Err(PipelineError::SchemaMismatch(format!(
                "validation split has {} rows, schema says {}",
                validation.n_samples(),
                schema.validation_rows
            ))
            .into());
        }

        Ok((schema, train, validation))
    }
}

impl Default for ModelTrainingService {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a processed split CSV (features columns then the target column)
/// into a dense dataset.
fn load_split_csv(path: &Path, schema: &ProcessedSchema) -> Result<DatasetSplit> {
    let n_features = schema.feature_names.len();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(PipelineError::Csv)?;

    let headers = reader.headers().map_err(PipelineError::Csv)?;
    if headers.len() != n_features + 1 {
        return Err(PipelineError::SchemaMismatch(format!(
            "{} has {} columns, schema expects {}",
            path.display(),
            headers.len(),
            n_features + 1
        ))
        .into());
    }

    let mut feature_values = Vec::new();
    let mut targets = Vec::new();
    for record in reader.records() {
        let record = record.map_err(PipelineError::Csv)?;
        for cell in record.iter().take(n_features) {
            feature_values.push(cell.parse::<f64>().map_err(|e| {
                PipelineError::SchemaMismatch(format!(
                    "non-numeric cell '{}' in {}: {}",
                    cell,
                    path.display(),
                    e
                ))
            })?);
        }
        let target_cell = &record[n_features];
        targets.push(target_cell.parse::<f64>().map_err(|e| {
            PipelineError::SchemaMismatch(format!(
                "non-numeric target '{}' in {}: {}",
                target_cell,
                path.display(),
                e
            ))
        })?);
    }

    let features = Array2::from_shape_vec((targets.len(), n_features), feature_values)
        .map_err(|e| PipelineError::SchemaMismatch(e.to_string()))?;

    Ok(DatasetSplit {
        features,
        targets: Array1::from(targets),
    })
}
