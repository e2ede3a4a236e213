use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

use crate::models::{ModelMetrics, ModelStatus, ModelVersionRecord, TrainedModel};

const MODEL_FILE: &str = "model.json";
const METRICS_FILE: &str = "metrics.json";
const RECORD_FILE: &str = "record.json";
const LATEST_FILE: &str = "latest.json";

/// Filesystem-backed model registry.
///
/// Each registered version lives in its own subdirectory of the model
/// directory, holding the serialized model, its metrics, and a registry
/// record; `latest.json` at the top level points at the promoted version.
pub struct ModelVersioningService {
    model_dir: PathBuf,
}

impl ModelVersioningService {
    /// Create a registry rooted at the given directory
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Register a new model version; returns its registry record.
    pub fn register_version(
        &self,
        model: &TrainedModel,
        mut metrics: ModelMetrics,
    ) -> Result<ModelVersionRecord> {
        let created_at = Utc::now();
        let short_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let version = format!(
            "v{}-{}-{}",
            created_at.format("%Y%m%d%H%M%S"),
            metrics.model_type,
            short_id
        );
        metrics.model_version = version.clone();

        let version_dir = self.model_dir.join(&version);
        fs::create_dir_all(&version_dir)?;

        let record = ModelVersionRecord {
            id: Uuid::new_v4(),
            version: version.clone(),
            model_type: metrics.model_type,
            status: ModelStatus::Trained,
            metrics,
            created_at,
        };

        write_json(&version_dir, &version_dir.join(MODEL_FILE), model)?;
        write_json(&version_dir, &version_dir.join(METRICS_FILE), &record.metrics)?;
        write_json(&version_dir, &version_dir.join(RECORD_FILE), &record)?;

        info!("Registered model version {}", version);
        Ok(record)
    }

    /// Promote a registered version to latest.
    pub fn promote(&self, record: &ModelVersionRecord) -> Result<ModelVersionRecord> {
        let mut promoted = record.clone();
        promoted.status = ModelStatus::Promoted;

        let version_dir = self.model_dir.join(&promoted.version);
        write_json(&version_dir, &version_dir.join(RECORD_FILE), &promoted)?;
        write_json(&self.model_dir, &self.model_dir.join(LATEST_FILE), &promoted)?;

        info!("Promoted model version {}", promoted.version);
        Ok(promoted)
    }

    /// The currently promoted version, if any.
    pub fn latest(&self) -> Result<Option<ModelVersionRecord>> {
        let path = self.model_dir.join(LATEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let record = serde_json::from_slice(&fs::read(path)?)?;
        Ok(Some(record))
    }

    /// All registered versions, oldest first.
    pub fn list_versions(&self) -> Result<Vec<ModelVersionRecord>> {
        let mut records = Vec::new();
        if !self.model_dir.exists() {
            return Ok(records);
        }
        for entry in fs::read_dir(&self.model_dir)? {
            let record_path = entry?.path().join(RECORD_FILE);
            if record_path.exists() {
                let record: ModelVersionRecord = serde_json::from_slice(&fs::read(record_path)?)?;
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Load the serialized model for a registered version.
    pub fn load_model(&self, version: &str) -> Result<TrainedModel> {
        let path = self.model_dir.join(version).join(MODEL_FILE);
        let model = serde_json::from_slice(&fs::read(path)?)?;
        Ok(model)
    }
}

fn write_json<T: serde::Serialize>(dir: &Path, path: &Path, value: &T) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&serde_json::to_vec_pretty(value)?)?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelType;
    use tempfile::tempdir;

    fn sample_metrics() -> ModelMetrics {
        ModelMetrics {
            model_version: String::new(),
            model_type: ModelType::LinearRegression,
            rmse: 1.5,
            mae: 1.0,
            r_squared: 0.9,
            sample_count: 10,
            evaluated_at: Utc::now(),
        }
    }

    fn sample_model() -> TrainedModel {
        TrainedModel::Linear {
            intercept: 0.5,
            coefficients: vec![1.0, -2.0],
        }
    }

    #[test]
    fn register_then_load_round_trips_the_model() {
        let dir = tempdir().unwrap();
        let registry = ModelVersioningService::new(dir.path());

        let record = registry
            .register_version(&sample_model(), sample_metrics())
            .unwrap();
        assert_eq!(record.status, ModelStatus::Trained);
        assert_eq!(record.metrics.model_version, record.version);

        let model = registry.load_model(&record.version).unwrap();
        match model {
            TrainedModel::Linear { intercept, .. } => assert_eq!(intercept, 0.5),
            _ => panic!("expected a linear model"),
        }
    }

    #[test]
    fn promote_updates_latest() {
        let dir = tempdir().unwrap();
        let registry = ModelVersioningService::new(dir.path());
        assert!(registry.latest().unwrap().is_none());

        let record = registry
            .register_version(&sample_model(), sample_metrics())
            .unwrap();
        let promoted = registry.promote(&record).unwrap();

        let latest = registry.latest().unwrap().expect("latest should exist");
        assert_eq!(latest.version, promoted.version);
        assert_eq!(latest.status, ModelStatus::Promoted);
    }

    #[test]
    fn list_versions_returns_every_registered_record() {
        let dir = tempdir().unwrap();
        let registry = ModelVersioningService::new(dir.path());

        registry
            .register_version(&sample_model(), sample_metrics())
            .unwrap();
        registry
            .register_version(&sample_model(), sample_metrics())
            .unwrap();

        let versions = registry.list_versions().unwrap();
        assert_eq!(versions.len(), 2);
    }
}
