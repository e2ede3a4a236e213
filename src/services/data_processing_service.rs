use anyhow::Result;
use chrono::Utc;
use csv::ReaderBuilder;
use ndarray::{Array1, Array2, Axis};
use ndarray_stats::QuantileExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::ProcessingConfig;
use crate::error::PipelineError;
use crate::models::{
    DataQualityReport, FeatureScaler, ProcessedSchema, ProcessingReport, RawDataset,
};
use crate::services::FeatureEngineeringService;

/// File name of the processed train split inside the processed directory.
pub const TRAIN_FILE: &str = "train.csv";
/// File name of the processed validation split.
pub const VALIDATION_FILE: &str = "validation.csv";
/// File name of the processed schema.
pub const SCHEMA_FILE: &str = "schema.json";

/// Data preparation stage: load the raw CSV, assess quality, clean and
/// impute, split, scale, and persist the processed artifacts.
pub struct DataProcessingService {
    raw_path: PathBuf,
    config: ProcessingConfig,
    feature_service: FeatureEngineeringService,
}

impl DataProcessingService {
    /// Create a service bound to a raw CSV path, with default processing
    /// settings.
    pub fn new(raw_path: impl Into<PathBuf>) -> Self {
        Self::with_config(raw_path, ProcessingConfig::default())
    }

    /// Create a service with explicit processing settings.
    pub fn with_config(raw_path: impl Into<PathBuf>, config: ProcessingConfig) -> Self {
        Self {
            raw_path: raw_path.into(),
            config,
            feature_service: FeatureEngineeringService::new(),
        }
    }

    /// Execute the whole stage and write the processed artifacts.
    pub fn run(&self) -> Result<ProcessingReport> {
        info!("Starting data processing for {}", self.raw_path.display());

        let raw = self.load_raw()?;
        let target_index = self.resolve_target_index(&raw)?;
        let target_column = raw.headers[target_index].clone();
        let feature_names: Vec<String> = raw
            .headers
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != target_index)
            .map(|(_, name)| name.clone())
            .collect();

        // Rows without a usable target cannot contribute to supervised
        // training and are dropped; missing feature cells are imputed below.
        let total_rows = raw.n_rows();
        let mut feature_rows: Vec<Vec<Option<f64>>> = Vec::new();
        let mut targets: Vec<f64> = Vec::new();
        for row in &raw.rows {
            match row[target_index] {
                Some(target) if target.is_finite() => {
                    let features: Vec<Option<f64>> = row
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != target_index)
                        .map(|(_, cell)| *cell)
                        .collect();
                    feature_rows.push(features);
                    targets.push(target);
                }
                _ => {}
            }
        }

        let usable_rows = feature_rows.len();
        if usable_rows < self.config.min_rows {
            return Err(PipelineError::InsufficientSamples {
                got: usable_rows,
                need: self.config.min_rows,
            }
            .into());
        }

        let medians = self
            .feature_service
            .column_medians(&feature_rows, feature_names.len());
        let (features, imputed_cells) = self.feature_service.impute(&feature_rows, &medians);
        let targets = Array1::from(targets);

        let quality = self.assess_quality(
            total_rows,
            usable_rows,
            feature_names.len(),
            imputed_cells,
            &targets,
        )?;
        info!(
            "Data quality: {}/{} usable rows, {} cells imputed, completeness {:.1}%",
            quality.usable_rows,
            quality.total_rows,
            quality.imputed_cells,
            quality.data_completeness * 100.0
        );

        let (train_idx, validation_idx) = self.split_indices(usable_rows);
        // Without validation rows the training stage would evaluate every
        // candidate on zero samples and report degenerate metrics.
        if validation_idx.is_empty() {
            return Err(PipelineError::EmptyValidationSplit {
                rows: usable_rows,
                ratio: self.config.validation_split,
            }
            .into());
        }
        let (train_features, train_targets) = select_rows(&features, &targets, &train_idx);
        let (validation_features, validation_targets) =
            select_rows(&features, &targets, &validation_idx);

        // The scaler is fit on the train split only so validation metrics
        // stay honest.
        let scaler = self.feature_service.fit_scaler(&train_features);
        let train_features = scaler.transform(&train_features);
        let validation_features = scaler.transform(&validation_features);

        self.write_artifacts(
            &feature_names,
            &target_column,
            &scaler,
            &medians,
            (&train_features, &train_targets),
            (&validation_features, &validation_targets),
        )?;

        info!(
            "Data processing complete: {} train rows, {} validation rows written to {}",
            train_idx.len(),
            validation_idx.len(),
            self.config.processed_dir.display()
        );

        Ok(ProcessingReport {
            quality,
            feature_count: feature_names.len(),
            train_rows: train_idx.len(),
            validation_rows: validation_idx.len(),
            processed_dir: self.config.processed_dir.clone(),
        })
    }

    /// Load the raw CSV into an optional-cell table.
    fn load_raw(&self) -> Result<RawDataset> {
        if !self.raw_path.exists() {
            return Err(PipelineError::RawDataMissing(self.raw_path.clone()).into());
        }

        // Flexible mode so width mismatches surface as typed RaggedRow
        // errors instead of opaque csv parse failures.
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.raw_path)
            .map_err(PipelineError::Csv)?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(PipelineError::Csv)?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.len() < 2 {
            return Err(PipelineError::TooFewColumns(headers.len()).into());
        }

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(PipelineError::Csv)?;
            if record.len() != headers.len() {
                return Err(PipelineError::RaggedRow {
                    row: i + 1,
                    got: record.len(),
                    expected: headers.len(),
                }
                .into());
            }
            let cells: Vec<Option<f64>> = record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        None
                    } else {
                        cell.parse::<f64>().ok()
                    }
                })
                .collect();
            rows.push(cells);
        }

        if rows.is_empty() {
            return Err(PipelineError::EmptyDataset(self.raw_path.clone()).into());
        }

        Ok(RawDataset { headers, rows })
    }

    fn resolve_target_index(&self, raw: &RawDataset) -> Result<usize> {
        match &self.config.target_column {
            Some(name) => raw
                .headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::MissingTargetColumn(name.clone()).into()),
            None => Ok(raw.n_columns() - 1),
        }
    }

    fn assess_quality(
        &self,
        total_rows: usize,
        usable_rows: usize,
        n_features: usize,
        imputed_cells: usize,
        targets: &Array1<f64>,
    ) -> Result<DataQualityReport> {
        let feature_cells = usable_rows * n_features;
        let data_completeness = if feature_cells > 0 {
            1.0 - imputed_cells as f64 / feature_cells as f64
        } else {
            0.0
        };
        let target_min = *targets.min().map_err(anyhow::Error::from)?;
        let target_max = *targets.max().map_err(anyhow::Error::from)?;

        Ok(DataQualityReport {
            total_rows,
            usable_rows,
            dropped_rows: total_rows - usable_rows,
            imputed_cells,
            data_completeness,
            target_min,
            target_max,
            is_sufficient: usable_rows >= self.config.min_rows && data_completeness >= 0.7,
        })
    }

    /// Seeded shuffle split into (train, validation) row indices.
    ///
    /// The validation split is rounded from the configured ratio but always
    /// leaves at least one train row.
    fn split_indices(&self, n_rows: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(self.config.shuffle_seed);
        indices.shuffle(&mut rng);

        let validation_rows = ((n_rows as f64) * self.config.validation_split).round() as usize;
        let validation_rows = validation_rows.min(n_rows.saturating_sub(1));

        let validation_idx = indices[..validation_rows].to_vec();
        let train_idx = indices[validation_rows..].to_vec();
        (train_idx, validation_idx)
    }

    fn write_artifacts(
        &self,
        feature_names: &[String],
        target_column: &str,
        scaler: &FeatureScaler,
        medians: &[f64],
        train: (&Array2<f64>, &Array1<f64>),
        validation: (&Array2<f64>, &Array1<f64>),
    ) -> Result<()> {
        let dir = &self.config.processed_dir;
        fs::create_dir_all(dir)?;

        let schema = ProcessedSchema {
            feature_names: feature_names.to_vec(),
            target_column: target_column.to_string(),
            scaler: scaler.clone(),
            imputation_medians: medians.to_vec(),
            train_rows: train.0.nrows(),
            validation_rows: validation.0.nrows(),
            created_at: Utc::now(),
        };

        write_split_csv(dir, TRAIN_FILE, feature_names, target_column, train)?;
        write_split_csv(dir, VALIDATION_FILE, feature_names, target_column, validation)?;
        write_atomic(dir, &dir.join(SCHEMA_FILE), &serde_json::to_vec_pretty(&schema)?)?;

        Ok(())
    }
}

/// Gather the given rows of a feature matrix and target vector.
fn select_rows(
    features: &Array2<f64>,
    targets: &Array1<f64>,
    indices: &[usize],
) -> (Array2<f64>, Array1<f64>) {
    let selected_features = features.select(Axis(0), indices);
    let selected_targets = indices.iter().map(|&i| targets[i]).collect();
    (selected_features, Array1::from_vec(selected_targets))
}

fn write_split_csv(
    dir: &Path,
    file_name: &str,
    feature_names: &[String],
    target_column: &str,
    (features, targets): (&Array2<f64>, &Array1<f64>),
) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(&mut tmp);

        let mut header: Vec<&str> = feature_names.iter().map(String::as_str).collect();
        header.push(target_column);
        writer.write_record(&header)?;

        for (row, target) in features.rows().into_iter().zip(targets.iter()) {
            let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            record.push(target.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    tmp.persist(dir.join(file_name))?;
    Ok(())
}

/// Write through a temp file in the same directory and persist atomically, so
/// the training stage never observes a half-written artifact.
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path)?;
    Ok(())
}
