use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Raw dataset not found at {0}")]
    RawDataMissing(PathBuf),
    #[error("Raw dataset at {0} has no data rows")]
    EmptyDataset(PathBuf),
    #[error("Raw dataset needs at least two columns (features + target), found {0}")]
    TooFewColumns(usize),
    #[error("Target column '{0}' not found in dataset header")]
    MissingTargetColumn(String),
    #[error("Row {row} has {got} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("Insufficient training data: {got} usable rows (need {need})")]
    InsufficientSamples { got: usize, need: usize },
    #[error("Validation split is empty: {rows} usable rows at ratio {ratio}")]
    EmptyValidationSplit { rows: usize, ratio: f64 },
    #[error("Processed artifacts not found in {0} (run data processing first)")]
    ProcessedArtifactsMissing(PathBuf),
    #[error("Processed schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("No model was successfully trained")]
    NoModelTrained,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
