use anyhow::Result;
use tracing::info;

use crate::config::PipelineConfig;
use crate::models::{ProcessingReport, TrainingReport};
use crate::services::{DataProcessingService, ModelTrainingService};

/// Outcome of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub processing: ProcessingReport,
    pub training: TrainingReport,
}

/// Run the two pipeline stages in strict sequence.
///
/// The training service is not constructed until data processing has
/// returned successfully; an error from either stage aborts the run and
/// propagates unmodified to the caller.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    let processor =
        DataProcessingService::with_config(config.raw_data_path.clone(), config.processing.clone());
    let processing = processor.run()?;

    let trainer = ModelTrainingService::with_config(config.training.clone());
    let training = trainer.run()?;

    info!(
        "Pipeline finished: best model {} (RMSE: {:.2})",
        training.best_version, training.best_rmse
    );
    Ok(PipelineReport {
        processing,
        training,
    })
}
