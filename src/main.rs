use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use training_pipeline::config::PipelineConfig;
use training_pipeline::pipeline;

fn main() -> Result<()> {
    let config = PipelineConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let report = pipeline::run(&config)?;
    info!(
        "Done: {} train rows processed, model {} promoted (RMSE: {:.2})",
        report.processing.train_rows, report.training.best_version, report.training.best_rmse
    );

    Ok(())
}
