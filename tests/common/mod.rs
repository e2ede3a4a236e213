use std::fs;
use std::path::{Path, PathBuf};

use training_pipeline::config::{PipelineConfig, ProcessingConfig, TrainingConfig};

/// Write a synthetic dataset following `y = 3*x1 - 2*x2 + 5` exactly.
///
/// The second feature is decorrelated from the first through a fixed
/// pseudo-random pattern, so ordinary least squares stays well-posed.
pub fn write_linear_csv(path: &Path, rows: usize) {
    let mut lines = vec!["x1,x2,y".to_string()];
    for i in 0..rows {
        let x1 = i as f64 * 0.5;
        let x2 = ((i * 7919) % 13) as f64;
        let y = 3.0 * x1 - 2.0 * x2 + 5.0;
        lines.push(format!("{},{},{}", x1, x2, y));
    }
    fs::write(path, lines.join("\n")).unwrap();
}

/// A pipeline configuration rooted entirely inside `root`, with thresholds
/// sized for small test datasets.
pub fn test_config(root: &Path, raw_file: &str) -> PipelineConfig {
    let raw_data_path: PathBuf = root.join(raw_file);
    let processed_dir = root.join("processed");
    let model_dir = root.join("models");

    PipelineConfig {
        raw_data_path,
        processed_dir: processed_dir.clone(),
        model_dir: model_dir.clone(),
        log_level: "info".to_string(),
        processing: ProcessingConfig {
            processed_dir: processed_dir.clone(),
            min_rows: 5,
            ..ProcessingConfig::default()
        },
        training: TrainingConfig {
            processed_dir,
            model_dir,
            min_training_samples: 5,
            ..TrainingConfig::default()
        },
    }
}
