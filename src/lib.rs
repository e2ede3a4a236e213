//! Batch training pipeline for tabular CSV data.
//!
//! The pipeline has two stages, run in strict sequence:
//!
//! 1. [`services::DataProcessingService`] loads the raw CSV, cleans and
//!    imputes it, splits it into train/validation sets, standardizes the
//!    features, and writes the processed artifacts to disk.
//! 2. [`services::ModelTrainingService`] loads those artifacts, trains
//!    candidate regression models, selects the best one by validation RMSE,
//!    and persists it to a versioned model registry.
//!
//! [`pipeline::run`] wires the stages together; the `training-pipeline`
//! binary is a thin wrapper around it.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
