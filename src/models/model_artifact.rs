use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of regression model produced by the training stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    LinearRegression,
    KnnRegressor,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::LinearRegression => write!(f, "linear_regression"),
            ModelType::KnnRegressor => write!(f, "knn_regressor"),
        }
    }
}

/// Evaluation metrics for a trained model, computed on the validation split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub model_version: String,
    pub model_type: ModelType,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
    pub sample_count: usize,
    pub evaluated_at: DateTime<Utc>,
}

/// A trained regression model in serializable form.
///
/// Linear models store their fitted parameters; the k-NN model is
/// memory-based and stores the (scaled) training data it predicts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    Knn {
        k: usize,
        features: Vec<Vec<f64>>,
        targets: Vec<f64>,
    },
}

impl TrainedModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            TrainedModel::Linear { .. } => ModelType::LinearRegression,
            TrainedModel::Knn { .. } => ModelType::KnnRegressor,
        }
    }

    /// Predict targets for a matrix of (already scaled) feature rows.
    pub fn predict(&self, features: &Array2<f64>) -> Array1<f64> {
        match self {
            TrainedModel::Linear {
                intercept,
                coefficients,
            } => {
                let coefficients = Array1::from(coefficients.clone());
                features.dot(&coefficients) + *intercept
            }
            TrainedModel::Knn {
                k,
                features: train_features,
                targets: train_targets,
            } => {
                let predictions: Vec<f64> = features
                    .rows()
                    .into_iter()
                    .map(|row| {
                        let mut distances: Vec<(f64, f64)> = train_features
                            .iter()
                            .zip(train_targets.iter())
                            .map(|(train_row, &target)| {
                                let dist = row
                                    .iter()
                                    .zip(train_row.iter())
                                    .map(|(a, b)| (a - b).powi(2))
                                    .sum::<f64>();
                                (dist, target)
                            })
                            .collect();
                        distances
                            .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                        let k = (*k).min(distances.len()).max(1);
                        distances.iter().take(k).map(|(_, t)| t).sum::<f64>() / k as f64
                    })
                    .collect();
                Array1::from(predictions)
            }
        }
    }
}

/// Model deployment status within the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelStatus {
    Trained,
    Promoted,
    Retired,
}

/// Registry record for one trained model version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersionRecord {
    pub id: Uuid,
    pub version: String,
    pub model_type: ModelType,
    pub status: ModelStatus,
    pub metrics: ModelMetrics,
    pub created_at: DateTime<Utc>,
}

/// Summary returned by the model-training stage.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Metrics of every candidate that trained successfully
    pub candidate_metrics: Vec<ModelMetrics>,
    /// Version string of the promoted (best) model
    pub best_version: String,
    pub best_rmse: f64,
}
