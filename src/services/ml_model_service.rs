use anyhow::Result;
use chrono::Utc;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::Array1;

use crate::models::{DatasetSplit, ModelMetrics, TrainedModel};

/// Service wrapping the actual estimators and their evaluation
#[derive(Debug, Clone, Default)]
pub struct MLModelService;

impl MLModelService {
    /// Create a new MLModelService
    pub fn new() -> Self {
        Self
    }

    /// Fit an ordinary-least-squares linear regression on the train split
    /// and evaluate it on the validation split.
    pub fn train_linear_regression(
        &self,
        train: &DatasetSplit,
        validation: &DatasetSplit,
    ) -> Result<(TrainedModel, ModelMetrics)> {
        let dataset = Dataset::new(train.features.clone(), train.targets.clone());
        let fitted = LinearRegression::default().fit(&dataset)?;

        let model = TrainedModel::Linear {
            intercept: fitted.intercept(),
            coefficients: fitted.params().to_vec(),
        };
        let metrics = self.evaluate(&model, validation);
        Ok((model, metrics))
    }

    /// Build a k-nearest-neighbors regressor from the train split and
    /// evaluate it on the validation split.
    ///
    /// The model is memory-based; it keeps the scaled train rows and answers
    /// queries with the mean target of the k closest ones.
    pub fn train_knn(
        &self,
        k: usize,
        train: &DatasetSplit,
        validation: &DatasetSplit,
    ) -> Result<(TrainedModel, ModelMetrics)> {
        let features: Vec<Vec<f64>> = train
            .features
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect();
        let model = TrainedModel::Knn {
            k,
            features,
            targets: train.targets.to_vec(),
        };
        let metrics = self.evaluate(&model, validation);
        Ok((model, metrics))
    }

    /// Compute RMSE, MAE, and R² of a model on the validation split.
    ///
    /// The model version is assigned later, when the registry registers the
    /// model.
    pub fn evaluate(&self, model: &TrainedModel, validation: &DatasetSplit) -> ModelMetrics {
        let predictions = model.predict(&validation.features);
        let targets = &validation.targets;

        ModelMetrics {
            model_version: String::new(),
            model_type: model.model_type(),
            rmse: rmse(&predictions, targets),
            mae: mae(&predictions, targets),
            r_squared: r_squared(&predictions, targets),
            sample_count: validation.n_samples(),
            evaluated_at: Utc::now(),
        }
    }
}

fn rmse(predictions: &Array1<f64>, targets: &Array1<f64>) -> f64 {
    let mse = (predictions - targets).mapv(|e| e * e).mean().unwrap_or(0.0);
    mse.sqrt()
}

fn mae(predictions: &Array1<f64>, targets: &Array1<f64>) -> f64 {
    (predictions - targets).mapv(f64::abs).mean().unwrap_or(0.0)
}

fn r_squared(predictions: &Array1<f64>, targets: &Array1<f64>) -> f64 {
    let mean = targets.mean().unwrap_or(0.0);
    let ss_res = (predictions - targets).mapv(|e| e * e).sum();
    let ss_tot = targets.mapv(|t| (t - mean) * (t - mean)).sum();
    if ss_tot > f64::EPSILON {
        1.0 - ss_res / ss_tot
    } else if ss_res < f64::EPSILON {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn split(features: ndarray::Array2<f64>, targets: Array1<f64>) -> DatasetSplit {
        DatasetSplit { features, targets }
    }

    #[test]
    fn linear_regression_recovers_an_exact_linear_relation() {
        let service = MLModelService::new();
        let train = split(
            array![[0.0], [1.0], [2.0], [3.0], [4.0]],
            array![1.0, 3.0, 5.0, 7.0, 9.0],
        );
        let validation = split(array![[5.0], [6.0]], array![11.0, 13.0]);

        let (model, metrics) = service
            .train_linear_regression(&train, &validation)
            .expect("fit should succeed on well-posed data");

        assert!(metrics.rmse < 1e-6, "rmse was {}", metrics.rmse);
        assert!(metrics.r_squared > 0.999);
        match model {
            TrainedModel::Linear {
                intercept,
                coefficients,
            } => {
                assert!((intercept - 1.0).abs() < 1e-6);
                assert!((coefficients[0] - 2.0).abs() < 1e-6);
            }
            _ => panic!("expected a linear model"),
        }
    }

    #[test]
    fn metrics_are_perfect_for_identical_predictions() {
        let predictions = array![1.0, 2.0, 3.0];
        let targets = array![1.0, 2.0, 3.0];
        assert_eq!(rmse(&predictions, &targets), 0.0);
        assert_eq!(mae(&predictions, &targets), 0.0);
        assert_eq!(r_squared(&predictions, &targets), 1.0);
    }

    #[test]
    fn r_squared_penalizes_a_bad_fit() {
        let predictions = array![10.0, 10.0, 10.0];
        let targets = array![1.0, 2.0, 3.0];
        assert!(r_squared(&predictions, &targets) < 0.0);
    }

    #[test]
    fn knn_evaluation_reports_sample_count() {
        let service = MLModelService::new();
        let train = split(array![[0.0], [1.0], [2.0]], array![0.0, 1.0, 2.0]);
        let validation = split(array![[1.5]], array![1.5]);
        let (_, metrics) = service.train_knn(2, &train, &validation).unwrap();
        assert_eq!(metrics.sample_count, 1);
    }
}
