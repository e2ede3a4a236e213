use ndarray::{Array2, Axis};
use statrs::statistics::{Data, Median};

use crate::models::FeatureScaler;

/// Service for turning cleaned rows into model-ready feature matrices
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineeringService;

impl FeatureEngineeringService {
    /// Create a new FeatureEngineeringService
    pub fn new() -> Self {
        Self
    }

    /// Per-column medians over the observed (non-missing, finite) cells.
    ///
    /// Columns with no observed values fall back to 0.0 so imputation stays
    /// well-defined.
    pub fn column_medians(&self, rows: &[Vec<Option<f64>>], n_columns: usize) -> Vec<f64> {
        (0..n_columns)
            .map(|j| {
                let observed: Vec<f64> = rows
                    .iter()
                    .filter_map(|row| row[j])
                    .filter(|v| v.is_finite())
                    .collect();
                if observed.is_empty() {
                    0.0
                } else {
                    Data::new(observed).median()
                }
            })
            .collect()
    }

    /// Fill missing cells with the given column medians.
    ///
    /// Returns the dense feature matrix and the number of cells imputed.
    pub fn impute(&self, rows: &[Vec<Option<f64>>], medians: &[f64]) -> (Array2<f64>, usize) {
        let n_rows = rows.len();
        let n_columns = medians.len();
        let mut imputed_cells = 0;
        let mut values = Vec::with_capacity(n_rows * n_columns);

        for row in rows {
            for (j, cell) in row.iter().enumerate() {
                match cell {
                    Some(v) if v.is_finite() => values.push(*v),
                    _ => {
                        values.push(medians[j]);
                        imputed_cells += 1;
                    }
                }
            }
        }

        let matrix = Array2::from_shape_vec((n_rows, n_columns), values)
            .expect("row-major feature buffer matches (n_rows, n_columns)");
        (matrix, imputed_cells)
    }

    /// Fit a standard scaler (per-feature mean and standard deviation).
    ///
    /// Constant columns get a standard deviation of 1.0 so transforming them
    /// never divides by zero.
    pub fn fit_scaler(&self, features: &Array2<f64>) -> FeatureScaler {
        let means = features
            .mean_axis(Axis(0))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![0.0; features.ncols()]);
        let stds = features
            .std_axis(Axis(0), 0.0)
            .iter()
            .map(|&s| if s > f64::EPSILON { s } else { 1.0 })
            .collect();

        FeatureScaler { means, stds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn medians_ignore_missing_cells() {
        let service = FeatureEngineeringService::new();
        let rows = vec![
            vec![Some(1.0), None],
            vec![Some(3.0), Some(10.0)],
            vec![Some(2.0), Some(20.0)],
        ];
        let medians = service.column_medians(&rows, 2);
        assert_eq!(medians, vec![2.0, 15.0]);
    }

    #[test]
    fn impute_fills_missing_cells_and_counts_them() {
        let service = FeatureEngineeringService::new();
        let rows = vec![vec![Some(1.0), None], vec![None, Some(4.0)]];
        let (matrix, imputed) = service.impute(&rows, &[0.5, 2.5]);
        assert_eq!(imputed, 2);
        assert_eq!(matrix, array![[1.0, 2.5], [0.5, 4.0]]);
    }

    #[test]
    fn scaler_centers_and_rescales_each_column() {
        let service = FeatureEngineeringService::new();
        let features = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = service.fit_scaler(&features);
        assert_eq!(scaler.means, vec![3.0, 10.0]);
        // second column is constant, so its std falls back to 1.0
        assert_eq!(scaler.stds[1], 1.0);

        let scaled = scaler.transform(&features);
        assert!(scaled.column(0).sum().abs() < 1e-12);
        assert!(scaled.column(1).iter().all(|&v| v == 0.0));
    }
}
