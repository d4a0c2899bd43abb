use crate::domain::errors::TrainError;
use crate::domain::ml::LinearParameters;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};

/// Least-squares fitting seam. The trainer owns data preparation and
/// validation; a fitter only turns a design matrix into parameters.
pub trait RegressionFitter: Send + Sync {
    /// `features` is row-major, one row per sample, all rows the same width.
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<LinearParameters, TrainError>;

    fn name(&self) -> &str;
}

/// Ordinary least squares through smartcore's QR solver
#[derive(Debug, Default, Clone, Copy)]
pub struct SmartcoreLinearFitter;

impl SmartcoreLinearFitter {
    fn numerical(context: &str, err: impl std::fmt::Display) -> TrainError {
        TrainError::NumericalFailure {
            reason: format!("{}: {}", context, err),
        }
    }
}

impl RegressionFitter for SmartcoreLinearFitter {
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<LinearParameters, TrainError> {
        let width = features.first().map(Vec::len).unwrap_or(0);
        if features.len() != targets.len() || features.iter().any(|row| row.len() != width) {
            return Err(TrainError::NumericalFailure {
                reason: "ragged design matrix".to_string(),
            });
        }

        let x = DenseMatrix::from_2d_vec(&features.to_vec())
            .map_err(|e| Self::numerical("matrix", e))?;
        let y = targets.to_vec();
        let params =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::QR);
        let model: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>> =
            LinearRegression::fit(&x, &y, params).map_err(|e| Self::numerical("solver", e))?;

        // Read the affine surface back by evaluating it at the origin and at
        // each unit vector: f(0) = intercept, f(e_j) - f(0) = coefficient j.
        let mut probes = vec![vec![0.0; width]];
        for j in 0..width {
            let mut unit = vec![0.0; width];
            unit[j] = 1.0;
            probes.push(unit);
        }
        let probe_matrix =
            DenseMatrix::from_2d_vec(&probes).map_err(|e| Self::numerical("matrix", e))?;
        let surface: Vec<f64> = model
            .predict(&probe_matrix)
            .map_err(|e| Self::numerical("predict", e))?;

        if surface.len() != width + 1 {
            return Err(TrainError::NumericalFailure {
                reason: format!("expected {} probe predictions, got {}", width + 1, surface.len()),
            });
        }
        let intercept = surface[0];
        let parameters = LinearParameters {
            intercept,
            coefficients: surface[1..].iter().map(|v| v - intercept).collect(),
        };

        if !parameters.is_finite() {
            return Err(TrainError::NumericalFailure {
                reason: "non-finite coefficients".to_string(),
            });
        }
        Ok(parameters)
    }

    fn name(&self) -> &str {
        "smartcore-ols-qr"
    }
}
