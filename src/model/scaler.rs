//! Column-wise z-score standardization.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Serialized scaler parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerJson {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

struct ScalerParams {
    mean: Array1<f64>,
    std: Array1<f64>,
}

/// Standardizes feature columns to zero mean and unit variance.
///
/// Statistics are population statistics (divide by N). Zero-variance columns
/// transform to exactly 0 rather than NaN or infinity.
#[derive(Default)]
pub struct StandardScaler {
    params: Option<ScalerParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { params: None }
    }

    /// Whether `fit` has completed.
    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Compute per-column mean and population standard deviation.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ModelError::InvalidInput(
                "scaler input matrix is empty".into(),
            ));
        }
        let n = x.nrows() as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let mut var = Array1::<f64>::zeros(x.ncols());
        for row in x.rows() {
            for (j, &v) in row.iter().enumerate() {
                let d = v - mean[j];
                var[j] += d * d;
            }
        }
        var /= n;
        let std = var.mapv(f64::sqrt);
        self.params = Some(ScalerParams { mean, std });
        Ok(())
    }

    /// Transform rows to `(x - mean) / std`; zero-std columns map to 0.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        if x.ncols() != params.mean.len() {
            return Err(ModelError::InvalidInput(format!(
                "expected {} columns, got {}",
                params.mean.len(),
                x.ncols()
            )));
        }
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                let std = params.std[j];
                *v = if std > 0.0 { (*v - params.mean[j]) / std } else { 0.0 };
            }
        }
        Ok(out)
    }

    /// `fit` followed by `transform` on the same matrix.
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Export fitted parameters as plain JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        let json = ScalerJson {
            mean: params.mean.to_vec(),
            std: params.std.to_vec(),
        };
        serde_json::to_value(json)
            .map_err(|e| ModelError::InvalidInput(format!("serialize scaler: {e}")))
    }

    /// Restore a fitted scaler from `to_json` output.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let json: ScalerJson = serde_json::from_value(value.clone())
            .map_err(|e| ModelError::InvalidInput(format!("malformed scaler JSON: {e}")))?;
        if json.mean.is_empty() || json.mean.len() != json.std.len() {
            return Err(ModelError::InvalidInput(
                "scaler JSON mean/std length mismatch".into(),
            ));
        }
        Ok(Self {
            params: Some(ScalerParams {
                mean: Array1::from_vec(json.mean),
                std: Array1::from_vec(json.std),
            }),
        })
    }
}
