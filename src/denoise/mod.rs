//! Optional smoothing of aggregated latency curves.
//!
//! Denoising suppresses single-point noise before change-point or capacity
//! analysis without moving the structural transition being searched for.
//! The output always has the input's x column; only y changes, and the
//! result is a pure function of the curve and configuration.

mod knn;
mod savgol;

pub use knn::knn_regression;
pub use savgol::savitzky_golay;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DENOISE_WINDOW, LOCAL_POLYNOMIAL_DEGREE};
use crate::error::{ProbeError, Result};
use crate::types::Curve;

/// Smoothing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenoiseMethod {
    /// Pass the curve through unchanged.
    #[default]
    None,
    /// Cubic Savitzky-Golay smoothing over an odd sliding window.
    LocalPolynomial,
    /// Uniform k-nearest-neighbour regression with `window` neighbours.
    KnnRegression,
}

impl DenoiseMethod {
    /// Short label for reports and plot legends.
    pub fn label(self) -> &'static str {
        match self {
            DenoiseMethod::None => "raw",
            DenoiseMethod::LocalPolynomial => "Savitzky-Golay",
            DenoiseMethod::KnnRegression => "k-nearest neighbours",
        }
    }
}

/// Smoothing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenoiseConfig {
    /// Algorithm.
    pub method: DenoiseMethod,
    /// Window length (local polynomial) or neighbour count (knn).
    pub window: usize,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl DenoiseConfig {
    /// Pass-through.
    pub fn none() -> Self {
        Self {
            method: DenoiseMethod::None,
            window: DEFAULT_DENOISE_WINDOW,
        }
    }

    /// Savitzky-Golay with the given odd window.
    pub fn local_polynomial(window: usize) -> Self {
        Self {
            method: DenoiseMethod::LocalPolynomial,
            window,
        }
    }

    /// k-nearest-neighbour regression with `neighbours` neighbours.
    pub fn knn(neighbours: usize) -> Self {
        Self {
            method: DenoiseMethod::KnnRegression,
            window: neighbours,
        }
    }

    /// Whether the configuration changes the curve at all.
    pub fn is_enabled(&self) -> bool {
        self.method != DenoiseMethod::None
    }

    /// Check the window against the method, independent of any curve.
    pub fn validate(&self) -> Result<()> {
        match self.method {
            DenoiseMethod::None => Ok(()),
            DenoiseMethod::LocalPolynomial => {
                if self.window % 2 == 1 && self.window > LOCAL_POLYNOMIAL_DEGREE {
                    Ok(())
                } else {
                    Err(ProbeError::invalid_config(format!(
                        "local polynomial window must be odd and at least {}, got {}",
                        LOCAL_POLYNOMIAL_DEGREE + 2,
                        self.window
                    )))
                }
            }
            DenoiseMethod::KnnRegression => {
                if self.window >= 1 {
                    Ok(())
                } else {
                    Err(ProbeError::invalid_config("knn needs at least one neighbour"))
                }
            }
        }
    }

    /// Smooth `curve`, returning a curve with the same x column.
    ///
    /// Fails with a configuration error when the curve is shorter than the
    /// window.
    pub fn apply(&self, curve: &Curve) -> Result<Curve> {
        self.validate()?;
        let y = match self.method {
            DenoiseMethod::None => return Ok(curve.clone()),
            DenoiseMethod::LocalPolynomial => savitzky_golay(curve.y(), self.window)?,
            DenoiseMethod::KnnRegression => knn_regression(curve.x(), curve.y(), self.window)?,
        };
        Ok(curve.with_y(y))
    }
}
