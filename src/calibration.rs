//! # Zenith Calibration
//!
//! A tag's light threshold corresponds to some solar zenith angle, smeared by
//! shading, weather and sensor noise. Calibration recovers that distribution
//! from twilights recorded at a known site; the fitted distribution then
//! scores candidate positions for twilights recorded elsewhere.
//!
//! ## Model
//! - **Sample**: zenith angle at the calibration site for every twilight
//! - **Density**: Gaussian kernel estimate over the sample, bandwidth by
//!   Silverman's rule of thumb `0.9 · min(sd, IQR/1.34) · n^(-1/5)`
//! - **Score**: sum of log-densities of the zeniths a candidate location
//!   implies for the same twilights

use crate::solar::solar_geometry;
use crate::{Location, TwilightEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest kernel bandwidth in degrees.
///
/// Keeps the density usable when every calibration zenith is identical.
const MIN_BANDWIDTH: f64 = 0.1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// A spread cannot be estimated from fewer than two twilights
    #[error("calibration needs at least 2 twilights, got {count}")]
    TooFewTwilights { count: usize },

    /// Coordinates outside [-180, 180] x [-90, 90] or non-finite
    #[error("invalid location: longitude {longitude}, latitude {latitude}")]
    InvalidLocation { longitude: f64, latitude: f64 },
}

/// Zenith-angle distribution fitted at a known site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZenithCalibration {
    /// Calibration site
    pub site: Location,
    /// Whether zeniths include the atmospheric refraction correction
    pub refraction: bool,
    /// Zenith angle (degrees) at the site for each calibration twilight
    pub zeniths: Vec<f64>,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub sd: f64,
    /// Gaussian kernel bandwidth in degrees
    pub bandwidth: f64,
}

impl ZenithCalibration {
    /// Fit the zenith distribution of `twilights` observed at `site`.
    pub fn fit(
        twilights: &[TwilightEvent],
        site: Location,
        refraction: bool,
    ) -> Result<Self, CalibrationError> {
        check_location(site)?;
        if twilights.len() < 2 {
            return Err(CalibrationError::TooFewTwilights {
                count: twilights.len(),
            });
        }

        let zeniths = zeniths_at(twilights, site, refraction);
        let (mean, sd) = mean_sd(&zeniths);
        let bandwidth = silverman_bandwidth(&zeniths, sd);

        log::debug!(
            "calibrated {} twilights at ({:.3}, {:.3}): mean {:.2}°, sd {:.2}°, bw {:.3}°",
            zeniths.len(),
            site.longitude,
            site.latitude,
            mean,
            sd,
            bandwidth
        );

        Ok(ZenithCalibration {
            site,
            refraction,
            zeniths,
            mean,
            sd,
            bandwidth,
        })
    }

    /// Kernel density of the calibration sample at `zenith`.
    pub fn density(&self, zenith: f64) -> f64 {
        let n = self.zeniths.len() as f64;
        let h = self.bandwidth;
        let sum: f64 = self
            .zeniths
            .iter()
            .map(|&z| {
                let u = (zenith - z) / h;
                (-0.5 * u * u).exp()
            })
            .sum();
        sum / (n * h * (2.0 * std::f64::consts::PI).sqrt())
    }

    /// Log-likelihood that `twilights` were observed at `candidate`.
    ///
    /// Densities are floored at `f64::MIN_POSITIVE`, so the result is always
    /// finite (very negative for implausible locations).
    pub fn log_likelihood(
        &self,
        twilights: &[TwilightEvent],
        candidate: Location,
    ) -> Result<f64, CalibrationError> {
        check_location(candidate)?;
        Ok(zeniths_at(twilights, candidate, self.refraction)
            .into_iter()
            .map(|z| self.density(z).max(f64::MIN_POSITIVE).ln())
            .sum())
    }

    /// [`log_likelihood`](Self::log_likelihood) for each candidate, in order.
    pub fn likelihood_grid(
        &self,
        twilights: &[TwilightEvent],
        candidates: &[Location],
    ) -> Result<Vec<f64>, CalibrationError> {
        candidates
            .iter()
            .map(|&candidate| self.log_likelihood(twilights, candidate))
            .collect()
    }
}

fn check_location(location: Location) -> Result<(), CalibrationError> {
    if location.is_valid() {
        Ok(())
    } else {
        Err(CalibrationError::InvalidLocation {
            longitude: location.longitude,
            latitude: location.latitude,
        })
    }
}

fn zeniths_at(twilights: &[TwilightEvent], location: Location, refraction: bool) -> Vec<f64> {
    twilights
        .iter()
        .map(|t| solar_geometry(t.instant, location.longitude, location.latitude, refraction))
        .collect()
}

/// Mean and sample standard deviation. Expects at least two values.
fn mean_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// Linear-interpolation quantile of an ascending slice (`p` in `[0, 1]`).
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

fn silverman_bandwidth(values: &[f64], sd: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);

    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    let bandwidth = 0.9 * spread * (values.len() as f64).powf(-0.2);
    bandwidth.max(MIN_BANDWIDTH)
}
