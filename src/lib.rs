//! # Geolight Core Library
//!
//! This library turns the raw light log of a light-level geolocator tag into
//! annotated twilights, and provides the solar geometry needed to interpret
//! them as positions.
//!
//! ## Design Philosophy
//!
//! ### Pure Computation
//! - **No I/O**: nothing here touches the network or the filesystem except
//!   [`config::Config`], which reads an optional TOML file
//! - **No hidden state**: every operation is a deterministic function of its
//!   inputs, so separate deployments can be processed on separate threads
//! - **UTC only**: every instant is a `DateTime<Utc>`; callers normalize local
//!   logger clocks before building a [`LightSeries`]
//!
//! ### Data Flow
//! 1. **Detect**: [`twilight::find_twilights`] scans a [`LightSeries`] for
//!    threshold crossings, pairs them into nights and expands outward from
//!    anchor nights in ±24 h steps
//! 2. **Tag**: [`stationary::tag_stationary_periods`] attaches stationary
//!    period identifiers to each [`TwilightEvent`]
//! 3. **Calibrate**: [`calibration::ZenithCalibration`] fits the zenith
//!    angle distribution at a known site using [`solar`] geometry
//! 4. **Score**: the calibration evaluates candidate [`Location`]s
//!
//! ## Core Types
//! - [`LightSample`]: one intensity reading at an instant
//! - [`LightSeries`]: a validated-on-demand, strictly increasing record
//! - [`TwilightEvent`]: an interpolated threshold crossing, sunrise or sunset
//! - [`Location`]: longitude/latitude in degrees

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod calibration;
pub mod config;
pub mod solar;
pub mod stationary;
pub mod synthetic;
pub mod twilight;

pub use twilight::TwilightError;

/// A single light-intensity reading.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use geolight_lib::LightSample;
///
/// let sample = LightSample {
///     time: Utc.with_ymd_and_hms(2021, 8, 1, 20, 15, 0).unwrap(),
///     intensity: 12.0,
/// };
/// assert!(sample.intensity > 0.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightSample {
    /// Instant of the reading
    pub time: DateTime<Utc>,
    /// Raw sensor intensity (arbitrary units)
    pub intensity: f64,
}

/// Chronological light record of one tag deployment.
///
/// Timestamps must be strictly increasing and intensities finite. The
/// series is never reordered or cleaned; [`LightSeries::validate`] reports the
/// first problem instead.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use geolight_lib::{LightSample, LightSeries};
///
/// let t0 = Utc.with_ymd_and_hms(2021, 8, 1, 0, 0, 0).unwrap();
/// let series = LightSeries {
///     samples: (0..3)
///         .map(|i| LightSample { time: t0 + Duration::minutes(5 * i), intensity: i as f64 })
///         .collect(),
/// };
///
/// assert!(series.validate().is_ok());
/// assert_eq!(series.intensity_range(), Some((0.0, 2.0)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LightSeries {
    /// Readings in strictly increasing time order
    pub samples: Vec<LightSample>,
}

impl LightSeries {
    pub fn new(samples: Vec<LightSample>) -> Self {
        LightSeries { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check the series is usable for twilight detection.
    ///
    /// Rejects an empty series, any non-finite intensity, and any timestamp
    /// that does not strictly follow its predecessor (duplicates included).
    pub fn validate(&self) -> Result<(), TwilightError> {
        if self.samples.is_empty() {
            return Err(TwilightError::EmptySeries);
        }

        if let Some(index) = self.samples.iter().position(|s| !s.intensity.is_finite()) {
            return Err(TwilightError::NonFiniteIntensity { index });
        }

        if let Some(offset) = self.samples.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(TwilightError::NonMonotonicTime {
                index: offset + 1,
                time: self.samples[offset + 1].time,
            });
        }

        Ok(())
    }

    /// Smallest and largest intensity, or `None` for an empty series.
    pub fn intensity_range(&self) -> Option<(f64, f64)> {
        if self.samples.is_empty() {
            return None;
        }
        Some(
            self.samples
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), s| {
                    (min.min(s.intensity), max.max(s.intensity))
                }),
        )
    }
}

/// A light-threshold crossing.
///
/// Sunsets are crossings from light to dark, sunrises from dark to light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwilightEvent {
    /// Interpolated crossing instant
    pub instant: DateTime<Utc>,
    /// `true` for a dark-to-light crossing
    pub is_sunrise: bool,
}

/// A position on the Earth's surface in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees east, `[-180, 180]`
    pub longitude: f64,
    /// Degrees north, `[-90, 90]`
    pub latitude: f64,
}

impl Location {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Location {
            longitude,
            latitude,
        }
    }

    /// Whether both coordinates are finite and within geographic bounds.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}
