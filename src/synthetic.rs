//! # Synthetic Light Record
//!
//! Generates the light record an ideal geolocator would log at a fixed
//! location. Useful as a demo input and as ground truth when checking the
//! twilight search against solar geometry.
//!
//! ## Sensor Model
//! Real tags saturate in daylight and bottom out well before astronomical
//! night, so intensity is a clamped linear ramp of solar elevation:
//! - **Dark**: elevation ≤ -6° (civil twilight) reads `0`
//! - **Saturated**: elevation ≥ +3° reads [`MAX_INTENSITY`]
//! - **Ramp**: linear in between
//!
//! ### Limitations
//! - ❌ **No shading or weather**: every twilight is clean
//! - ❌ **No sensor noise or clock drift**

use crate::solar::solar_elevation;
use crate::{LightSample, LightSeries, Location};
use chrono::{DateTime, Duration, Utc};

/// Saturation level of the simulated sensor.
pub const MAX_INTENSITY: f64 = 64.0;

/// Solar elevation (degrees) at which the sensor reads zero.
pub const DARK_ELEVATION: f64 = -6.0;

/// Solar elevation (degrees) at which the sensor saturates.
pub const SATURATION_ELEVATION: f64 = 3.0;

/// Sensor reading for a given solar elevation.
pub fn intensity_for_elevation(elevation: f64) -> f64 {
    let fraction = (elevation - DARK_ELEVATION) / (SATURATION_ELEVATION - DARK_ELEVATION);
    MAX_INTENSITY * fraction.clamp(0.0, 1.0)
}

/// Solar elevation at which the sensor reads `intensity` (inverse ramp).
pub fn elevation_for_intensity(intensity: f64) -> f64 {
    DARK_ELEVATION + (intensity / MAX_INTENSITY) * (SATURATION_ELEVATION - DARK_ELEVATION)
}

/// Light record at `location` from `start`, one sample every `step`, covering
/// `days` full days (both ends included).
///
/// A non-positive `step` yields a single sample at `start`.
pub fn light_series(location: Location, start: DateTime<Utc>, days: u32, step: Duration) -> LightSeries {
    let end = start
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let capacity = match (end - start).num_milliseconds().checked_div(step.num_milliseconds()) {
        Some(steps) if steps > 0 => steps as usize + 1,
        _ => 1,
    };

    let mut samples = Vec::with_capacity(capacity);
    let mut time = start;
    loop {
        samples.push(LightSample {
            time,
            intensity: intensity_for_elevation(solar_elevation(time, location)),
        });
        if step <= Duration::zero() {
            break;
        }
        match time.checked_add_signed(step) {
            Some(next) if next <= end => time = next,
            _ => break,
        }
    }

    LightSeries { samples }
}
