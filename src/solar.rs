//! Low-precision solar position (NOAA solar calculator approximation)
//!
//! Accuracy: roughly ±0.01° in declination and a few seconds in the equation
//! of time for dates within a few centuries of J2000.
//! References: NOAA ESRL "General Solar Position Calculations" and
//! Meeus, *Astronomical Algorithms* (2nd ed.), ch. 25.
//!
//! All intermediate angles are kept in degrees and converted to radians only
//! at the point of a trigonometric call.

use crate::Location;
use chrono::{DateTime, Utc};

/// Julian day of the Unix epoch (1970-01-01T00:00:00Z).
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian day of J2000.0 (2000-01-01T12:00:00 TT).
const J2000_JD: f64 = 2_451_545.0;

/// Days per Julian century.
const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Apparent solar position components for one instant.
///
/// Only the sine and cosine of the declination are kept; downstream code
/// never needs the angle itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarState {
    /// Solar time in degrees (180° at local solar noon on the prime meridian).
    pub solar_time: f64,
    /// Equation of time in minutes.
    pub equation_of_time: f64,
    /// Sine of the solar declination.
    pub sin_declination: f64,
    /// Cosine of the solar declination.
    pub cos_declination: f64,
}

#[inline]
fn sin_deg(x: f64) -> f64 {
    x.to_radians().sin()
}

#[inline]
fn cos_deg(x: f64) -> f64 {
    x.to_radians().cos()
}

#[inline]
fn tan_deg(x: f64) -> f64 {
    x.to_radians().tan()
}

/// Julian day (UT) for an instant, keeping sub-second precision.
pub fn julian_day(instant: DateTime<Utc>) -> f64 {
    let seconds = instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86_400.0 + UNIX_EPOCH_JD
}

/// Compute the apparent solar state at `instant`.
///
/// Deterministic and unconstrained: any instant chrono can represent is
/// accepted.
pub fn solar_state(instant: DateTime<Utc>) -> SolarState {
    let jd = julian_day(instant);
    let jc = (jd - J2000_JD) / DAYS_PER_CENTURY;

    // ---------- 1. Mean orbital elements ----------------------------------
    let mean_longitude = (280.46646 + jc * (36_000.76983 + 0.000_303_2 * jc)).rem_euclid(360.0);
    let mean_anomaly = 357.52911 + jc * (35_999.05029 - 0.000_153_7 * jc);
    let eccentricity = 0.016_708_634 - jc * (0.000_042_037 + 0.000_000_126_7 * jc);

    // ---------- 2. Equation of centre → true & apparent longitude ---------
    let equation_of_center = sin_deg(mean_anomaly) * (1.914602 - jc * (0.004817 + 0.000014 * jc))
        + sin_deg(2.0 * mean_anomaly) * (0.019993 - 0.000101 * jc)
        + sin_deg(3.0 * mean_anomaly) * 0.000289;
    let true_longitude = mean_longitude + equation_of_center;

    // Longitude of the Moon's ascending node drives the nutation terms.
    let omega = 125.04 - 1934.136 * jc;
    let apparent_longitude = true_longitude - 0.00569 - 0.00478 * sin_deg(omega);

    // ---------- 3. Obliquity of the ecliptic -------------------------------
    let seconds = 21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813));
    let mean_obliquity = 23.0 + (26.0 + seconds / 60.0) / 60.0;
    let obliquity = mean_obliquity + 0.00256 * cos_deg(omega);

    // ---------- 4. Equation of time (minutes) -----------------------------
    let y = tan_deg(obliquity / 2.0).powi(2);
    let equation_of_time = 4.0
        * (y * sin_deg(2.0 * mean_longitude)
            - 2.0 * eccentricity * sin_deg(mean_anomaly)
            + 4.0 * eccentricity * y * sin_deg(mean_anomaly) * cos_deg(2.0 * mean_longitude)
            - 0.5 * y * y * sin_deg(4.0 * mean_longitude)
            - 1.25 * eccentricity * eccentricity * sin_deg(2.0 * mean_anomaly))
            .to_degrees();

    // ---------- 5. Declination --------------------------------------------
    let sin_declination = sin_deg(obliquity) * sin_deg(apparent_longitude);
    let cos_declination = (1.0 - sin_declination * sin_declination).max(0.0).sqrt();

    // Minutes since UT midnight, shifted by the equation of time, in degrees.
    let minutes_of_day = (jd - 0.5).rem_euclid(1.0) * 1440.0;
    let solar_time = (minutes_of_day + equation_of_time) / 4.0;

    SolarState {
        solar_time,
        equation_of_time,
        sin_declination,
        cos_declination,
    }
}

/// Solar zenith angle in degrees (`[0, 180]`) seen from `longitude`/`latitude`.
pub fn zenith_angle(state: &SolarState, longitude: f64, latitude: f64) -> f64 {
    let hour_angle = state.solar_time + longitude - 180.0;
    let cos_zenith = sin_deg(latitude) * state.sin_declination
        + cos_deg(latitude) * state.cos_declination * cos_deg(hour_angle);

    // Rounding can push the cosine just past ±1 near the poles.
    cos_zenith.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Correct a geometric zenith angle for atmospheric refraction.
///
/// Empirical piecewise fit over apparent elevation `e = 90 - zenith`; the
/// correction is computed in arcseconds.
pub fn apply_refraction(zenith: f64) -> f64 {
    let elevation = 90.0 - zenith;
    let te = tan_deg(elevation);

    let correction = if elevation > 85.0 {
        0.0
    } else if elevation > 5.0 {
        58.1 / te - 0.07 / te.powi(3) + 0.000_086 / te.powi(5)
    } else if elevation > -0.575 {
        1735.0
            + elevation * (-518.2 + elevation * (103.4 + elevation * (-12.79 + elevation * 0.711)))
    } else {
        -20.772 / te
    };

    zenith - correction / 3600.0
}

/// Zenith angle of the Sun at `instant` for a site, optionally refracted.
pub fn solar_geometry(instant: DateTime<Utc>, longitude: f64, latitude: f64, refraction: bool) -> f64 {
    let state = solar_state(instant);
    let zenith = zenith_angle(&state, longitude, latitude);
    if refraction {
        apply_refraction(zenith)
    } else {
        zenith
    }
}

/// Geometric solar elevation (degrees above the horizon) at a location.
pub fn solar_elevation(instant: DateTime<Utc>, location: Location) -> f64 {
    90.0 - solar_geometry(instant, location.longitude, location.latitude, false)
}
