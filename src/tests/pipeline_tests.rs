//! # End-to-End Scenario Tests
//!
//! These tests run whole pipelines: light record → twilights → tags →
//! calibration, on hand-built records and on synthetic records where the
//! expected solar geometry is known.

use chrono::{DateTime, Duration, TimeZone, Utc};
use geolight_lib::calibration::ZenithCalibration;
use geolight_lib::solar::{apply_refraction, solar_geometry};
use geolight_lib::synthetic::{self, elevation_for_intensity};
use geolight_lib::twilight::{find_twilights, SearchOptions};
use geolight_lib::Location;

use crate::{parse_args, run, Args, Config, LightSample, LightSeries, TwilightRequest};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 8, 1, 0, 0, 0).unwrap()
}

/// Half-hourly record built from (offset in half-hours, intensity) levels.
fn half_hourly(levels: &[f64]) -> Vec<LightSample> {
    levels
        .iter()
        .enumerate()
        .map(|(i, &intensity)| LightSample {
            time: t0() + Duration::minutes(30 * i as i64),
            intensity,
        })
        .collect()
}

fn sempach() -> Location {
    Location::new(8.1, 47.1)
}

/// Interpolated intensity of a record at an instant.
fn intensity_at(samples: &[LightSample], instant: DateTime<Utc>) -> f64 {
    let pair = samples
        .windows(2)
        .find(|w| w[0].time <= instant && instant <= w[1].time)
        .expect("instant inside record");
    let span = (pair[1].time - pair[0].time).num_milliseconds() as f64;
    let alpha = (instant - pair[0].time).num_milliseconds() as f64 / span;
    pair[0].intensity + alpha * (pair[1].intensity - pair[0].intensity)
}

/// Test the excluded-gap scenario with threshold at the smallest positive reading.
///
/// Two dark gaps would both qualify; the excluded one must vanish entirely
/// while the anchored one yields exactly one sunset and one sunrise.
#[test]
fn excluded_gap_is_silent_while_included_gap_reports_twilights() {
    let samples = half_hourly(&[
        20.0, 8.0, 0.0, 0.0, 0.0, 3.0, 20.0, // gap A: samples 2-4
        20.0, 20.0, 6.0, 0.0, 0.0, 0.0, 0.0, 2.0, 20.0, // gap B: samples 10-13
    ]);
    let threshold = samples
        .iter()
        .map(|s| s.intensity)
        .filter(|&i| i > 0.0)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(threshold, 2.0);

    let in_a = t0() + Duration::minutes(90);
    let in_b = t0() + Duration::minutes(330);
    let series = LightSeries::new(samples.clone());
    let options = SearchOptions::new(threshold, vec![in_a, in_b]).with_exclude(vec![in_b]);
    let events = find_twilights(&series, &options).unwrap();

    let flags: Vec<bool> = events.iter().map(|e| e.is_sunrise).collect();
    assert_eq!(flags, vec![false, true]);
    assert!(events.iter().all(|e| e.instant < t0() + Duration::hours(4)));

    for event in &events {
        let level = intensity_at(&samples, event.instant);
        assert!((level - threshold).abs() < 1e-3, "level {level} at {}", event.instant);
    }
}

/// Test that twilights of a synthetic record sit at the threshold's sun elevation.
#[test]
fn synthetic_twilights_match_threshold_elevation() {
    let site = Location::new(8.0, 47.0);
    let series = synthetic::light_series(site, t0(), 6, Duration::minutes(5));
    let anchor = t0() + Duration::days(3);
    let options = SearchOptions::new(32.0, vec![anchor]);

    let events = find_twilights(&series, &options).unwrap();
    // Record starts and ends in darkness: 5 complete nights.
    assert_eq!(events.len(), 10);

    let expected = 90.0 - elevation_for_intensity(32.0);
    for event in &events {
        let zenith = solar_geometry(event.instant, site.longitude, site.latitude, false);
        assert!(
            (zenith - expected).abs() < 0.01,
            "zenith {zenith} at {} (sunrise: {})",
            event.instant,
            event.is_sunrise
        );
    }
}

/// Test that a calibration scores the true site above displaced candidates.
#[test]
fn calibration_prefers_the_true_site() {
    let site = sempach();
    let series = synthetic::light_series(site, t0(), 6, Duration::minutes(5));
    let events = find_twilights(&series, &SearchOptions::new(32.0, vec![t0() + Duration::days(2)]))
        .unwrap();

    let calibration = ZenithCalibration::fit(&events, site, false).unwrap();
    assert!((calibration.mean - 91.5).abs() < 0.01);
    assert!(calibration.sd < 0.01);

    let candidates = [
        site,
        Location::new(site.longitude + 5.0, site.latitude),
        Location::new(site.longitude, site.latitude - 5.0),
    ];
    let scores = calibration.likelihood_grid(&events, &candidates).unwrap();
    assert!(scores[0] > scores[1]);
    assert!(scores[0] > scores[2]);
}

/// Test the full command pipeline on the synthetic demo request.
#[test]
fn demo_pipeline_tags_and_calibrates() {
    let config = Config::default();
    let request = crate::demo_request(&config).unwrap();
    let report = run(&request, &config).unwrap();

    assert_eq!(report.twilights.len(), 8);
    assert!(report.twilights.iter().all(|t| t.stap_id == Some(1)));

    let calibration = report.calibration.expect("calibration fitted");
    assert_eq!(calibration.zeniths.len(), 8);
    let expected = apply_refraction(90.0 - elevation_for_intensity(config.search.threshold));
    assert!(
        (calibration.mean - expected).abs() < 0.3,
        "mean {} vs {expected}",
        calibration.mean
    );
}

/// Test that an unanchored request still reports, just without calibration.
#[test]
fn empty_result_is_not_an_error() {
    let config = Config::default();
    let request = TwilightRequest {
        samples: half_hourly(&[20.0, 0.0, 0.0, 20.0]),
        include: vec![t0() + Duration::days(10)],
        exclude: vec![],
        stationary_periods: vec![],
        calibration_stap: None,
    };

    let report = run(&request, &config).unwrap();
    assert!(report.twilights.is_empty());
    assert!(report.calibration.is_none());
}

/// Test that invalid records surface as errors from the pipeline.
#[test]
fn invalid_record_fails_the_pipeline() {
    let config = Config::default();
    let mut samples = half_hourly(&[20.0, 0.0, 0.0, 20.0]);
    samples.swap(1, 2);
    let request = TwilightRequest {
        samples,
        include: vec![],
        exclude: vec![],
        stationary_periods: vec![],
        calibration_stap: None,
    };

    let err = run(&request, &config).unwrap_err();
    assert!(format!("{err:#}").contains("does not follow"));
}

/// Test that a request document parses with optional fields omitted.
#[test]
fn request_json_defaults() {
    let json = r#"{
        "samples": [
            {"time": "2021-08-01T00:00:00Z", "intensity": 20.0},
            {"time": "2021-08-01T00:30:00Z", "intensity": 0.0}
        ],
        "include": ["2021-08-01T00:15:00Z"]
    }"#;
    let request: TwilightRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.samples.len(), 2);
    assert!(request.exclude.is_empty());
    assert!(request.stationary_periods.is_empty());
    assert_eq!(request.calibration_stap, None);
}

#[test]
fn command_line_parsing() {
    let args = |list: &[&str]| parse_args(list.iter().map(|s| s.to_string()));

    assert_eq!(
        args(&["light.json"]).unwrap(),
        Args {
            request: Some("light.json".into()),
            config: None,
            demo: false,
        }
    );
    assert_eq!(
        args(&["--demo", "--config", "alt.toml"]).unwrap(),
        Args {
            request: None,
            config: Some("alt.toml".into()),
            demo: true,
        }
    );
    assert!(args(&[]).is_err());
    assert!(args(&["--config"]).is_err());
    assert!(args(&["--verbose", "x.json"]).is_err());
    assert!(args(&["a.json", "b.json"]).is_err());
}
