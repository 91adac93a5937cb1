//! # Geolight Command-Line Entry Point
//!
//! This binary crate wires the library into a small batch tool: read a light
//! record and its anchor instants as JSON, find the twilights, tag them with
//! stationary periods, fit the zenith calibration and print a JSON report.
//!
//! ```text
//! geolight <request.json> [--config geolight-config.toml]
//! geolight --demo [--config geolight-config.toml]
//! ```
//!
//! Logging goes to stderr through `env_logger` (`RUST_LOG=debug` for detail);
//! the report is the only thing written to stdout.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{env, fs};

// Re-export library types for internal use
pub use geolight_lib::{config::Config, LightSample, LightSeries, TwilightEvent};

use geolight_lib::calibration::ZenithCalibration;
use geolight_lib::stationary::{tag_stationary_periods, StationaryPeriod, TaggedTwilight};
use geolight_lib::{synthetic, twilight};

/// Input document for one tag deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilightRequest {
    /// Raw light record, strictly increasing in time
    pub samples: Vec<LightSample>,
    /// Instants inside nights known to be of interest
    pub include: Vec<DateTime<Utc>>,
    /// Instants whose nights must be dropped
    #[serde(default)]
    pub exclude: Vec<DateTime<Utc>>,
    /// Stationary periods from activity segmentation
    #[serde(default)]
    pub stationary_periods: Vec<StationaryPeriod>,
    /// Stationary period spent at the calibration site; all twilights if absent
    #[serde(default)]
    pub calibration_stap: Option<u32>,
}

/// Output document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub twilights: Vec<TaggedTwilight>,
    /// `None` when too few twilights were available to calibrate
    pub calibration: Option<ZenithCalibration>,
}

/// Command-line options.
#[derive(Debug, Default, PartialEq)]
struct Args {
    request: Option<String>,
    config: Option<String>,
    demo: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--demo" {
            parsed.demo = true;
        } else if arg == "--config" {
            parsed.config = Some(args.next().context("--config needs a path")?);
        } else if arg.starts_with("--") {
            bail!("unknown option {arg}");
        } else if parsed.request.is_none() {
            parsed.request = Some(arg);
        } else {
            bail!("unexpected argument {arg}");
        }
    }

    if !parsed.demo && parsed.request.is_none() {
        bail!("usage: geolight <request.json> [--config path] | geolight --demo");
    }
    Ok(parsed)
}

/// Run search, tagging and calibration for one request.
pub fn run(request: &TwilightRequest, config: &Config) -> anyhow::Result<Report> {
    let series = LightSeries::new(request.samples.clone());
    let options = config
        .search
        .options(request.include.clone(), request.exclude.clone())
        .context("invalid search configuration")?;

    let twilights = twilight::find_twilights(&series, &options).context("twilight search failed")?;
    info!("Found {} twilights", twilights.len());

    let tagged = tag_stationary_periods(&twilights, &request.stationary_periods)
        .context("invalid stationary periods")?;

    let calibration_set: Vec<TwilightEvent> = tagged
        .iter()
        .filter(|t| request.calibration_stap.map_or(true, |id| t.stap_id == Some(id)))
        .map(|t| t.event)
        .collect();

    let calibration = match ZenithCalibration::fit(
        &calibration_set,
        config.calibration.site(),
        config.calibration.refraction,
    ) {
        Ok(calibration) => {
            info!(
                "Zenith calibration: mean {:.2}°, sd {:.2}° over {} twilights",
                calibration.mean,
                calibration.sd,
                calibration.zeniths.len()
            );
            Some(calibration)
        }
        Err(e) => {
            warn!("Skipping calibration: {e}");
            None
        }
    };

    Ok(Report {
        twilights: tagged,
        calibration,
    })
}

/// Five days of synthetic light at the calibration site, anchored on the
/// second local solar midnight.
fn demo_request(config: &Config) -> anyhow::Result<TwilightRequest> {
    let site = config.calibration.site();
    let start = Utc
        .with_ymd_and_hms(2021, 9, 1, 0, 0, 0)
        .single()
        .context("invalid demo start date")?;
    let series = synthetic::light_series(site, start, 5, Duration::minutes(5));

    let local_midnight = start + Duration::days(2) - Duration::seconds((site.longitude * 240.0) as i64);
    Ok(TwilightRequest {
        samples: series.samples,
        include: vec![local_midnight],
        exclude: Vec::new(),
        stationary_periods: vec![StationaryPeriod {
            id: 1,
            start,
            end: start + Duration::days(5),
        }],
        calibration_stap: Some(1),
    })
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    let request = if args.demo {
        info!("Running on a synthetic light record");
        demo_request(&config)?
    } else {
        let path = args.request.as_deref().context("missing request path")?;
        let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?
    };

    let report = run(&request, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
