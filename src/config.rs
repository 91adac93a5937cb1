//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! geolight-config.toml file. It holds the twilight search parameters and the
//! calibration site used by the command-line tool.

use crate::twilight::{SearchOptions, TwilightError};
use crate::Location;
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "geolight-config.toml";

/// Application configuration loaded from geolight-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Twilight search parameters
    pub search: SearchConfig,
    /// Known site used to calibrate the zenith distribution
    pub calibration: CalibrationConfig,
}

/// Twilight search configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Light intensity separating day from night
    pub threshold: f64,
    /// Tolerance in minutes when probing ±24 h from a kept night
    #[serde(default)]
    pub extend_minutes: i64,
    /// Minimum night span in minutes
    #[serde(default)]
    pub dark_min_minutes: i64,
}

/// Calibration site configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CalibrationConfig {
    /// Degrees east
    pub longitude: f64,
    /// Degrees north
    pub latitude: f64,
    /// Apply the atmospheric refraction correction to zenith angles
    #[serde(default = "default_refraction")]
    pub refraction: bool,
}

fn default_refraction() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            search: SearchConfig {
                threshold: 1.5,
                extend_minutes: 0,
                dark_min_minutes: 0,
            },
            calibration: CalibrationConfig {
                // Swiss Ornithological Institute, Sempach
                longitude: 8.1,
                latitude: 47.1,
                refraction: true,
            },
        }
    }
}

impl SearchConfig {
    /// Build search options for the given anchor and exclusion instants.
    ///
    /// Fails when a minute count cannot be represented as a duration.
    pub fn options(
        &self,
        include: Vec<DateTime<Utc>>,
        exclude: Vec<DateTime<Utc>>,
    ) -> Result<SearchOptions, TwilightError> {
        Ok(SearchOptions::new(self.threshold, include)
            .with_exclude(exclude)
            .with_extend(minutes("extend", self.extend_minutes)?)
            .with_dark_min(minutes("dark_min", self.dark_min_minutes)?))
    }
}

fn minutes(name: &'static str, minutes: i64) -> Result<Duration, TwilightError> {
    Duration::try_minutes(minutes).ok_or(TwilightError::DurationOutOfRange { name, minutes })
}

impl CalibrationConfig {
    pub fn site(&self) -> Location {
        Location::new(self.longitude, self.latitude)
    }
}

impl Config {
    /// Load configuration from geolight-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        "Loaded configuration from {} (threshold {})",
                        path.display(),
                        config.search.threshold
                    );
                    config
                }
                Err(e) => {
                    warn!("Invalid config file format in {}: {}", path.display(), e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "No config file found at {}, using default configuration",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path as pretty TOML
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}
