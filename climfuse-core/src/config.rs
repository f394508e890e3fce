//! Run configuration
//!
//! Every field has a default, so a configuration file only needs to name what it changes:
//!
//! ```toml
//! models = ["Berkeley-Earth", "CESM2", "MIROC6"]
//! scenarios = ["historical", "ssp245"]
//! year_end = 2050
//! baseline_start = "1961-01-01"
//! baseline_end = "1990-12-31"
//!
//! [regridder]
//! method = "Nearest"
//! periodic_longitude = false
//! ```

use crate::baseline::BaselinePeriod;
use crate::cube::{CubeAxes, DEFAULT_SENTINEL};
use crate::errors::{FusionError, FusionResult};
use crate::grid_transform::{NearestRegridder, Regridder};
use crate::timeseries::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_MODELS: [&str; 13] = [
    "Berkeley-Earth",
    "CESM2",
    "CNRM-CM6-1-HR",
    "EC-Earth3-Veg",
    "GFDL-ESM4",
    "HadGEM3-GC31-LL",
    "HadGEM3-GC31-MM",
    "KACE-1-0-G",
    "MIROC6",
    "MPI-ESM1-2-HR",
    "MRI-ESM2-0",
    "NorESM2-MM",
    "TaiESM1",
];

pub const DEFAULT_SCENARIOS: [&str; 5] = ["historical", "ssp126", "ssp245", "ssp370", "ssp585"];

/// Configuration of one fusion run
///
/// # Default Values
///
/// The defaults reproduce the published CMIP6 anomaly cube: Berkeley Earth observations
/// on their native 1° grid (cropped to CESM2's latitude range), 12 CMIP6 models, annual
/// anomalies 1850-2100 against a 1951-1980 baseline.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Model axis labels in output order; includes the observational product
    pub models: Vec<String>,

    /// Scenario axis labels in output order; includes the historical scenario
    pub scenarios: Vec<String>,

    /// The model whose data comes from the observational source.
    /// Default: "Berkeley-Earth"
    pub observational_model: String,

    /// Projection model whose historical grid fixes the reference latitude band.
    /// Default: "CESM2"
    pub grid_model: String,

    /// Default: "historical"
    pub historical_scenario: String,

    /// First year of the output.
    /// Default: 1850
    pub year_start: i32,

    /// Last year of the output (inclusive).
    /// Default: 2100
    pub year_end: i32,

    /// First year written for non-historical scenarios.
    /// Default: 2025
    pub projection_start: i32,

    /// Default: 1951-01-01
    pub baseline_start: Timestamp,

    /// Inclusive.
    /// Default: 1980-12-31
    pub baseline_end: Timestamp,

    /// Fill value of cells without data.
    /// Default: -9999.0
    pub sentinel: f32,

    /// Also write projection models' own historical anomalies.
    /// Default: false
    pub include_projection_historical: bool,

    /// Compute models on the rayon thread pool.
    /// Default: false
    pub parallel: bool,

    /// Default: nearest neighbour with periodic longitude
    pub regridder: Box<dyn Regridder>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        let period = BaselinePeriod::default();
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            scenarios: DEFAULT_SCENARIOS.iter().map(|s| s.to_string()).collect(),
            observational_model: "Berkeley-Earth".to_string(),
            grid_model: "CESM2".to_string(),
            historical_scenario: "historical".to_string(),
            year_start: 1850,
            year_end: 2100,
            projection_start: 2025,
            baseline_start: period.start,
            baseline_end: period.end,
            sentinel: DEFAULT_SENTINEL,
            include_projection_historical: false,
            parallel: false,
            regridder: Box::new(NearestRegridder::default()),
        }
    }
}

fn check_unique(axis: &str, labels: &[String]) -> FusionResult<()> {
    if labels.is_empty() {
        return Err(FusionError::InvalidConfig(format!("{} list is empty", axis)));
    }
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(FusionError::InvalidConfig(format!(
                "{} `{}` is listed more than once",
                axis, label
            )));
        }
    }
    Ok(())
}

fn check_member(what: &str, value: &str, labels: &[String]) -> FusionResult<()> {
    if labels.iter().any(|l| l == value) {
        Ok(())
    } else {
        Err(FusionError::InvalidConfig(format!(
            "{} `{}` is not in {:?}",
            what, value, labels
        )))
    }
}

impl FusionConfig {
    pub fn from_toml_str(s: &str) -> FusionResult<Self> {
        let config: FusionConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FusionResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> FusionResult<()> {
        check_unique("model", &self.models)?;
        check_unique("scenario", &self.scenarios)?;
        check_member("observational model", &self.observational_model, &self.models)?;
        check_member("grid model", &self.grid_model, &self.models)?;
        check_member(
            "historical scenario",
            &self.historical_scenario,
            &self.scenarios,
        )?;
        if self.grid_model == self.observational_model {
            return Err(FusionError::InvalidConfig(
                "grid model must be a projection model, not the observational product".to_string(),
            ));
        }
        if !(self.year_start <= self.projection_start && self.projection_start <= self.year_end) {
            return Err(FusionError::InvalidConfig(format!(
                "expected year_start <= projection_start <= year_end, got {} / {} / {}",
                self.year_start, self.projection_start, self.year_end
            )));
        }
        if self.baseline_start > self.baseline_end {
            return Err(FusionError::InvalidConfig(format!(
                "baseline starts ({}) after it ends ({})",
                self.baseline_start, self.baseline_end
            )));
        }
        if !self.sentinel.is_finite() {
            return Err(FusionError::InvalidConfig(
                "sentinel must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn baseline_period(&self) -> BaselinePeriod {
        BaselinePeriod::new(self.baseline_start, self.baseline_end)
    }

    pub fn axes(&self) -> CubeAxes {
        CubeAxes::new(
            self.models.clone(),
            self.scenarios.clone(),
            self.year_start,
            self.year_end,
        )
    }

    /// Models other than the observational product, in axis order
    pub fn projection_models(&self) -> impl Iterator<Item = &str> {
        self.models
            .iter()
            .map(String::as_str)
            .filter(move |m| *m != self.observational_model)
    }

    /// Scenarios other than the historical one, in axis order
    pub fn projection_scenarios(&self) -> impl Iterator<Item = &str> {
        self.scenarios
            .iter()
            .map(String::as_str)
            .filter(move |s| *s != self.historical_scenario)
    }
}
