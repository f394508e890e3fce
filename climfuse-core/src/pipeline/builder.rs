//! Pipeline builder for configuring a fusion run.

use crate::baseline::BaselinePeriod;
use crate::config::FusionConfig;
use crate::errors::FusionResult;
use crate::grid_transform::Regridder;

use super::runtime::FusionPipeline;

/// Build a [`FusionPipeline`] from a configuration.
///
/// Starts from [`FusionConfig::default`]; every `with_*` method overrides one aspect of it.
/// The configuration is validated when the pipeline is built.
#[derive(Debug, Default)]
pub struct FusionBuilder {
    config: FusionConfig,
}

impl FusionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn with_config(&mut self, config: FusionConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn with_models(&mut self, models: &[&str]) -> &mut Self {
        self.config.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_scenarios(&mut self, scenarios: &[&str]) -> &mut Self {
        self.config.scenarios = scenarios.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_observational_model(&mut self, model: &str) -> &mut Self {
        self.config.observational_model = model.to_string();
        self
    }

    /// Projection model whose historical grid fixes the reference latitude band
    pub fn with_grid_model(&mut self, model: &str) -> &mut Self {
        self.config.grid_model = model.to_string();
        self
    }

    /// Output years, both inclusive
    pub fn with_years(&mut self, start: i32, end: i32) -> &mut Self {
        self.config.year_start = start;
        self.config.year_end = end;
        self
    }

    pub fn with_projection_start(&mut self, year: i32) -> &mut Self {
        self.config.projection_start = year;
        self
    }

    pub fn with_baseline_period(&mut self, period: BaselinePeriod) -> &mut Self {
        self.config.baseline_start = period.start;
        self.config.baseline_end = period.end;
        self
    }

    pub fn with_sentinel(&mut self, sentinel: f32) -> &mut Self {
        self.config.sentinel = sentinel;
        self
    }

    pub fn with_regridder(&mut self, regridder: Box<dyn Regridder>) -> &mut Self {
        self.config.regridder = regridder;
        self
    }

    pub fn with_projection_historical(&mut self, include: bool) -> &mut Self {
        self.config.include_projection_historical = include;
        self
    }

    pub fn with_parallel(&mut self, parallel: bool) -> &mut Self {
        self.config.parallel = parallel;
        self
    }

    /// Validate the configuration and create the pipeline
    ///
    /// The builder's configuration moves into the pipeline; the builder is left holding
    /// the defaults.
    pub fn build(&mut self) -> FusionResult<FusionPipeline> {
        self.config.validate()?;
        Ok(FusionPipeline::new(std::mem::take(&mut self.config)))
    }
}
