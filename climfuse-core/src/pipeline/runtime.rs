use crate::aggregation::{annual_mean, drop_incomplete_trailing_year, IncompleteYear};
use crate::baseline::{baseline_in_celsius, observational_baseline, projection_baseline};
use crate::config::FusionConfig;
use crate::cube::AnomalyCube;
use crate::errors::FusionResult;
use crate::normalize::{normalize, NormalizedCube};
use crate::reference_grid::ReferenceGrid;
use crate::source::{CubeWriter, ObservationalSource, ProjectionCatalog, SourceKey};
use crate::spatial::{Field, LatLonGrid};
use crate::timeseries::{Climatology, MonthlySeries, SeriesSemantics};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::context::ModelContext;
use super::validation::{require_historical, verify_observational_inputs, verify_scenario_grid};

/// Diagnostics of a completed run
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Trailing observational year excluded for having fewer than 12 months
    pub dropped_year: Option<IncompleteYear>,
    /// Scenario sources that do not exist; their cells hold the sentinel
    pub skipped: Vec<SourceKey>,
    /// Number of `(model, scenario, year)` slots written, per model
    pub written: BTreeMap<String, usize>,
    pub baselines_written: usize,
}

impl RunReport {
    pub fn written_cells(&self) -> usize {
        self.written.values().sum()
    }
}

/// Result of [`FusionPipeline::run`]
#[derive(Debug)]
pub struct FusionOutput {
    pub cube: AnomalyCube,
    pub report: RunReport,
}

impl FusionOutput {
    pub fn normalize(&self) -> NormalizedCube {
        normalize(&self.cube)
    }
}

/// One field produced for the cube
#[derive(Debug)]
enum CubeField {
    Baseline(Field),
    Anomaly {
        scenario: String,
        year: i32,
        field: Field,
    },
}

/// The fields of one projection model, held only while its batch is in flight
#[derive(Debug)]
struct ModelFields {
    model: String,
    fields: Vec<CubeField>,
    skipped: Vec<SourceKey>,
}

/// Write one field as soon as it is produced and record it in `report`
fn write_field(
    cube: &mut AnomalyCube,
    report: &mut RunReport,
    model: &str,
    field: CubeField,
) -> FusionResult<()> {
    match field {
        CubeField::Baseline(baseline) => {
            cube.write_baseline(model, &baseline)?;
            report.baselines_written += 1;
            report.written.entry(model.to_string()).or_insert(0);
        }
        CubeField::Anomaly {
            scenario,
            year,
            field,
        } => {
            cube.write_anomaly(model, &scenario, year, &field)?;
            *report.written.entry(model.to_string()).or_insert(0) += 1;
        }
    }
    Ok(())
}

/// A configured fusion run
///
/// Created with [`super::FusionBuilder`]. A pipeline holds no data; each call to
/// [`FusionPipeline::run`] reads its inputs afresh and returns a new cube.
#[derive(Debug)]
pub struct FusionPipeline {
    config: FusionConfig,
}

impl FusionPipeline {
    pub(crate) fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Build the anomaly cube from `observations` and `catalog`
    ///
    /// Missing scenario sources leave their cells at the sentinel. Any other failure,
    /// including a scenario source that exists but cannot be read, aborts the run.
    pub fn run(
        &self,
        observations: &dyn ObservationalSource,
        catalog: &dyn ProjectionCatalog,
    ) -> FusionResult<FusionOutput> {
        let config = &self.config;

        let obs_series = observations.series()?;
        let climatology = observations.climatology()?;
        verify_observational_inputs(&obs_series, &climatology)?;

        let grid_key = SourceKey::new(&config.grid_model, &config.historical_scenario);
        let grid_historical = require_historical(&grid_key, catalog.open(&grid_key)?)?;
        let reference = ReferenceGrid::resolve(obs_series.grid(), grid_historical.grid())?;
        let target = reference.grid();

        let mut cube = AnomalyCube::new(config.axes(), Arc::clone(target), config.sentinel);
        let mut report = RunReport::default();

        let series = reference.crop_series(&obs_series)?;
        let (series, dropped_year) = drop_incomplete_trailing_year(&series)?;
        report.dropped_year = dropped_year;
        let climatology = reference.crop_climatology(&climatology)?;
        self.observational_fields(&series, &climatology, &mut |field: CubeField| {
            write_field(&mut cube, &mut report, &config.observational_model, field)
        })?;

        let models: Vec<&str> = config.projection_models().collect();
        if config.parallel {
            // One model per worker at a time; each batch is written before the next starts
            for batch in models.chunks(rayon::current_num_threads().max(1)) {
                let outputs = batch
                    .par_iter()
                    .map(|model| -> FusionResult<ModelFields> {
                        let mut fields = Vec::new();
                        let skipped = self.projection_fields(
                            model,
                            catalog,
                            &grid_historical,
                            target,
                            &mut |field: CubeField| {
                                fields.push(field);
                                Ok(())
                            },
                        )?;
                        Ok(ModelFields {
                            model: model.to_string(),
                            fields,
                            skipped,
                        })
                    })
                    .collect::<FusionResult<Vec<_>>>()?;
                for output in outputs {
                    for field in output.fields {
                        write_field(&mut cube, &mut report, &output.model, field)?;
                    }
                    report.skipped.extend(output.skipped);
                }
            }
        } else {
            for model in models {
                let skipped = self.projection_fields(
                    model,
                    catalog,
                    &grid_historical,
                    target,
                    &mut |field: CubeField| write_field(&mut cube, &mut report, model, field),
                )?;
                report.skipped.extend(skipped);
            }
        }

        info!(
            "Fusion complete: {} cells written across {} models, {} sources skipped",
            report.written_cells(),
            report.baselines_written,
            report.skipped.len()
        );
        Ok(FusionOutput { cube, report })
    }

    /// Run, normalise and hand the cube to `writer`
    ///
    /// The writer is only called once the whole run has succeeded.
    pub fn run_to_writer(
        &self,
        observations: &dyn ObservationalSource,
        catalog: &dyn ProjectionCatalog,
        writer: &mut dyn CubeWriter,
    ) -> FusionResult<RunReport> {
        let output = self.run(observations, catalog)?;
        writer.write(&output.normalize())?;
        Ok(output.report)
    }

    /// Observational baseline and annual means on the reference grid
    ///
    /// Products that ship anomalies are written as-is; absolute products have their own
    /// climatology subtracted first.
    fn observational_fields(
        &self,
        series: &MonthlySeries,
        climatology: &Climatology,
        sink: &mut dyn FnMut(CubeField) -> FusionResult<()>,
    ) -> FusionResult<()> {
        let config = &self.config;
        let native_baseline = observational_baseline(climatology)?;
        let baseline = baseline_in_celsius(native_baseline, climatology.unit());

        let mut years = 0;
        for year in config.year_start..=config.year_end {
            let Some(mean) = annual_mean(series, year) else {
                continue;
            };
            let anomaly = match series.semantics() {
                SeriesSemantics::Anomaly => mean,
                SeriesSemantics::Absolute => mean
                    .offset(series.unit().celsius_offset())
                    .subtract(&baseline)?,
            };
            sink(CubeField::Anomaly {
                scenario: config.historical_scenario.clone(),
                year,
                field: anomaly,
            })?;
            years += 1;
        }
        debug!("{}: {} observational years", config.observational_model, years);

        sink(CubeField::Baseline(baseline))
    }

    /// Baseline and anomalies of one projection model, handed to `sink` as they are made
    ///
    /// Returns the scenario sources that do not exist.
    fn projection_fields(
        &self,
        model: &str,
        catalog: &dyn ProjectionCatalog,
        grid_historical: &MonthlySeries,
        target: &Arc<LatLonGrid>,
        sink: &mut dyn FnMut(CubeField) -> FusionResult<()>,
    ) -> FusionResult<Vec<SourceKey>> {
        let config = &self.config;
        let regridder = config.regridder.as_ref();

        let loaded;
        let historical = if model == config.grid_model {
            grid_historical
        } else {
            let key = SourceKey::new(model, &config.historical_scenario);
            loaded = require_historical(&key, catalog.open(&key)?)?;
            &loaded
        };
        let native_baseline = projection_baseline(model, historical, &config.baseline_period())?;
        let context = ModelContext::new(native_baseline, regridder, target, historical.unit())?;
        sink(CubeField::Baseline(baseline_in_celsius(
            context.regridded_baseline.clone(),
            context.unit,
        )))?;

        let mut written = 0;
        if config.include_projection_historical {
            for year in config.year_start..=config.year_end {
                if let Some(mean) = annual_mean(historical, year) {
                    sink(CubeField::Anomaly {
                        scenario: config.historical_scenario.clone(),
                        year,
                        field: context.anomaly(&mean, historical.unit(), regridder, target)?,
                    })?;
                    written += 1;
                }
            }
        }

        let mut skipped = Vec::new();
        for scenario in config.projection_scenarios() {
            let key = SourceKey::new(model, scenario);
            let Some(series) = catalog.open(&key)? else {
                info!("{} not found, leaving its cells empty", key);
                skipped.push(key);
                continue;
            };
            verify_scenario_grid(&key, &context.native_grid, &series)?;

            for year in config.projection_start..=config.year_end {
                if let Some(mean) = annual_mean(&series, year) {
                    sink(CubeField::Anomaly {
                        scenario: scenario.to_string(),
                        year,
                        field: context.anomaly(&mean, series.unit(), regridder, target)?,
                    })?;
                    written += 1;
                }
            }
        }
        debug!("{}: {} anomaly fields", model, written);

        Ok(skipped)
    }
}
