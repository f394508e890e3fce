//! Per-model state shared by every scenario of that model

use crate::errors::FusionResult;
use crate::grid_transform::Regridder;
use crate::spatial::{Field, LatLonGrid};
use crate::timeseries::TemperatureUnit;
use std::sync::Arc;

/// A projection model's baselines, built once from its historical source
///
/// Anomalies are computed on the native grid against `native_baseline` and only then
/// reprojected, so each produced field is regridded exactly once.
#[derive(Clone, Debug)]
pub struct ModelContext {
    pub native_baseline: Field,
    pub regridded_baseline: Field,
    pub native_grid: Arc<LatLonGrid>,
    /// Unit of the historical source the baseline was computed from
    pub unit: TemperatureUnit,
}

impl ModelContext {
    pub fn new(
        native_baseline: Field,
        regridder: &dyn Regridder,
        target: &Arc<LatLonGrid>,
        unit: TemperatureUnit,
    ) -> FusionResult<Self> {
        let regridded_baseline = regridder.regrid(&native_baseline, target)?;
        Ok(Self {
            native_grid: Arc::clone(native_baseline.grid()),
            native_baseline,
            regridded_baseline,
            unit,
        })
    }

    /// Anomaly of an annual mean in `unit`, reprojected onto `target`
    pub fn anomaly(
        &self,
        annual_mean: &Field,
        unit: TemperatureUnit,
        regridder: &dyn Regridder,
        target: &Arc<LatLonGrid>,
    ) -> FusionResult<Field> {
        let native = annual_mean
            .subtract(&self.native_baseline)?
            .offset(unit.celsius_offset() - self.unit.celsius_offset());
        regridder.regrid(&native, target)
    }
}
