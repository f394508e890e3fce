//! The dense, sentinel-filled anomaly cube
//!
//! The cube is allocated once with its full shape, every cell set to the sentinel. Each
//! `(model, scenario, year)` slot may be written at most once; the computed mask records
//! which slots hold data so nothing downstream needs to compare floats with the sentinel.

use crate::errors::{FusionError, FusionResult};
use crate::spatial::{Field, LatLonGrid};
use ndarray::{s, Array1, Array2, Array3, Array5, ArrayView2, ArrayView3, ArrayView5, Axis};
use std::sync::Arc;

/// Fill value for cells with no computed data
pub const DEFAULT_SENTINEL: f32 = -9999.0;

/// Labels of the non-spatial cube axes
#[derive(Clone, Debug, PartialEq)]
pub struct CubeAxes {
    pub models: Vec<String>,
    pub scenarios: Vec<String>,
    /// Contiguous, ascending
    pub years: Vec<i32>,
}

impl CubeAxes {
    pub fn new(
        models: Vec<String>,
        scenarios: Vec<String>,
        year_start: i32,
        year_end: i32,
    ) -> Self {
        Self {
            models,
            scenarios,
            years: (year_start..=year_end).collect(),
        }
    }

    pub fn model_index(&self, model: &str) -> FusionResult<usize> {
        find_label("model", &self.models, model)
    }

    pub fn scenario_index(&self, scenario: &str) -> FusionResult<usize> {
        find_label("scenario", &self.scenarios, scenario)
    }

    pub fn year_index(&self, year: i32) -> FusionResult<usize> {
        match self.years.first() {
            Some(first) if year >= *first && ((year - first) as usize) < self.years.len() => {
                Ok((year - first) as usize)
            }
            _ => Err(FusionError::UnknownLabel {
                axis: "year".to_string(),
                label: year.to_string(),
            }),
        }
    }
}

fn find_label(axis: &str, labels: &[String], label: &str) -> FusionResult<usize> {
    labels
        .iter()
        .position(|l| l == label)
        .ok_or_else(|| FusionError::UnknownLabel {
            axis: axis.to_string(),
            label: label.to_string(),
        })
}

/// The output cube in computation order
///
/// Spatial axes follow the reference grid: `(latitude, longitude)` with latitude in the
/// observational product's orientation.
#[derive(Clone, Debug)]
pub struct AnomalyCube {
    axes: CubeAxes,
    grid: Arc<LatLonGrid>,
    sentinel: f32,
    /// `(model, latitude, longitude)`
    baseline: Array3<f32>,
    /// `(model, scenario, year, latitude, longitude)`
    anomaly: Array5<f32>,
    /// `(model, scenario, year)`
    computed: Array3<bool>,
    baseline_computed: Array1<bool>,
}

impl AnomalyCube {
    /// Allocate a cube with every cell set to `sentinel`
    pub fn new(axes: CubeAxes, grid: Arc<LatLonGrid>, sentinel: f32) -> Self {
        let (n_lat, n_lon) = grid.shape();
        let (n_model, n_scenario, n_year) =
            (axes.models.len(), axes.scenarios.len(), axes.years.len());
        Self {
            baseline: Array3::from_elem((n_model, n_lat, n_lon), sentinel),
            anomaly: Array5::from_elem((n_model, n_scenario, n_year, n_lat, n_lon), sentinel),
            computed: Array3::from_elem((n_model, n_scenario, n_year), false),
            baseline_computed: Array1::from_elem(n_model, false),
            axes,
            grid,
            sentinel,
        }
    }

    pub fn axes(&self) -> &CubeAxes {
        &self.axes
    }

    pub fn grid(&self) -> &Arc<LatLonGrid> {
        &self.grid
    }

    pub fn sentinel(&self) -> f32 {
        self.sentinel
    }

    pub fn baseline(&self) -> ArrayView3<'_, f32> {
        self.baseline.view()
    }

    pub fn anomaly(&self) -> ArrayView5<'_, f32> {
        self.anomaly.view()
    }

    pub fn computed(&self) -> ArrayView3<'_, bool> {
        self.computed.view()
    }

    pub fn baseline_computed(&self) -> &Array1<bool> {
        &self.baseline_computed
    }

    /// Number of `(model, scenario, year)` slots holding data
    pub fn computed_count(&self) -> usize {
        self.computed.iter().filter(|c| **c).count()
    }

    fn check_grid(&self, field: &Field, what: &str) -> FusionResult<()> {
        if Arc::ptr_eq(field.grid(), &self.grid) || field.grid().equivalent(&self.grid) {
            Ok(())
        } else {
            Err(FusionError::GridMismatch {
                context: format!(
                    "{} field of shape {:?} does not match the reference grid {:?}",
                    what,
                    field.grid().shape(),
                    self.grid.shape()
                ),
            })
        }
    }

    /// Narrow a field to output cells; missing (non-finite) values become the sentinel
    fn to_cells(&self, field: &Field) -> Array2<f32> {
        let sentinel = self.sentinel;
        field
            .values()
            .mapv(|v| if v.is_finite() { v as f32 } else { sentinel })
    }

    /// Write the anomaly for one `(model, scenario, year)` slot
    pub fn write_anomaly(
        &mut self,
        model: &str,
        scenario: &str,
        year: i32,
        field: &Field,
    ) -> FusionResult<()> {
        let m = self.axes.model_index(model)?;
        let sc = self.axes.scenario_index(scenario)?;
        let y = self.axes.year_index(year)?;
        self.check_grid(field, "anomaly")?;
        if self.computed[[m, sc, y]] {
            return Err(FusionError::CellAlreadyWritten {
                model: model.to_string(),
                scenario: scenario.to_string(),
                year,
            });
        }

        let cells = self.to_cells(field);
        self.anomaly.slice_mut(s![m, sc, y, .., ..]).assign(&cells);
        self.computed[[m, sc, y]] = true;
        Ok(())
    }

    /// Write the baseline of one model
    pub fn write_baseline(&mut self, model: &str, field: &Field) -> FusionResult<()> {
        let m = self.axes.model_index(model)?;
        self.check_grid(field, "baseline")?;
        if self.baseline_computed[m] {
            return Err(FusionError::BaselineAlreadyWritten {
                model: model.to_string(),
            });
        }

        let cells = self.to_cells(field);
        self.baseline.index_axis_mut(Axis(0), m).assign(&cells);
        self.baseline_computed[m] = true;
        Ok(())
    }

    pub fn is_computed(&self, model: &str, scenario: &str, year: i32) -> FusionResult<bool> {
        Ok(self.computed[[
            self.axes.model_index(model)?,
            self.axes.scenario_index(scenario)?,
            self.axes.year_index(year)?,
        ]])
    }

    /// The `(latitude, longitude)` slice of one slot
    pub fn anomaly_at(
        &self,
        model: &str,
        scenario: &str,
        year: i32,
    ) -> FusionResult<ArrayView2<'_, f32>> {
        let m = self.axes.model_index(model)?;
        let sc = self.axes.scenario_index(scenario)?;
        let y = self.axes.year_index(year)?;
        Ok(self.anomaly.slice(s![m, sc, y, .., ..]))
    }

    pub fn baseline_at(&self, model: &str) -> FusionResult<ArrayView2<'_, f32>> {
        let m = self.axes.model_index(model)?;
        Ok(self.baseline.index_axis(Axis(0), m))
    }
}
