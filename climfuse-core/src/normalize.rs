//! Conversion of the cube into its published layout
//!
//! Consumers expect `(…, longitude, latitude)` axis order with latitude running from north
//! to south. Normalisation only moves values; none are changed.

use crate::cube::AnomalyCube;
use crate::output_variables::{VAR_ANOMALY, VAR_BASELINE};
use crate::timeseries::FloatValue;
use crate::variable::VariableMetadata;
use ndarray::{Array1, Array3, Array5, Axis};
use serde::Serialize;

/// The anomaly cube in output layout
#[derive(Clone, Debug, Serialize)]
pub struct NormalizedCube {
    pub model: Vec<String>,
    pub scenario: Vec<String>,
    pub year: Vec<i32>,
    pub longitude: Array1<FloatValue>,
    /// Strictly descending
    pub latitude: Array1<FloatValue>,
    /// `(model, longitude, latitude)`
    pub baseline: Array3<f32>,
    /// `(model, scenario, year, longitude, latitude)`
    pub anomaly: Array5<f32>,
    /// `(model, scenario, year)`
    pub computed: Array3<bool>,
    pub variables: Vec<VariableMetadata>,
}

impl NormalizedCube {
    pub fn baseline_metadata(&self) -> Option<&VariableMetadata> {
        self.variables.iter().find(|v| v.name == VAR_BASELINE.name)
    }

    pub fn anomaly_metadata(&self) -> Option<&VariableMetadata> {
        self.variables.iter().find(|v| v.name == VAR_ANOMALY.name)
    }
}

/// Indices that sort `values` into descending order
fn descending_order(values: &Array1<FloatValue>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*b].total_cmp(&values[*a]));
    order
}

/// Reorder the cube's axes and sort latitude descending
pub fn normalize(cube: &AnomalyCube) -> NormalizedCube {
    let grid = cube.grid();
    let latitude = grid.latitude().values().to_owned();
    let order = descending_order(&latitude);

    // Latitude is axis 1 of the baseline and axis 3 of the anomaly
    let baseline = cube
        .baseline()
        .select(Axis(1), &order)
        .permuted_axes([0, 2, 1])
        .as_standard_layout()
        .into_owned();
    let anomaly = cube
        .anomaly()
        .select(Axis(3), &order)
        .permuted_axes([0, 1, 2, 4, 3])
        .as_standard_layout()
        .into_owned();

    let axes = cube.axes();
    NormalizedCube {
        model: axes.models.clone(),
        scenario: axes.scenarios.clone(),
        year: axes.years.clone(),
        longitude: grid.longitude().values().to_owned(),
        latitude: latitude.select(Axis(0), &order),
        baseline,
        anomaly,
        computed: cube.computed().to_owned(),
        variables: vec![
            VAR_BASELINE.to_metadata(cube.sentinel()),
            VAR_ANOMALY.to_metadata(cube.sentinel()),
        ],
    }
}
