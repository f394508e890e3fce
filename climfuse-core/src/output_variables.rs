//! Variables of the normalised output cube
//!
//! - `VAR_BASELINE` - per-model reference-period mean, `(model, longitude, latitude)`
//! - `VAR_ANOMALY` - annual-mean anomaly, `(model, scenario, year, longitude, latitude)`

use crate::define_static_variable;
use crate::variable::StaticVariableDefinition;

define_static_variable!(
    VAR_BASELINE,
    name = "baseline",
    long_name = "Near-surface air temperature averaged over the baseline period",
    unit = "reference-period mean (°C)",
    dims = ["model", "longitude", "latitude"],
);

define_static_variable!(
    VAR_ANOMALY,
    name = "anomaly",
    long_name = "Annual-mean near-surface air temperature anomaly",
    unit = "delta from reference-period baseline (°C)",
    dims = ["model", "scenario", "year", "longitude", "latitude"],
);

/// All output variables, in the order they are written
pub static OUTPUT_VARIABLES: [&StaticVariableDefinition; 2] = [&VAR_BASELINE, &VAR_ANOMALY];

/// Look up an output variable by name
pub fn get(name: &str) -> Option<&'static StaticVariableDefinition> {
    OUTPUT_VARIABLES.iter().copied().find(|v| v.name == name)
}
