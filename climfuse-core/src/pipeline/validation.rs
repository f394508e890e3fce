//! Input checks run before any computation.

use crate::errors::{FusionError, FusionResult};
use crate::source::SourceKey;
use crate::spatial::LatLonGrid;
use crate::timeseries::{Climatology, MonthlySeries};

/// The observational series and climatology must share one grid.
pub(crate) fn verify_observational_inputs(
    series: &MonthlySeries,
    climatology: &Climatology,
) -> FusionResult<()> {
    verify_same_grid(
        "observational climatology",
        series.grid(),
        climatology.grid(),
    )
}

/// A scenario source must be on the same native grid as its model's historical source,
/// otherwise the native baseline cannot be subtracted from it.
pub(crate) fn verify_scenario_grid(
    key: &SourceKey,
    historical: &LatLonGrid,
    scenario: &MonthlySeries,
) -> FusionResult<()> {
    verify_same_grid(&key.to_string(), historical, scenario.grid())
}

fn verify_same_grid(what: &str, expected: &LatLonGrid, actual: &LatLonGrid) -> FusionResult<()> {
    if expected.equivalent(actual) {
        Ok(())
    } else {
        Err(FusionError::GridMismatch {
            context: format!(
                "{} has grid {:?}, expected {:?}",
                what,
                actual.shape(),
                expected.shape()
            ),
        })
    }
}

/// Historical sources are required for every projection model.
pub(crate) fn require_historical(
    key: &SourceKey,
    series: Option<MonthlySeries>,
) -> FusionResult<MonthlySeries> {
    series.ok_or_else(|| FusionError::MissingHistorical {
        key: key.to_string(),
    })
}
