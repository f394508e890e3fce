//! Reference-period baselines
//!
//! Every model's anomalies are measured against that model's own mean climate over a
//! fixed reference period. Baselines are computed on the model's native grid; callers
//! decide when to reproject them.

use crate::errors::{FusionError, FusionResult};
use crate::spatial::Field;
use crate::timeseries::{
    finite_mean, Climatology, MonthlySeries, TemperatureUnit, Timestamp, MONTHS_PER_YEAR,
};
use log::debug;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Closed interval of timestamps averaged into a baseline
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselinePeriod {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Default for BaselinePeriod {
    fn default() -> Self {
        Self {
            start: Timestamp::new(1951, 1, 1),
            end: Timestamp::new(1980, 12, 31),
        }
    }
}

impl BaselinePeriod {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Both bounds are inclusive
    pub fn contains(&self, t: &Timestamp) -> bool {
        *t >= self.start && *t <= self.end
    }
}

/// Baseline of an observational product from its monthly climatology
///
/// The climatology is supplied by the product rather than re-derived, so the baseline is
/// the mean of its 12 calendar-month fields. Missing months are skipped per cell. The
/// result stays in the climatology's unit.
pub fn observational_baseline(climatology: &Climatology) -> FusionResult<Field> {
    let values = climatology.values();
    if values.len_of(Axis(0)) != MONTHS_PER_YEAR {
        return Err(FusionError::InvalidClimatology(format!(
            "expected {} months, got {}",
            MONTHS_PER_YEAR,
            values.len_of(Axis(0))
        )));
    }
    let mean = finite_mean(climatology.grid().shape(), values.axis_iter(Axis(0)));
    Field::new(Arc::clone(climatology.grid()), mean)
}

/// Baseline of a projection model from its historical series
///
/// Averages every monthly field whose timestamp lies inside `period`. The result is on the
/// series' native grid and in its native unit.
pub fn projection_baseline(
    model: &str,
    series: &MonthlySeries,
    period: &BaselinePeriod,
) -> FusionResult<Field> {
    let indices = series.indices_between(period.start, period.end);
    let baseline = series
        .mean_of(&indices)
        .ok_or_else(|| FusionError::EmptyBaselinePeriod {
            model: model.to_string(),
            start: period.start.to_string(),
            end: period.end.to_string(),
        })?;
    debug!(
        "Baseline for {} computed from {} monthly fields",
        model,
        indices.len()
    );
    Ok(baseline)
}

/// Convert an absolute baseline in `unit` into °C for storage
pub fn baseline_in_celsius(baseline: Field, unit: TemperatureUnit) -> Field {
    baseline.offset(unit.celsius_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::LatLonGrid;
    use crate::timeseries::{FloatValue, SeriesSemantics};
    use approx::assert_relative_eq;
    use ndarray::{Array, Array3};

    fn grid() -> Arc<LatLonGrid> {
        Arc::new(LatLonGrid::from_vecs(vec![-45.0, 45.0], vec![0.0, 90.0, 180.0]).unwrap())
    }

    fn series(times: Vec<Timestamp>, values: Vec<FloatValue>) -> MonthlySeries {
        let n = times.len();
        let values = Array3::from_shape_fn((n, 2, 3), |(t, _, _)| values[t]);
        MonthlySeries::new(
            grid(),
            times,
            values,
            SeriesSemantics::Absolute,
            TemperatureUnit::Kelvin,
        )
        .unwrap()
    }

    #[test]
    fn default_period_is_1951_to_1980() {
        let period = BaselinePeriod::default();
        assert!(period.contains(&Timestamp::new(1951, 1, 1)));
        assert!(period.contains(&Timestamp::new(1980, 12, 31)));
        assert!(!period.contains(&Timestamp::new(1950, 12, 31)));
        assert!(!period.contains(&Timestamp::new(1981, 1, 1)));
    }

    #[test]
    fn observational_baseline_is_mean_of_climatology_months() {
        let values = Array::from_shape_fn((12, 2, 3), |(m, la, _)| (m + la) as FloatValue);
        let climatology = Climatology::new(grid(), values, TemperatureUnit::Celsius).unwrap();
        let baseline = observational_baseline(&climatology).unwrap();
        // mean(0..12) = 5.5
        assert_relative_eq!(baseline.values()[[0, 0]], 5.5);
        assert_relative_eq!(baseline.values()[[1, 2]], 6.5);
    }

    #[test]
    fn observational_baseline_skips_missing_months() {
        let values = Array::from_shape_fn((12, 2, 3), |(m, la, lo)| match (m, la, lo) {
            (0, 0, 0) => FloatValue::NAN,
            (_, 1, 1) => FloatValue::NAN,
            _ => m as FloatValue,
        });
        let climatology = Climatology::new(grid(), values, TemperatureUnit::Celsius).unwrap();
        let baseline = observational_baseline(&climatology).unwrap();
        // mean(1..12) = 6
        assert_relative_eq!(baseline.values()[[0, 0]], 6.0);
        assert_relative_eq!(baseline.values()[[0, 1]], 5.5);
        assert!(baseline.values()[[1, 1]].is_nan());
    }

    #[test]
    fn fields_one_day_outside_the_period_are_excluded() {
        let times = vec![
            Timestamp::new(1950, 12, 31),
            Timestamp::new(1951, 1, 1),
            Timestamp::new(1965, 6, 15),
            Timestamp::new(1980, 12, 31),
            Timestamp::new(1981, 1, 1),
        ];
        let s = series(times, vec![1000.0, 1.0, 2.0, 6.0, -1000.0]);
        let baseline = projection_baseline("CESM2", &s, &BaselinePeriod::default()).unwrap();
        baseline
            .values()
            .iter()
            .for_each(|&v| assert_relative_eq!(v, 3.0));
    }

    #[test]
    fn empty_period_is_an_error() {
        let s = series(
            vec![Timestamp::mid_month(2000, 1), Timestamp::mid_month(2000, 2)],
            vec![1.0, 2.0],
        );
        let result = projection_baseline("MIROC6", &s, &BaselinePeriod::default());
        match result {
            Err(FusionError::EmptyBaselinePeriod { model, start, end }) => {
                assert_eq!(model, "MIROC6");
                assert_eq!(start, "1951-01-01");
                assert_eq!(end, "1980-12-31");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn kelvin_baseline_converts_to_celsius() {
        let s = series(vec![Timestamp::mid_month(1960, 1)], vec![288.15]);
        let baseline = projection_baseline("CESM2", &s, &BaselinePeriod::default()).unwrap();
        let celsius = baseline_in_celsius(baseline, s.unit());
        celsius
            .values()
            .iter()
            .for_each(|&v| assert_relative_eq!(v, 15.0, epsilon = 1e-9));
    }
}
