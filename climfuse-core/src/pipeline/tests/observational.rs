//! Observational annual means and the reference grid.

use super::fixtures::*;
use crate::aggregation::IncompleteYear;
use crate::cube::DEFAULT_SENTINEL;
use crate::source::MemoryObservations;
use crate::timeseries::{Climatology, FloatValue, SeriesSemantics, TemperatureUnit, Timestamp};
use approx::assert_abs_diff_eq;
use ndarray::{array, Array3};

#[test]
fn reference_grid_is_cropped_observational_grid() {
    let output = pipeline().run(&observations(), &catalog()).unwrap();
    let grid = output.cube.grid();
    assert_eq!(grid.latitude().values(), array![-40.0, 0.0, 40.0, 80.0]);
    assert_eq!(grid.longitude().values(), array![-120.0, 0.0, 120.0]);
}

#[test]
fn complete_year_is_mean_of_its_months() {
    let output = pipeline().run(&observations(), &catalog()).unwrap();
    let slot = output.cube.anomaly_at(OBS, "historical", 1850).unwrap();

    for ((r, _), value) in slot.indexed_iter() {
        assert_abs_diff_eq!(
            *value as FloatValue,
            obs_annual_mean(1850, r),
            epsilon = 1e-5
        );
    }
}

#[test]
fn incomplete_trailing_year_is_not_written() {
    let output = pipeline().run(&observations(), &catalog()).unwrap();

    assert!(!output.cube.is_computed(OBS, "historical", 1851).unwrap());
    let slot = output.cube.anomaly_at(OBS, "historical", 1851).unwrap();
    assert!(slot.iter().all(|&v| v == DEFAULT_SENTINEL));
    assert_eq!(
        output.report.dropped_year,
        Some(IncompleteYear {
            year: 1851,
            months: 9
        })
    );
    assert_eq!(output.report.written.get(OBS), Some(&1));
}

#[test]
fn observations_are_only_written_under_historical() {
    let output = pipeline().run(&observations(), &catalog()).unwrap();
    for scenario in ["ssp126", "ssp245"] {
        assert!((1850..=2030).all(|y| !output.cube.is_computed(OBS, scenario, y).unwrap()));
    }
}

#[test]
fn observational_baseline_is_climatology_mean() {
    let output = pipeline().run(&observations(), &catalog()).unwrap();
    let stored = output.cube.baseline_at(OBS).unwrap();
    // Climatology row i holds 10 + month + i; the reference grid starts at row 1
    for ((r, _), value) in stored.indexed_iter() {
        assert_abs_diff_eq!(*value as FloatValue, 15.5 + (r + 1) as FloatValue, epsilon = 1e-5);
    }
}

#[test]
fn absolute_observations_have_their_climatology_subtracted() {
    let series = monthly_series(
        obs_grid(),
        1850,
        24,
        SeriesSemantics::Absolute,
        TemperatureUnit::Kelvin,
        |_, i, _| 273.15 + 20.0 + i as FloatValue,
    );
    let climatology = Climatology::new(
        obs_grid(),
        Array3::from_shape_fn((12, 5, 3), |(m, i, _)| 10.0 + m as FloatValue + i as FloatValue),
        TemperatureUnit::Celsius,
    )
    .unwrap();
    let observations = MemoryObservations::new(series, climatology).unwrap();

    let output = pipeline().run(&observations, &catalog()).unwrap();
    for year in [1850, 1851] {
        let slot = output.cube.anomaly_at(OBS, "historical", year).unwrap();
        slot.iter()
            .for_each(|&v| assert_abs_diff_eq!(v as FloatValue, 4.5, epsilon = 1e-4));
    }
    assert!(output.report.dropped_year.is_none());
}

#[test]
fn missing_observational_cells_are_skipped_or_filled() {
    // Row 2, column 1 is missing in January 1850 only; row 4, column 2 is never observed
    let series = monthly_series(
        obs_grid(),
        1850,
        21,
        SeriesSemantics::Anomaly,
        TemperatureUnit::Celsius,
        |t, i, j| match (i, j) {
            (2, 1) if t.year == 1850 && t.month == 1 => FloatValue::NAN,
            (4, 2) => FloatValue::NAN,
            _ => obs_value(t, i, j),
        },
    );
    let climatology = Climatology::new(
        obs_grid(),
        Array3::from_shape_fn((12, 5, 3), |(m, i, j)| {
            if (i, j) == (4, 2) {
                FloatValue::NAN
            } else {
                10.0 + m as FloatValue + i as FloatValue
            }
        }),
        TemperatureUnit::Celsius,
    )
    .unwrap();
    let observations = MemoryObservations::new(series, climatology).unwrap();

    let output = pipeline().run(&observations, &catalog()).unwrap();
    let slot = output.cube.anomaly_at(OBS, "historical", 1850).unwrap();
    let partial: FloatValue = (2..=12)
        .map(|m| obs_value(Timestamp::mid_month(1850, m), 2, 1))
        .sum::<FloatValue>()
        / 11.0;
    assert_abs_diff_eq!(slot[[1, 1]] as FloatValue, partial, epsilon = 1e-5);
    assert_eq!(slot[[3, 2]], DEFAULT_SENTINEL);
    assert_abs_diff_eq!(slot[[3, 1]] as FloatValue, obs_annual_mean(1850, 3), epsilon = 1e-5);

    let baseline = output.cube.baseline_at(OBS).unwrap();
    assert_eq!(baseline[[3, 2]], DEFAULT_SENTINEL);
    assert_abs_diff_eq!(baseline[[3, 1]] as FloatValue, 19.5, epsilon = 1e-5);

    let normalized = output.normalize();
    assert!(normalized.anomaly.iter().all(|v| v.is_finite()));
    assert!(normalized.baseline.iter().all(|v| v.is_finite()));
}
