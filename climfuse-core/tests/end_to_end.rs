//! End-to-end fusion of one observational product and one projection model.
//!
//! Inputs are built the way a dataset reader would build them: raw time coordinates are
//! decoded with [`TimeEncoding`] and the model arrays arrive in `(lat, lon, time)` order.

use approx::assert_abs_diff_eq;
use climfuse_core::calendar::{decode_times, TimeEncoding};
use climfuse_core::cube::DEFAULT_SENTINEL;
use climfuse_core::pipeline::FusionBuilder;
use climfuse_core::source::{MemoryCatalog, MemoryObservations, MemoryWriter, SourceKey};
use climfuse_core::spatial::LatLonGrid;
use climfuse_core::timeseries::{
    Climatology, FloatValue, MonthlySeries, SeriesSemantics, TemperatureUnit,
};
use ndarray::Array3;
use std::sync::Arc;

const NOLEAP_CUMULATIVE_DAYS: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Model rows nearest to reference latitudes `[-45, 0, 45, 89.5]`
const ROWS: [usize; 4] = [0, 1, 2, 2];
/// Model columns nearest to reference longitudes `[-150, -30, 90]`
const COLUMNS: [usize; 3] = [2, 0, 1];

fn obs_grid() -> Arc<LatLonGrid> {
    Arc::new(
        LatLonGrid::from_vecs(
            vec![-89.5, -45.0, 0.0, 45.0, 89.5],
            vec![-150.0, -30.0, 90.0],
        )
        .unwrap(),
    )
}

fn model_grid() -> Arc<LatLonGrid> {
    Arc::new(LatLonGrid::from_vecs(vec![-60.0, 0.0, 60.0], vec![0.0, 120.0, 240.0]).unwrap())
}

fn obs_value(month_index: usize, row: usize) -> FloatValue {
    0.1 * month_index as FloatValue - 0.2 * row as FloatValue
}

/// Berkeley-style anomalies with decimal-year times: 1850 complete, 1851 January-September
fn observations() -> MemoryObservations {
    let n_months = 21;
    let raw_times: Vec<FloatValue> = (0..n_months)
        .map(|k| 1850.0 + (k as FloatValue + 0.5) / 12.0)
        .collect();
    let times = decode_times(&raw_times, &TimeEncoding::DecimalYear).unwrap();

    let series = MonthlySeries::new(
        obs_grid(),
        times,
        Array3::from_shape_fn((n_months, 5, 3), |(t, i, _)| obs_value(t, i)),
        SeriesSemantics::Anomaly,
        TemperatureUnit::Celsius,
    )
    .unwrap();
    let climatology = Climatology::from_native(
        obs_grid(),
        Array3::from_shape_fn((5, 3, 12), |(i, _, m)| 12.0 + m as FloatValue - i as FloatValue),
        ["latitude", "longitude", "month_number"],
        TemperatureUnit::Celsius,
    )
    .unwrap();
    MemoryObservations::new(series, climatology).unwrap()
}

fn baseline_value(i: usize, j: usize) -> FloatValue {
    288.0 + i as FloatValue + 0.1 * j as FloatValue
}

fn anomaly_value(year: i32, i: usize) -> FloatValue {
    0.5 * (year - 2020) as FloatValue + 0.01 * i as FloatValue
}

/// Model series in `(lat, lon, time)` order on a noleap calendar
fn model_series(
    start_year: i32,
    end_year: i32,
    value: impl Fn(i32, usize, usize) -> FloatValue,
) -> MonthlySeries {
    let mut raw_times = Vec::new();
    let mut years = Vec::new();
    for year in start_year..=end_year {
        for month in 0..12 {
            let days = (year - 1850) as u32 * 365 + NOLEAP_CUMULATIVE_DAYS[month] + 14;
            raw_times.push(days as FloatValue);
            years.push(year);
        }
    }
    let encoding = TimeEncoding::cf("days since 1850-01-01 00:00:00", "noleap").unwrap();
    let times = decode_times(&raw_times, &encoding).unwrap();

    let native = Array3::from_shape_fn((3, 3, raw_times.len()), |(i, j, t)| value(years[t], i, j));
    MonthlySeries::from_native(
        model_grid(),
        times,
        native,
        ["lat", "lon", "time"],
        SeriesSemantics::Absolute,
        TemperatureUnit::Kelvin,
    )
    .unwrap()
}

fn catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog
        .insert(
            SourceKey::new("CESM2", "historical"),
            model_series(1950, 1980, |_, i, j| baseline_value(i, j)),
        )
        .insert(
            SourceKey::new("CESM2", "ssp245"),
            model_series(2025, 2026, |year, i, j| {
                baseline_value(i, j) + anomaly_value(year, i)
            }),
        );
    catalog
}

#[test]
fn fuses_observations_and_one_projection_model() {
    let pipeline = FusionBuilder::new()
        .with_models(&["Berkeley-Earth", "CESM2"])
        .with_scenarios(&["historical", "ssp126", "ssp245"])
        .build()
        .unwrap();
    let output = pipeline.run(&observations(), &catalog()).unwrap();
    let cube = &output.cube;

    // 1850 holds the mean of its 12 observational months
    assert!(cube.is_computed("Berkeley-Earth", "historical", 1850).unwrap());
    let obs_1850 = cube.anomaly_at("Berkeley-Earth", "historical", 1850).unwrap();
    for ((r, _), value) in obs_1850.indexed_iter() {
        let expected: FloatValue = (0..12).map(|t| obs_value(t, r + 1)).sum::<FloatValue>() / 12.0;
        assert_abs_diff_eq!(*value as FloatValue, expected, epsilon = 1e-5);
    }

    // 1851 has only nine months
    assert!(!cube.is_computed("Berkeley-Earth", "historical", 1851).unwrap());
    assert!(cube
        .anomaly_at("Berkeley-Earth", "historical", 1851)
        .unwrap()
        .iter()
        .all(|&v| v == DEFAULT_SENTINEL));
    assert_eq!(output.report.dropped_year.map(|d| d.year), Some(1851));

    // No ssp126 source
    for year in 1850..=2100 {
        assert!(!cube.is_computed("CESM2", "ssp126", year).unwrap());
    }
    assert!(cube
        .anomaly()
        .slice(ndarray::s![1, 1, .., .., ..])
        .iter()
        .all(|&v| v == DEFAULT_SENTINEL));

    // ssp245 2025-2026 are baseline-subtracted and regridded
    for year in [2025, 2026] {
        let slot = cube.anomaly_at("CESM2", "ssp245", year).unwrap();
        for ((r, _), value) in slot.indexed_iter() {
            assert_abs_diff_eq!(
                *value as FloatValue,
                anomaly_value(year, ROWS[r]),
                epsilon = 1e-4
            );
        }
    }
    assert!(!cube.is_computed("CESM2", "ssp245", 2024).unwrap());
    assert!(!cube.is_computed("CESM2", "ssp245", 2027).unwrap());
    assert!(cube
        .anomaly_at("CESM2", "ssp245", 2027)
        .unwrap()
        .iter()
        .all(|&v| v == DEFAULT_SENTINEL));

    // Baselines are stored in °C
    let baseline = cube.baseline_at("CESM2").unwrap();
    for ((r, c), value) in baseline.indexed_iter() {
        assert_abs_diff_eq!(
            *value as FloatValue,
            baseline_value(ROWS[r], COLUMNS[c]) - 273.15,
            epsilon = 1e-3
        );
    }
    assert_eq!(output.report.written_cells(), 3);
}

#[test]
fn written_cube_has_output_layout() {
    let pipeline = FusionBuilder::new()
        .with_models(&["Berkeley-Earth", "CESM2"])
        .with_scenarios(&["historical", "ssp126", "ssp245"])
        .build()
        .unwrap();
    let mut writer = MemoryWriter::default();
    pipeline
        .run_to_writer(&observations(), &catalog(), &mut writer)
        .unwrap();
    let cube = writer.cube.expect("cube should be written");

    assert_eq!(cube.latitude.to_vec(), vec![89.5, 45.0, 0.0, -45.0]);
    assert_eq!(cube.longitude.to_vec(), vec![-150.0, -30.0, 90.0]);
    assert_eq!(cube.year.len(), 251);
    assert_eq!(cube.anomaly.shape(), &[2, 3, 251, 3, 4]);
    assert_eq!(cube.baseline.shape(), &[2, 3, 4]);

    // CESM2 / ssp245 / 2026 at longitude 90 (column 1) and latitude 89.5 (row 2)
    assert_abs_diff_eq!(
        cube.anomaly[[1, 2, 2026 - 1850, 2, 0]] as FloatValue,
        anomaly_value(2026, 2),
        epsilon = 1e-4
    );

    let json = serde_json::to_value(&cube).unwrap();
    assert_eq!(json["variables"][1]["name"], "anomaly");
    assert_eq!(json["variables"][1]["_FillValue"], -9999.0);
    assert_eq!(
        json["variables"][1]["unit"],
        "delta from reference-period baseline (°C)"
    );
}
