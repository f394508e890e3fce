//! Monthly gridded time series
//!
//! A [`MonthlySeries`] is the in-memory form of one source dataset: a stack of monthly
//! `(latitude, longitude)` fields sharing a single grid, ordered by [`Timestamp`].
//! Native arrays arrive in whatever dimension order the producing model used and are
//! transposed to `(time, latitude, longitude)` on construction.

use crate::errors::{FusionError, FusionResult};
use crate::spatial::{Field, LatLonGrid};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub type FloatValue = f64;

/// Number of monthly entries in a complete year
pub const MONTHS_PER_YEAR: usize = 12;

/// A calendar-agnostic date
///
/// Ordering is lexicographic on `(year, month, day)`, which is correct for every
/// calendar in use by climate models (including 360-day years where February has 30
/// days), so no calendar is needed to compare or bucket timestamps.
///
/// Serialises as an ISO `YYYY-MM-DD` string.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Timestamp {
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// The mid-month convention used by monthly-mean model output
    pub const fn mid_month(year: i32, month: u32) -> Self {
        Self::new(year, month, 15)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for Timestamp {
    type Err = FusionError;

    /// Parse `YYYY-MM-DD`; days up to 31 are accepted in every month
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FusionError::Error(format!("invalid date `{}`, expected YYYY-MM-DD", s));
        let (year, rest) = s.trim().split_once('-').ok_or_else(invalid)?;
        let (month, day) = rest.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(invalid());
        }
        Ok(Timestamp::new(year, month, day))
    }
}

impl TryFrom<String> for Timestamp {
    type Error = FusionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_string()
    }
}

/// What the values of a series represent
///
/// Observational products frequently ship anomalies relative to their own climatology,
/// whereas model output is absolute near-surface temperature. The pipeline uses this tag
/// instead of guessing from variable names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesSemantics {
    /// Absolute temperature
    Absolute,
    /// Departure from the source's own reference climatology
    Anomaly,
}

/// Temperature unit of a series
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    /// Offset to add to an absolute value in this unit to obtain °C
    ///
    /// Differences between two values need no conversion.
    pub fn celsius_offset(&self) -> FloatValue {
        match self {
            TemperatureUnit::Celsius => 0.0,
            TemperatureUnit::Kelvin => -273.15,
        }
    }
}

/// Dimensions of a native `(time, lat, lon)` array
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dim {
    Time,
    Latitude,
    Longitude,
}

impl Dim {
    /// Parse a dataset dimension name
    pub fn parse(name: &str) -> FusionResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "time" | "month" | "month_number" => Ok(Dim::Time),
            "lat" | "latitude" => Ok(Dim::Latitude),
            "lon" | "longitude" => Ok(Dim::Longitude),
            _ => Err(FusionError::UnknownDimension(name.to_string())),
        }
    }
}

/// Permute a native 3-D array into `(time, latitude, longitude)` order
pub(crate) fn to_canonical_order(
    values: Array3<FloatValue>,
    dims: [&str; 3],
) -> FusionResult<Array3<FloatValue>> {
    let parsed = [Dim::parse(dims[0])?, Dim::parse(dims[1])?, Dim::parse(dims[2])?];
    let position = |target: Dim| -> FusionResult<usize> {
        let matches: Vec<usize> = parsed
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == target)
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [i] => Ok(*i),
            _ => Err(FusionError::Error(format!(
                "dimensions {:?} must contain each of time, latitude and longitude exactly once",
                dims
            ))),
        }
    };
    let order = [
        position(Dim::Time)?,
        position(Dim::Latitude)?,
        position(Dim::Longitude)?,
    ];
    Ok(values
        .permuted_axes(order)
        .as_standard_layout()
        .into_owned())
}

/// Cell-wise mean over `fields`, ignoring non-finite values
///
/// Gridded products mark land/ocean masks and missing months as NaN. A cell is NaN in the
/// result only if it has no finite value in any of the fields.
pub(crate) fn finite_mean<'a>(
    shape: (usize, usize),
    fields: impl Iterator<Item = ArrayView2<'a, FloatValue>>,
) -> Array2<FloatValue> {
    let mut sum = Array2::<FloatValue>::zeros(shape);
    let mut count = Array2::<usize>::zeros(shape);
    for field in fields {
        Zip::from(&mut sum)
            .and(&mut count)
            .and(&field)
            .for_each(|s, n, &v| {
                if v.is_finite() {
                    *s += v;
                    *n += 1;
                }
            });
    }
    Zip::from(&mut sum).and(&count).for_each(|s, &n| {
        *s = if n == 0 {
            FloatValue::NAN
        } else {
            *s / n as FloatValue
        };
    });
    sum
}

/// A monthly series of fields on one grid
#[derive(Clone, Debug, Serialize)]
pub struct MonthlySeries {
    grid: Arc<LatLonGrid>,
    times: Vec<Timestamp>,
    /// `(time, latitude, longitude)`
    values: Array3<FloatValue>,
    semantics: SeriesSemantics,
    unit: TemperatureUnit,
}

impl MonthlySeries {
    /// Create a series from a `(time, latitude, longitude)` array
    ///
    /// Timestamps must be unique and non-decreasing and the array shape must match
    /// `(times.len(), n_lat, n_lon)`.
    pub fn new(
        grid: Arc<LatLonGrid>,
        times: Vec<Timestamp>,
        values: Array3<FloatValue>,
        semantics: SeriesSemantics,
        unit: TemperatureUnit,
    ) -> FusionResult<Self> {
        let (n_lat, n_lon) = grid.shape();
        let expected = (times.len(), n_lat, n_lon);
        if values.dim() != expected {
            return Err(FusionError::ShapeMismatch {
                what: "monthly series".to_string(),
                expected: vec![expected.0, expected.1, expected.2],
                actual: values.shape().to_vec(),
            });
        }
        if let Some(w) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(FusionError::UnorderedTimestamps {
                previous: w[0].to_string(),
                next: w[1].to_string(),
            });
        }

        Ok(Self {
            grid,
            times,
            values,
            semantics,
            unit,
        })
    }

    /// Create a series from an array in its native dimension order
    ///
    /// `dims` names the axes of `values`, e.g. `["lat", "lon", "time"]`.
    pub fn from_native(
        grid: Arc<LatLonGrid>,
        times: Vec<Timestamp>,
        values: Array3<FloatValue>,
        dims: [&str; 3],
        semantics: SeriesSemantics,
        unit: TemperatureUnit,
    ) -> FusionResult<Self> {
        let values = to_canonical_order(values, dims)?;
        Self::new(grid, times, values, semantics, unit)
    }

    pub fn grid(&self) -> &Arc<LatLonGrid> {
        &self.grid
    }

    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    pub fn values(&self) -> ArrayView3<'_, FloatValue> {
        self.values.view()
    }

    pub fn semantics(&self) -> SeriesSemantics {
        self.semantics
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The monthly field at `index`
    pub fn field(&self, index: usize) -> Option<Field> {
        if index >= self.len() {
            return None;
        }
        Field::new(
            Arc::clone(&self.grid),
            self.values.index_axis(Axis(0), index).to_owned(),
        )
        .ok()
    }

    /// Indices of the entries with `start <= timestamp <= end`
    pub fn indices_between(&self, start: Timestamp, end: Timestamp) -> Vec<usize> {
        self.times
            .iter()
            .enumerate()
            .filter(|(_, t)| **t >= start && **t <= end)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of the entries falling in the calendar year `year`
    pub fn indices_in_year(&self, year: i32) -> Vec<usize> {
        self.times
            .iter()
            .enumerate()
            .filter(|(_, t)| t.year == year)
            .map(|(i, _)| i)
            .collect()
    }

    /// Element-wise mean of the entries at `indices`, `None` if `indices` is empty
    ///
    /// Missing (non-finite) cells are skipped, see [`finite_mean`].
    pub fn mean_of(&self, indices: &[usize]) -> Option<Field> {
        if indices.is_empty() {
            return None;
        }
        let mean = finite_mean(
            self.grid.shape(),
            indices.iter().map(|&i| self.values.index_axis(Axis(0), i)),
        );
        Field::new(Arc::clone(&self.grid), mean).ok()
    }

    /// Keep only the entries at `indices` (which must be sorted)
    pub fn retain_indices(&self, indices: &[usize]) -> FusionResult<MonthlySeries> {
        MonthlySeries::new(
            Arc::clone(&self.grid),
            indices.iter().map(|&i| self.times[i]).collect(),
            self.values.select(Axis(0), indices),
            self.semantics,
            self.unit,
        )
    }

    /// Keep only the given latitude rows, relabelling the series with `grid`
    pub fn select_latitudes(
        &self,
        indices: &[usize],
        grid: Arc<LatLonGrid>,
    ) -> FusionResult<MonthlySeries> {
        MonthlySeries::new(
            grid,
            self.times.clone(),
            self.values.select(Axis(1), indices),
            self.semantics,
            self.unit,
        )
    }
}

/// Per-calendar-month reference fields of an observational product
#[derive(Clone, Debug, Serialize)]
pub struct Climatology {
    grid: Arc<LatLonGrid>,
    /// `(month, latitude, longitude)`
    values: Array3<FloatValue>,
    unit: TemperatureUnit,
}

impl Climatology {
    /// Create a climatology from a `(month, latitude, longitude)` array with 12 months
    pub fn new(
        grid: Arc<LatLonGrid>,
        values: Array3<FloatValue>,
        unit: TemperatureUnit,
    ) -> FusionResult<Self> {
        let (n_lat, n_lon) = grid.shape();
        if values.dim().0 != MONTHS_PER_YEAR {
            return Err(FusionError::InvalidClimatology(format!(
                "expected {} months, got {}",
                MONTHS_PER_YEAR,
                values.dim().0
            )));
        }
        if (values.dim().1, values.dim().2) != (n_lat, n_lon) {
            return Err(FusionError::ShapeMismatch {
                what: "climatology".to_string(),
                expected: vec![MONTHS_PER_YEAR, n_lat, n_lon],
                actual: values.shape().to_vec(),
            });
        }
        Ok(Self { grid, values, unit })
    }

    /// Create a climatology from an array in its native dimension order
    pub fn from_native(
        grid: Arc<LatLonGrid>,
        values: Array3<FloatValue>,
        dims: [&str; 3],
        unit: TemperatureUnit,
    ) -> FusionResult<Self> {
        Self::new(grid, to_canonical_order(values, dims)?, unit)
    }

    pub fn grid(&self) -> &Arc<LatLonGrid> {
        &self.grid
    }

    pub fn values(&self) -> ArrayView3<'_, FloatValue> {
        self.values.view()
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    /// Keep only the given latitude rows, relabelling the climatology with `grid`
    pub fn select_latitudes(
        &self,
        indices: &[usize],
        grid: Arc<LatLonGrid>,
    ) -> FusionResult<Climatology> {
        Climatology::new(grid, self.values.select(Axis(1), indices), self.unit)
    }
}
