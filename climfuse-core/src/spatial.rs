//! Rectilinear latitude/longitude grids and the 2-D fields defined on them
//!
//! This module provides the geometric building blocks shared by every stage of the
//! fusion pipeline:
//!
//! - [`Coordinate`]: a named, strictly monotonic coordinate vector
//! - [`LatLonGrid`]: a pair of latitude and longitude coordinates
//! - [`Field`]: a `(latitude, longitude)` array tagged with the grid it lives on
//!
//! Grids are shared between fields as `Arc<LatLonGrid>` so that a monthly series or a
//! whole cube slice does not duplicate its coordinate vectors.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use climfuse_core::spatial::{Coordinate, Field, LatLonGrid};
//! use ndarray::array;
//!
//! let grid = LatLonGrid::new(
//!     Coordinate::from_vec("latitude", vec![-45.0, 45.0]).unwrap(),
//!     Coordinate::from_vec("longitude", vec![0.0, 120.0, 240.0]).unwrap(),
//! );
//! assert_eq!(grid.shape(), (2, 3));
//!
//! let field = Field::new(
//!     Arc::new(grid),
//!     array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
//! )
//! .unwrap();
//! assert_eq!(field.values()[[1, 2]], 6.0);
//! ```

use crate::errors::{FusionError, FusionResult};
use crate::timeseries::FloatValue;
use is_close::is_close;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use std::sync::Arc;

/// A named one-dimensional coordinate vector
///
/// Values are finite and strictly monotonic, either ascending or descending.
/// Both orientations occur in practice: most model output stores latitude south to north
/// while some observational products and all downstream map renderers expect north to south.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Coordinate {
    name: String,
    values: Array1<FloatValue>,
}

impl Coordinate {
    /// Create a coordinate, validating that it is non-empty, finite and strictly monotonic
    pub fn new(name: impl Into<String>, values: Array1<FloatValue>) -> FusionResult<Self> {
        let name = name.into();
        let malformed = |reason: String| FusionError::MalformedCoordinate {
            name: name.clone(),
            reason,
        };

        if values.is_empty() {
            return Err(malformed("coordinate has no values".to_string()));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(malformed(format!("non-finite value {}", v)));
        }
        if values.len() > 1 {
            let ascending = values[1] > values[0];
            let monotonic = values
                .windows(2)
                .into_iter()
                .all(|w| if ascending { w[1] > w[0] } else { w[1] < w[0] });
            if !monotonic {
                return Err(malformed("values are not strictly monotonic".to_string()));
            }
        }

        Ok(Self { name, values })
    }

    pub fn from_vec(name: impl Into<String>, values: Vec<FloatValue>) -> FusionResult<Self> {
        Self::new(name, Array1::from(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> ArrayView1<'_, FloatValue> {
        self.values.view()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false, a coordinate cannot be constructed without values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if the values increase with index (a single value counts as ascending)
    pub fn is_ascending(&self) -> bool {
        self.values.len() < 2 || self.values[1] > self.values[0]
    }

    pub fn min(&self) -> FloatValue {
        let (first, last) = self.endpoints();
        first.min(last)
    }

    pub fn max(&self) -> FloatValue {
        let (first, last) = self.endpoints();
        first.max(last)
    }

    fn endpoints(&self) -> (FloatValue, FloatValue) {
        (self.values[0], self.values[self.values.len() - 1])
    }

    /// Build a new coordinate from a subset of indices
    ///
    /// The indices must keep the values strictly monotonic.
    pub fn select(&self, indices: &[usize]) -> FusionResult<Self> {
        if let Some(i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(FusionError::MalformedCoordinate {
                name: self.name.clone(),
                reason: format!("index {} out of bounds for length {}", i, self.len()),
            });
        }
        Self::new(
            self.name.clone(),
            indices.iter().map(|&i| self.values[i]).collect(),
        )
    }

    /// Same length and values within floating point tolerance
    ///
    /// The name is ignored so that `lat` and `latitude` vectors compare equal.
    pub fn approx_eq(&self, other: &Coordinate) -> bool {
        self.len() == other.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(&a, &b)| is_close!(a, b))
    }
}

/// A rectilinear grid defined by latitude and longitude coordinate vectors
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LatLonGrid {
    latitude: Coordinate,
    longitude: Coordinate,
}

impl LatLonGrid {
    pub fn new(latitude: Coordinate, longitude: Coordinate) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Convenience constructor from raw vectors
    pub fn from_vecs(
        latitude: Vec<FloatValue>,
        longitude: Vec<FloatValue>,
    ) -> FusionResult<Self> {
        Ok(Self::new(
            Coordinate::from_vec("latitude", latitude)?,
            Coordinate::from_vec("longitude", longitude)?,
        ))
    }

    pub fn latitude(&self) -> &Coordinate {
        &self.latitude
    }

    pub fn longitude(&self) -> &Coordinate {
        &self.longitude
    }

    /// `(n_latitude, n_longitude)`
    pub fn shape(&self) -> (usize, usize) {
        (self.latitude.len(), self.longitude.len())
    }

    /// True if both coordinate vectors match within tolerance
    pub fn equivalent(&self, other: &LatLonGrid) -> bool {
        self.latitude.approx_eq(&other.latitude) && self.longitude.approx_eq(&other.longitude)
    }

    /// A grid with only the given latitude rows
    pub fn select_latitudes(&self, indices: &[usize]) -> FusionResult<Self> {
        Ok(Self::new(
            self.latitude.select(indices)?,
            self.longitude.clone(),
        ))
    }
}

/// A 2-D `(latitude, longitude)` field tagged with its grid
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Field {
    grid: Arc<LatLonGrid>,
    values: Array2<FloatValue>,
}

impl Field {
    /// Create a field; the array shape must match the grid exactly
    pub fn new(grid: Arc<LatLonGrid>, values: Array2<FloatValue>) -> FusionResult<Self> {
        let (n_lat, n_lon) = grid.shape();
        if values.dim() != (n_lat, n_lon) {
            return Err(FusionError::ShapeMismatch {
                what: "field".to_string(),
                expected: vec![n_lat, n_lon],
                actual: values.shape().to_vec(),
            });
        }
        Ok(Self { grid, values })
    }

    /// A field with every cell set to `value`
    pub fn filled(grid: Arc<LatLonGrid>, value: FloatValue) -> Self {
        let values = Array2::from_elem(grid.shape(), value);
        Self { grid, values }
    }

    pub fn grid(&self) -> &Arc<LatLonGrid> {
        &self.grid
    }

    pub fn values(&self) -> ArrayView2<'_, FloatValue> {
        self.values.view()
    }

    pub fn into_values(self) -> Array2<FloatValue> {
        self.values
    }

    /// Element-wise `self - other`
    ///
    /// Both fields must be defined on equivalent grids. Subtracting across grids would
    /// silently pair unrelated cells.
    pub fn subtract(&self, other: &Field) -> FusionResult<Field> {
        if !Arc::ptr_eq(&self.grid, &other.grid) && !self.grid.equivalent(&other.grid) {
            return Err(FusionError::GridMismatch {
                context: format!(
                    "cannot subtract a {:?} field from a {:?} field",
                    other.grid.shape(),
                    self.grid.shape()
                ),
            });
        }
        Ok(Field {
            grid: Arc::clone(&self.grid),
            values: &self.values - &other.values,
        })
    }

    /// Add a constant to every cell
    pub fn offset(mut self, delta: FloatValue) -> Field {
        self.values.mapv_inplace(|v| v + delta);
        self
    }

    /// Keep only the given latitude rows, relabelling the field with `grid`
    ///
    /// `grid` must be the result of [`LatLonGrid::select_latitudes`] called with the same
    /// indices.
    pub fn select_latitudes(
        &self,
        indices: &[usize],
        grid: Arc<LatLonGrid>,
    ) -> FusionResult<Field> {
        Field::new(grid, self.values.select(Axis(0), indices))
    }
}
