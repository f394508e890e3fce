//! Reprojection of fields between latitude/longitude grids
//!
//! Regridding is expressed through the [`Regridder`] trait so that the pipeline does not
//! depend on a particular interpolation scheme. Implementations are serialisable trait
//! objects, which lets a run configuration select one by name:
//!
//! ```toml
//! [regridder]
//! method = "Nearest"
//! periodic_longitude = true
//! ```
//!
//! The only implementation provided is [`NearestRegridder`], which picks the nearest source
//! coordinate independently along each axis.

use crate::errors::FusionResult;
use crate::spatial::{Coordinate, Field, LatLonGrid};
use crate::timeseries::FloatValue;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reprojects a field onto another grid
///
/// Implementations must be total: a target grid that extends beyond the source coverage
/// is not an error.
#[typetag::serde(tag = "method")]
pub trait Regridder: std::fmt::Debug + Send + Sync {
    /// Reproject `field` onto `target`
    fn regrid(&self, field: &Field, target: &Arc<LatLonGrid>) -> FusionResult<Field>;
}

/// Nearest-neighbour lookup along each axis
///
/// For every target coordinate the source index with the smallest distance is used; exact
/// midpoint ties resolve to the smaller index. Targets beyond the source coverage take the
/// nearest edge value.
///
/// When `periodic_longitude` is set, longitude distances are measured on the circle so that
/// a `-180..180` grid and a `0..360` grid are matched correctly.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use climfuse_core::grid_transform::{NearestRegridder, Regridder};
/// use climfuse_core::spatial::{Field, LatLonGrid};
/// use ndarray::array;
///
/// let source = Arc::new(LatLonGrid::from_vecs(vec![-45.0, 45.0], vec![0.0, 180.0]).unwrap());
/// let target = Arc::new(LatLonGrid::from_vecs(vec![-50.0, -10.0, 80.0], vec![-90.0]).unwrap());
/// let field = Field::new(source, array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
///
/// let regridded = NearestRegridder::default().regrid(&field, &target).unwrap();
/// // -90 degrees is 90 from both 0 and 180, so the tie goes to index 0
/// assert_eq!(regridded.values(), array![[1.0], [1.0], [3.0]]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearestRegridder {
    pub periodic_longitude: bool,
}

impl Default for NearestRegridder {
    fn default() -> Self {
        Self {
            periodic_longitude: true,
        }
    }
}

impl NearestRegridder {
    pub fn new(periodic_longitude: bool) -> Self {
        Self { periodic_longitude }
    }
}

fn planar_distance(a: FloatValue, b: FloatValue) -> FloatValue {
    (a - b).abs()
}

fn circular_distance(a: FloatValue, b: FloatValue) -> FloatValue {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// For every target value, the index of the nearest source value
///
/// The scan keeps the first minimum, so ties resolve to the smallest index.
pub fn nearest_indices(
    source: &Coordinate,
    target: &Coordinate,
    distance: fn(FloatValue, FloatValue) -> FloatValue,
) -> Vec<usize> {
    let source = source.values();
    target
        .values()
        .iter()
        .map(|&t| {
            let mut best = 0;
            let mut best_distance = FloatValue::INFINITY;
            for (i, &s) in source.iter().enumerate() {
                let d = distance(s, t);
                if d < best_distance {
                    best = i;
                    best_distance = d;
                }
            }
            best
        })
        .collect()
}

/// True if a field on `source` must be reprojected to live on `target`
pub fn needs_regrid(source: &LatLonGrid, target: &LatLonGrid) -> bool {
    !source.equivalent(target)
}

#[typetag::serde(name = "Nearest")]
impl Regridder for NearestRegridder {
    fn regrid(&self, field: &Field, target: &Arc<LatLonGrid>) -> FusionResult<Field> {
        if !needs_regrid(field.grid(), target) {
            return Field::new(Arc::clone(target), field.values().to_owned());
        }

        let source = field.grid();
        let rows = nearest_indices(source.latitude(), target.latitude(), planar_distance);
        let lon_distance: fn(FloatValue, FloatValue) -> FloatValue = if self.periodic_longitude {
            circular_distance
        } else {
            planar_distance
        };
        let columns = nearest_indices(source.longitude(), target.longitude(), lon_distance);

        let values = field
            .values()
            .select(Axis(0), &rows)
            .select(Axis(1), &columns);
        Field::new(Arc::clone(target), values)
    }
}
