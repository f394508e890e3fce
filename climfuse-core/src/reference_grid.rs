//! Resolution of the reference grid shared by every output field
//!
//! The reference grid keeps the observational product's native resolution, cropped to the
//! latitude band covered by the projection models. Observational grids commonly reach the
//! poles while model grids stop at the centre of their last row, so rows poleward of the
//! southernmost model latitude carry no model information and are dropped.

use crate::errors::{FusionError, FusionResult};
use crate::spatial::{Field, LatLonGrid};
use crate::timeseries::{Climatology, MonthlySeries};
use log::info;
use std::sync::Arc;

/// The reference grid and the observational rows it retains
#[derive(Clone, Debug)]
pub struct ReferenceGrid {
    grid: Arc<LatLonGrid>,
    /// Indices into the observational latitude vector, in their original order
    latitude_indices: Vec<usize>,
}

impl ReferenceGrid {
    /// Derive the reference grid from the observational and one projection grid
    ///
    /// Keeps every observational latitude `>= min(projection latitude)`. Fails if the
    /// projection's latitude range does not overlap the observational range at all, or if
    /// no observational latitude survives the crop.
    pub fn resolve(observational: &LatLonGrid, projection: &LatLonGrid) -> FusionResult<Self> {
        let obs_lat = observational.latitude();
        let proj_lat = projection.latitude();

        if proj_lat.max() < obs_lat.min() || proj_lat.min() > obs_lat.max() {
            return Err(FusionError::ReferenceGridUnresolvable(format!(
                "projection latitudes [{}, {}] lie outside observational latitudes [{}, {}]",
                proj_lat.min(),
                proj_lat.max(),
                obs_lat.min(),
                obs_lat.max()
            )));
        }

        let min_lat = proj_lat.min();
        let latitude_indices: Vec<usize> = obs_lat
            .values()
            .iter()
            .enumerate()
            .filter(|(_, lat)| **lat >= min_lat)
            .map(|(i, _)| i)
            .collect();

        if latitude_indices.is_empty() {
            return Err(FusionError::ReferenceGridUnresolvable(format!(
                "no observational latitude is >= {}",
                min_lat
            )));
        }

        let grid = observational.select_latitudes(&latitude_indices)?;
        info!(
            "Resolved reference grid: {} latitudes (cropped {} below {}) x {} longitudes",
            grid.latitude().len(),
            obs_lat.len() - latitude_indices.len(),
            min_lat,
            grid.longitude().len()
        );

        Ok(Self {
            grid: Arc::new(grid),
            latitude_indices,
        })
    }

    pub fn grid(&self) -> &Arc<LatLonGrid> {
        &self.grid
    }

    pub fn latitude_indices(&self) -> &[usize] {
        &self.latitude_indices
    }

    /// Crop an observational field onto the reference grid
    pub fn crop_field(&self, field: &Field) -> FusionResult<Field> {
        field.select_latitudes(&self.latitude_indices, Arc::clone(&self.grid))
    }

    /// Crop an observational series onto the reference grid
    pub fn crop_series(&self, series: &MonthlySeries) -> FusionResult<MonthlySeries> {
        series.select_latitudes(&self.latitude_indices, Arc::clone(&self.grid))
    }

    /// Crop an observational climatology onto the reference grid
    pub fn crop_climatology(&self, climatology: &Climatology) -> FusionResult<Climatology> {
        climatology.select_latitudes(&self.latitude_indices, Arc::clone(&self.grid))
    }
}
