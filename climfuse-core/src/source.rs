//! Collaborators supplying input datasets and consuming the output cube
//!
//! Dataset I/O lives outside this crate. A reader implements [`ObservationalSource`] and
//! [`ProjectionCatalog`]; a writer implements [`CubeWriter`]. The in-memory
//! implementations here back the tests and small embedded runs.

use crate::errors::{FusionError, FusionResult};
use crate::normalize::NormalizedCube;
use crate::timeseries::{Climatology, MonthlySeries};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifies one projection dataset
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceKey {
    pub model: String,
    pub scenario: String,
}

impl SourceKey {
    pub fn new(model: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
        }
    }
}

/// Renders the dataset name, e.g. `tas_CESM2_ssp245_mon`
impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tas_{}_{}_mon", self.model, self.scenario)
    }
}

/// The observational product
pub trait ObservationalSource: Sync {
    /// Monthly series over `(time, latitude, longitude)`
    fn series(&self) -> FusionResult<MonthlySeries>;

    /// Per-calendar-month reference fields on the same grid as [`Self::series`]
    fn climatology(&self) -> FusionResult<Climatology>;
}

/// The set of projection datasets
pub trait ProjectionCatalog: Sync {
    /// Open the dataset for `key`
    ///
    /// `Ok(None)` means no such dataset exists, which is expected for models that did not
    /// run every scenario. A dataset that exists but cannot be read is an error.
    fn open(&self, key: &SourceKey) -> FusionResult<Option<MonthlySeries>>;
}

/// Receives the finished cube
pub trait CubeWriter {
    fn write(&mut self, cube: &NormalizedCube) -> FusionResult<()>;
}

/// Observational data held in memory
#[derive(Clone, Debug)]
pub struct MemoryObservations {
    series: MonthlySeries,
    climatology: Climatology,
}

impl MemoryObservations {
    /// Both inputs must be defined on equivalent grids
    pub fn new(series: MonthlySeries, climatology: Climatology) -> FusionResult<Self> {
        if !series.grid().equivalent(climatology.grid()) {
            return Err(FusionError::GridMismatch {
                context: format!(
                    "observational series grid {:?} differs from climatology grid {:?}",
                    series.grid().shape(),
                    climatology.grid().shape()
                ),
            });
        }
        Ok(Self {
            series,
            climatology,
        })
    }
}

impl ObservationalSource for MemoryObservations {
    fn series(&self) -> FusionResult<MonthlySeries> {
        Ok(self.series.clone())
    }

    fn climatology(&self) -> FusionResult<Climatology> {
        Ok(self.climatology.clone())
    }
}

/// Projection datasets held in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    entries: HashMap<SourceKey, MonthlySeries>,
    unreadable: HashMap<SourceKey, String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SourceKey, series: MonthlySeries) -> &mut Self {
        self.unreadable.remove(&key);
        self.entries.insert(key, series);
        self
    }

    /// Register `key` as present but failing to open with `reason`
    pub fn insert_unreadable(&mut self, key: SourceKey, reason: impl Into<String>) -> &mut Self {
        self.entries.remove(&key);
        self.unreadable.insert(key, reason.into());
        self
    }

    /// Keys of every registered dataset, readable or not
    pub fn keys(&self) -> HashSet<&SourceKey> {
        self.entries.keys().chain(self.unreadable.keys()).collect()
    }
}

impl ProjectionCatalog for MemoryCatalog {
    fn open(&self, key: &SourceKey) -> FusionResult<Option<MonthlySeries>> {
        if let Some(reason) = self.unreadable.get(key) {
            return Err(FusionError::SourceUnreadable {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.entries.get(key).cloned())
    }
}

/// Keeps the last cube handed to it
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub cube: Option<NormalizedCube>,
}

impl CubeWriter for MemoryWriter {
    fn write(&mut self, cube: &NormalizedCube) -> FusionResult<()> {
        self.cube = Some(cube.clone());
        Ok(())
    }
}
