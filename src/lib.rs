//! Fuse observational and projected gridded temperature datasets into one anomaly cube
//!
//! The cube is indexed by model, scenario, year, longitude and latitude. Observations
//! are written as annual means on their native grid (cropped to the models' latitude
//! band), and every projection model contributes annual anomalies against its own
//! 1951-1980 baseline, reprojected onto that grid. Combinations without source data hold
//! a fixed sentinel.
//!
//! Dataset I/O is supplied by the caller through the [`source`] traits.
//!
//! ```rust
//! use climfuse::prelude::*;
//!
//! let config = FusionConfig::from_toml_str(r#"
//!     models = ["Berkeley-Earth", "CESM2"]
//!     scenarios = ["historical", "ssp245"]
//! "#).unwrap();
//! let pipeline = FusionBuilder::new().with_config(config).build().unwrap();
//! assert_eq!(pipeline.config().year_end, 2100);
//! ```

pub use ndarray;

pub use climfuse_core::{
    aggregation, baseline, calendar, config, cube, errors, grid_transform, normalize,
    output_variables, pipeline, reference_grid, source, spatial, timeseries, variable,
};

pub mod prelude {
    pub use climfuse_core::config::FusionConfig;
    pub use climfuse_core::errors::{FusionError, FusionResult};
    pub use climfuse_core::grid_transform::{NearestRegridder, Regridder};
    pub use climfuse_core::normalize::NormalizedCube;
    pub use climfuse_core::pipeline::{FusionBuilder, FusionOutput, FusionPipeline, RunReport};
    pub use climfuse_core::source::{
        CubeWriter, MemoryCatalog, MemoryObservations, ObservationalSource, ProjectionCatalog,
        SourceKey,
    };
    pub use climfuse_core::spatial::{Field, LatLonGrid};
    pub use climfuse_core::timeseries::{
        Climatology, MonthlySeries, SeriesSemantics, TemperatureUnit, Timestamp,
    };
}
