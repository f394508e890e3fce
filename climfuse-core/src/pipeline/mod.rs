//! The fusion pipeline assembles every source into one anomaly cube.
//!
//! A run proceeds in a fixed order:
//!
//! 1. The reference grid is resolved from the observational grid and the grid model's
//!    historical grid.
//! 2. The observational series is cropped onto the reference grid, its incomplete trailing
//!    year is dropped, and its annual means are written under the historical scenario.
//! 3. Each projection model's baseline is computed from its historical source and kept in
//!    a [`ModelContext`].
//! 4. For every scenario source that exists, each annual mean has the native baseline
//!    subtracted and the resulting anomaly is regridded onto the reference grid.
//!
//! Models are independent of each other and can be computed on the rayon thread pool.
//! Results are written into the cube by a single owner once every model has finished, so
//! a failed run never produces partial output.
//!
//! ```rust
//! use climfuse_core::pipeline::FusionBuilder;
//!
//! let pipeline = FusionBuilder::new()
//!     .with_models(&["Berkeley-Earth", "CESM2"])
//!     .with_scenarios(&["historical", "ssp245"])
//!     .with_years(1850, 2030)
//!     .build()
//!     .unwrap();
//! assert_eq!(pipeline.config().grid_model, "CESM2");
//! ```

mod builder;
mod context;
mod runtime;
mod validation;

#[cfg(test)]
mod tests;

pub use builder::FusionBuilder;
pub use context::ModelContext;
pub use runtime::{FusionOutput, FusionPipeline, RunReport};
