pub mod aggregation;
pub mod baseline;
pub mod calendar;
pub mod config;
pub mod cube;
pub mod grid_transform;
pub mod normalize;
pub mod output_variables;
pub mod pipeline;
pub mod reference_grid;
pub mod source;
pub mod spatial;
pub mod timeseries;
pub mod variable;

pub mod errors;
