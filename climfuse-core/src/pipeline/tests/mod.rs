//! Orchestration tests for the fusion pipeline.
//!
//! These run the full pipeline over small synthetic inputs (see [`fixtures`]) and check
//! what lands in the cube.

#[cfg(test)]
mod observational;
