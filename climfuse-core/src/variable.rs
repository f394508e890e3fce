//! Metadata for the variables written to the output cube
//!
//! Output variables are declared at compile time with [`define_static_variable!`] and
//! turned into owned [`VariableMetadata`] when a cube is normalised, at which point the
//! run's fill value is attached.
//!
//! ```rust
//! use climfuse_core::output_variables::VAR_ANOMALY;
//!
//! assert_eq!(VAR_ANOMALY.name, "anomaly");
//! assert_eq!(
//!     VAR_ANOMALY.dims,
//!     &["model", "scenario", "year", "longitude", "latitude"]
//! );
//! ```

use serde::Serialize;

/// Static variable definition holder for compile-time declaration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StaticVariableDefinition {
    /// Variable name in the output dataset
    pub name: &'static str,
    pub long_name: &'static str,
    pub unit: &'static str,
    /// Dimension names in output order
    pub dims: &'static [&'static str],
}

impl StaticVariableDefinition {
    pub const fn new(
        name: &'static str,
        long_name: &'static str,
        unit: &'static str,
        dims: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            long_name,
            unit,
            dims,
        }
    }

    /// Owned metadata carrying the fill value of a particular run
    pub fn to_metadata(&self, fill_value: f32) -> VariableMetadata {
        VariableMetadata {
            name: self.name.to_string(),
            long_name: self.long_name.to_string(),
            unit: self.unit.to_string(),
            dims: self.dims.iter().map(|d| d.to_string()).collect(),
            fill_value,
        }
    }
}

/// Attributes written alongside an output variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableMetadata {
    pub name: String,
    pub long_name: String,
    /// Written as the `units` attribute
    pub unit: String,
    pub dims: Vec<String>,
    /// Written as the `_FillValue` attribute
    #[serde(rename = "_FillValue")]
    pub fill_value: f32,
}

/// Macro for declaring output variables with static strings.
///
/// # Usage
///
/// ```rust
/// use climfuse_core::define_static_variable;
///
/// define_static_variable!(
///     MY_VARIABLE,
///     name = "my_variable",
///     long_name = "A test variable",
///     unit = "K",
///     dims = ["model", "longitude", "latitude"],
/// );
///
/// assert_eq!(MY_VARIABLE.dims.len(), 3);
/// ```
#[macro_export]
macro_rules! define_static_variable {
    (
        $var_name:ident,
        name = $name:expr,
        long_name = $long_name:expr,
        unit = $unit:expr,
        dims = [$($dim:expr),+ $(,)?] $(,)?
    ) => {
        #[doc = concat!("Static variable definition for `", $name, "`")]
        pub static $var_name: $crate::variable::StaticVariableDefinition =
            $crate::variable::StaticVariableDefinition::new(
                $name,
                $long_name,
                $unit,
                &[$($dim),+],
            );
    };
}

pub use crate::define_static_variable;
