use thiserror::Error;

/// Error type for the fusion pipeline.
///
/// Every variant is fatal. Expected gaps in the inputs (a scenario source that does not
/// exist, a year with no matching months) are expressed as `Ok(None)`/`None` by the
/// functions that encounter them and never surface here.
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("{0}")]
    Error(String),
    #[error("Malformed coordinate `{name}`: {reason}")]
    MalformedCoordinate { name: String, reason: String },
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Timestamps must be unique and non-decreasing: {previous} is followed by {next}")]
    UnorderedTimestamps { previous: String, next: String },
    #[error("Fields are defined on different grids ({context})")]
    GridMismatch { context: String },
    #[error("Unable to resolve the reference grid: {0}")]
    ReferenceGridUnresolvable(String),
    #[error("No monthly fields for {model} between {start} and {end}")]
    EmptyBaselinePeriod {
        model: String,
        start: String,
        end: String,
    },
    #[error("Invalid climatology: {0}")]
    InvalidClimatology(String),
    #[error("Historical source {key} is required to compute the baseline but was not found")]
    MissingHistorical { key: String },
    #[error("Source {key} exists but could not be read: {reason}")]
    SourceUnreadable { key: String, reason: String },
    #[error("Unknown dimension `{0}`. Expected one of time, lat/latitude or lon/longitude")]
    UnknownDimension(String),
    #[error("Invalid time encoding: {0}")]
    InvalidTimeEncoding(String),
    #[error("Unsupported calendar `{0}`")]
    UnsupportedCalendar(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Cube cell ({model}, {scenario}, {year}) has already been written")]
    CellAlreadyWritten {
        model: String,
        scenario: String,
        year: i32,
    },
    #[error("Baseline for {model} has already been written")]
    BaselineAlreadyWritten { model: String },
    #[error("Unknown {axis} label `{label}`")]
    UnknownLabel { axis: String, label: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Convenience type for `Result<T, FusionError>`.
pub type FusionResult<T> = Result<T, FusionError>;
