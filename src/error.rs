use thiserror::Error;

/// Validation failure for a polar file, one variant per code in the
/// weatherrouting polar-file format.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarError {
    #[error("EMPTY_FILE")]
    EmptyFile,
    #[error("WIND_SPEED_NOT_NUMERIC")]
    WindSpeedNotNumeric,
    #[error("WIND_SPEEDS_NOT_INCREASING")]
    WindSpeedsNotIncreasing,
    #[error("EMPTY_LINE")]
    EmptyLine,
    #[error("COLUMN_COUNT_MISMATCH")]
    ColumnCountMismatch,
    #[error("TWA_OUT_OF_RANGE")]
    TwaOutOfRange,
    #[error("TWA_NOT_NUMERIC")]
    TwaNotNumeric,
    #[error("EMPTY_VALUE")]
    EmptyValue,
    #[error("NEGATIVE_SPEED")]
    NegativeSpeed,
    #[error("SPEED_NOT_NUMERIC")]
    SpeedNotNumeric,
}

/// Errors surfaced by the routing driver and kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// The wind oracle returned `None` mid-step after the router's own
    /// pre-check (out-of-scope fallback) failed to catch it.
    #[error("no wind data available at the requested time/position")]
    NoWind,
    /// `RouterParams::set` was called with an unknown parameter code.
    #[error("unknown router parameter: {0}")]
    InvalidParam(String),
}
