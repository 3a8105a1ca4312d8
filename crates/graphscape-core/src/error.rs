use thiserror::Error;

/// Invalid layout configuration. Graph-shape problems are never reported here;
/// they are absorbed by the engine with a defined fallback.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid dimensions: {0} (expected 2 or 3)")]
    InvalidDimensions(u8),
    #[error("Invalid Barnes-Hut theta: {0}")]
    InvalidTheta(f32),
    #[error("Invalid size range: min {min} is greater than max {max}")]
    InvalidSizeRange { min: f32, max: f32 },
    #[error("Invalid value for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("Sizing type 'attribute' requires a sizing attribute")]
    MissingSizingAttribute,
    #[error("Custom layout mode requires a position provider")]
    MissingPositionProvider,
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}
