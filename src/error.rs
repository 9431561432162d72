use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LabelError {
    #[error("label height must be positive, got {0}mm")]
    NonPositiveHeight(f64),

    #[error("label width must be positive, got {0}mm")]
    NonPositiveWidth(f64),

    #[error("label dimensions must be finite, got {height_mm}x{width_mm}")]
    NotFinite { height_mm: f64, width_mm: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
