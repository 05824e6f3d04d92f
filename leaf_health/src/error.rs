// THEORY:
// Errors are deliberately few. The classifier only fails when it is handed
// something that is not an image (zero-sized, or a byte buffer that does not
// match its declared dimensions) or a configuration that cannot describe a
// valid pipeline. An image with no visible leaf is *not* an error: it flows
// through the normal path and usually lands in the "unhealthy" branch.

use thiserror::Error;

/// Everything `classify` and friends can return as a failure.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("image dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected} for packed RGB")]
    PixelDataLength { expected: usize, actual: usize },

    #[error("invalid classifier configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("batch worker pool is no longer accepting work")]
    WorkerPoolClosed,
}

/// Problems found while loading or validating a `ClassifierConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} percentile must lie in [0, 100], got {value}")]
    Percentile { name: &'static str, value: f64 },

    #[error("tile grid size must be at least 1")]
    ZeroGridSize,

    #[error("tile grid size {grid_size} exceeds max_side {max_side}")]
    GridTooFine { grid_size: u32, max_side: u32 },

    #[error("max_side must be at least 1")]
    ZeroMaxSide,

    #[error("{name} hue band is inverted: {low} > {high}")]
    InvertedHueBand { name: &'static str, low: u8, high: u8 },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("could not read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by an external actuator. Never affects the classification.
#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("{actuator} is unavailable: {reason}")]
    Unavailable { actuator: String, reason: String },

    #[error("{actuator} rejected command '{command}': {reason}")]
    Rejected {
        actuator: String,
        command: String,
        reason: String,
    },
}
