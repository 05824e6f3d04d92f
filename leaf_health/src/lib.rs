// THEORY:
// This file is the main entry point for the `leaf_health` library crate. It
// exposes a single high-level operation, "classify this leaf photo", together
// with the small set of types that describe its result and its tuning knobs.
//
// The stage modules under `core_modules` stay public so that callers can reuse
// individual stages (for instance the leaf mask on its own), but everything a
// typical consumer needs is re-exported at the crate root.

pub mod actuation;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::ClassifierConfig;
pub use error::{ActuationError, ClassifyError, ConfigError};
pub use parallel_pipeline::BatchClassifier;
pub use pipeline::{
    ClassificationResult, HealthLabel, HealthMetrics, LeafClassifier, classify, classify_raw,
    classify_with_config,
};
