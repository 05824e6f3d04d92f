// THEORY:
// The `pipeline` module is the top-level API of the classifier. It wires the
// stages together in their only valid order and packages the outcome:
//
//   PixelGrid -> LeafMasks -> TextureEstimate -> TileAggregate -> Decision
//
// Data flows strictly forward; no stage reaches back into an earlier one. The
// whole thing is a pure function of (image, config): no clock, no randomness,
// no shared state, so two calls on the same pixels give bit-identical results
// and any number of calls may run on different threads at once.

use crate::config::ClassifierConfig;
use crate::core_modules::decision::{DecisionInput, decide};
use crate::core_modules::grid_manager::GridManager;
use crate::core_modules::leaf_mask::LeafMasks;
use crate::core_modules::pixel_grid::PixelGrid;
use crate::core_modules::texture;
use crate::error::ClassifyError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use crate::core_modules::decision::HealthLabel;

/// Supporting numbers behind a classification, each ratio rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub green_ratio: f64,
    pub yellow_ratio: f64,
    pub necrosis_ratio: f64,
    pub stress_ratio: f64,
    pub edge_ratio: f64,
    /// Leaf-mask population behind the ratios, at least 1.
    pub pixels: u64,
}

/// The classifier's output for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "class")]
    pub label: HealthLabel,
    /// In [0, 1], rounded to 3 decimals.
    pub confidence: f64,
    pub metrics: HealthMetrics,
}

/// A classifier bound to a validated configuration.
#[derive(Debug, Clone, Default)]
pub struct LeafClassifier {
    config: ClassifierConfig,
}

impl LeafClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(&self, image: &RgbImage) -> Result<ClassificationResult, ClassifyError> {
        let grid = PixelGrid::from_image(image, &self.config.preprocess)?;
        Ok(self.classify_grid(&grid))
    }

    pub fn classify_raw(
        &self,
        width: u32,
        height: u32,
        bytes: &[u8],
    ) -> Result<ClassificationResult, ClassifyError> {
        let grid = PixelGrid::from_raw(width, height, bytes, &self.config.preprocess)?;
        Ok(self.classify_grid(&grid))
    }

    /// Runs stages 2-5 on an already preprocessed grid.
    pub fn classify_grid(&self, grid: &PixelGrid) -> ClassificationResult {
        let config = &self.config;
        debug!(width = grid.width(), height = grid.height(), "classifying leaf");

        // Stage 2: leaf and tissue masks
        let masks = LeafMasks::build(grid, &config.mask);
        let pixels = masks.total();

        // Stage 3: texture
        let texture = texture::estimate(grid, &masks.leaf, &config.texture);

        // Stage 4: tile medians, falling back to whole-image ratios
        let tiles = GridManager::new(grid.width(), grid.height(), &config.tiles);
        let aggregate = tiles.aggregate(&masks, masks.whole_image_ratios());
        let stress_ratio = aggregate.stress_ratio();

        // Stage 5: rules
        let decision = decide(
            DecisionInput {
                green_ratio: aggregate.ratios.green,
                stress_ratio,
                edge_ratio: texture.edge_ratio,
            },
            &config.decision,
        );
        debug!(
            label = %decision.label,
            confidence = decision.confidence,
            tiles_used = aggregate.tiles_used,
            "classification decided"
        );

        ClassificationResult {
            label: decision.label,
            confidence: round3(decision.confidence).clamp(0.0, 1.0),
            metrics: HealthMetrics {
                green_ratio: round3(aggregate.ratios.green),
                yellow_ratio: round3(aggregate.ratios.yellow),
                necrosis_ratio: round3(aggregate.ratios.necrosis),
                stress_ratio: round3(stress_ratio),
                edge_ratio: round3(texture.edge_ratio),
                pixels,
            },
        }
    }
}

/// Classifies with the default configuration.
pub fn classify(image: &RgbImage) -> Result<ClassificationResult, ClassifyError> {
    LeafClassifier::default().classify(image)
}

pub fn classify_with_config(
    image: &RgbImage,
    config: &ClassifierConfig,
) -> Result<ClassificationResult, ClassifyError> {
    LeafClassifier::new(config.clone())?.classify(image)
}

pub fn classify_raw(
    width: u32,
    height: u32,
    bytes: &[u8],
    config: &ClassifierConfig,
) -> Result<ClassificationResult, ClassifyError> {
    LeafClassifier::new(config.clone())?.classify_raw(width, height, bytes)
}

/// Rounds to 3 decimals on the exact binary value, ties to even.
///
/// Going through the decimal formatter rather than `(x * 1000.0).round()`
/// avoids the extra rounding step of the multiply.
pub fn round3(value: f64) -> f64 {
    format!("{value:.3}").parse().unwrap_or(value)
}
