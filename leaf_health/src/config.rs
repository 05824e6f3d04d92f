// THEORY:
// Every number the classifier compares against lives here. The defaults are the
// empirically calibrated constants the pipeline was tuned with; changing any of
// them changes classifications, so they are grouped per pipeline stage and
// validated before use rather than scattered through the stages as literals.

use crate::error::ConfigError;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resampling filter used when the preprocessor shrinks an oversized photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl ResampleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Bilinear => FilterType::Triangle,
            ResampleFilter::Bicubic => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Longest side, in pixels, the working image may have.
    pub max_side: u32,
    pub filter: ResampleFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_side: 512,
            filter: ResampleFilter::Bicubic,
        }
    }
}

/// An inclusive band on the 0..=255 hue proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueBand {
    pub low: u8,
    pub high: u8,
}

impl HueBand {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn contains(&self, hue: u8) -> bool {
        hue >= self.low && hue <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Percentile of the whole-image exG distribution a pixel must exceed.
    pub exg_percentile: f64,
    /// Saturation and value must both be strictly above these.
    pub min_saturation: u8,
    pub min_value: u8,
    /// Highlights at or above this value are dropped from the leaf.
    pub max_value: u8,
    /// Second, looser saturation gate removing fully desaturated pixels.
    pub refine_min_saturation: u8,
    pub green_hue: HueBand,
    pub yellow_hue: HueBand,
    /// Red/brown wraps around the hue circle: `hue <= red_hue_low || hue >= red_hue_high`.
    pub red_hue_low: u8,
    pub red_hue_high: u8,
    /// Yellow or red pixels darker than this count as necrotic.
    pub necrosis_max_value: u8,
    /// Use `exg >= threshold` when a flat exG distribution leaves no pixel strictly above it.
    pub inclusive_on_tie: bool,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            exg_percentile: 60.0,
            min_saturation: 25,
            min_value: 25,
            max_value: 240,
            refine_min_saturation: 15,
            green_hue: HueBand::new(42, 120),
            yellow_hue: HueBand::new(21, 42),
            red_hue_low: 12,
            red_hue_high: 230,
            necrosis_max_value: 70,
            inclusive_on_tie: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    pub edge_percentile: f64,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            edge_percentile: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Tiles per side; the image is split into `grid_size * grid_size` tiles.
    pub grid_size: u32,
    /// Tiles with fewer leaf pixels than this are ignored.
    pub min_leaf_pixels: u64,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            grid_size: 3,
            min_leaf_pixels: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub healthy_min_green: f64,
    pub healthy_max_stress: f64,
    /// Strict upper bound: `edge_ratio < healthy_max_edge`.
    pub healthy_max_edge: f64,
    pub moderate_min_green: f64,
    pub moderate_max_stress: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            healthy_min_green: 0.72,
            healthy_max_stress: 0.18,
            healthy_max_edge: 0.35,
            moderate_min_green: 0.45,
            moderate_max_stress: 0.50,
        }
    }
}

/// Configuration for the whole classifier, one section per pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub preprocess: PreprocessConfig,
    pub mask: MaskConfig,
    pub texture: TextureConfig,
    pub tiles: TileConfig,
    pub decision: DecisionConfig,
}

impl ClassifierConfig {
    /// Parses a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ClassifierConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preprocess.max_side == 0 {
            return Err(ConfigError::ZeroMaxSide);
        }
        check_percentile("exg", self.mask.exg_percentile)?;
        check_percentile("edge", self.texture.edge_percentile)?;
        if self.tiles.grid_size == 0 {
            return Err(ConfigError::ZeroGridSize);
        }
        // More tiles per side than working pixels per side leaves empty tiles.
        if self.tiles.grid_size > self.preprocess.max_side {
            return Err(ConfigError::GridTooFine {
                grid_size: self.tiles.grid_size,
                max_side: self.preprocess.max_side,
            });
        }
        for (name, band) in [("green", self.mask.green_hue), ("yellow", self.mask.yellow_hue)] {
            if band.low > band.high {
                return Err(ConfigError::InvertedHueBand {
                    name,
                    low: band.low,
                    high: band.high,
                });
            }
        }
        Ok(())
    }
}

fn check_percentile(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Percentile { name, value })
    }
}
