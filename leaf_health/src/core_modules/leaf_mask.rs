// THEORY:
// The mask builder decides which pixels are leaf and, within the leaf, which
// tissue class each pixel looks like. It is the most threshold-heavy stage.
//
// 1.  **Adaptive vegetation gate**: the excess-green index is compared against a
//     percentile of its own distribution over the *whole* image, so the gate
//     follows each photo's lighting and background instead of a fixed constant.
// 2.  **Color gates**: saturation and value must clear a floor (no gray
//     background, no shadows); highlights and nearly desaturated pixels are
//     then trimmed away.
// 3.  **Hue bands**: green, yellow and a wrap-around red/brown band split the leaf.
//     The green and yellow bands share their boundary hue, so a pixel on it
//     counts toward both.
// 4.  **Necrosis**: dark pixels in the yellow or red bands are dead tissue, as
//     opposed to bright yellow chlorosis.
//
// A photo where the percentile leaves nothing strictly above it (a perfectly
// flat exG distribution) optionally falls back to an inclusive comparison;
// see `MaskConfig::inclusive_on_tie`.

use crate::config::MaskConfig;
use crate::core_modules::mask::Mask;
use crate::core_modules::pixel_grid::PixelGrid;
use crate::core_modules::utils::stats::percentile;
use tracing::debug;

/// Per-class ratios over some set of leaf pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TissueRatios {
    pub green: f64,
    pub yellow: f64,
    pub necrosis: f64,
}

/// The leaf mask and its tissue sub-masks for one image.
#[derive(Debug, Clone)]
pub struct LeafMasks {
    pub leaf: Mask,
    pub green: Mask,
    pub yellow: Mask,
    pub red: Mask,
    pub necrosis: Mask,
    /// The exG threshold the leaf gate was built with.
    pub exg_threshold: f64,
}

impl LeafMasks {
    pub fn build(grid: &PixelGrid, config: &MaskConfig) -> Self {
        let (width, height) = (grid.width(), grid.height());
        let rgb = grid.rgb();
        let hsv = grid.hsv();

        // --- 1. Adaptive exG threshold over the whole image ---
        let exg: Vec<f64> = rgb.iter().map(|p| p.excess_green() as f64).collect();
        let exg_threshold = percentile(&exg, config.exg_percentile).unwrap_or(0.0);
        let mut mask_exg = Mask::from_fn(width, height, |i| exg[i] > exg_threshold);
        if config.inclusive_on_tie && mask_exg.count() == 0 {
            debug!(exg_threshold, "flat exG distribution, using inclusive leaf gate");
            mask_exg = Mask::from_fn(width, height, |i| exg[i] >= exg_threshold);
        }

        // --- 2. Saturation / value gates and refinement ---
        let mask_sv = Mask::from_fn(width, height, |i| {
            let p = hsv[i];
            p.saturation > config.min_saturation && p.value > config.min_value
        });
        let refine = Mask::from_fn(width, height, |i| {
            let p = hsv[i];
            p.value < config.max_value && p.saturation > config.refine_min_saturation
        });
        let leaf = mask_sv.and(&mask_exg).and(&refine);

        // --- 3. Hue bands inside the leaf ---
        let green = Mask::from_fn(width, height, |i| config.green_hue.contains(hsv[i].hue)).and(&leaf);
        let yellow = Mask::from_fn(width, height, |i| config.yellow_hue.contains(hsv[i].hue)).and(&leaf);
        let red = Mask::from_fn(width, height, |i| {
            let hue = hsv[i].hue;
            hue <= config.red_hue_low || hue >= config.red_hue_high
        })
        .and(&leaf);

        // --- 4. Necrosis: dark yellow/red tissue ---
        let necrosis = Mask::from_fn(width, height, |i| hsv[i].value < config.necrosis_max_value)
            .and(&yellow.or(&red));

        debug!(
            exg_threshold,
            leaf = leaf.count(),
            green = green.count(),
            yellow = yellow.count(),
            necrosis = necrosis.count(),
            "built leaf masks"
        );

        Self {
            leaf,
            green,
            yellow,
            red,
            necrosis,
            exg_threshold,
        }
    }

    /// Leaf population floored to 1, the denominator for whole-image ratios.
    pub fn total(&self) -> u64 {
        self.leaf.count().max(1)
    }

    /// Whole-image tissue ratios relative to [`LeafMasks::total`].
    pub fn whole_image_ratios(&self) -> TissueRatios {
        let total = self.total() as f64;
        TissueRatios {
            green: self.green.count() as f64 / total,
            yellow: self.yellow.count() as f64 / total,
            necrosis: self.necrosis.count() as f64 / total,
        }
    }
}
