// THEORY:
// A `Tile` is one cell of the coarse spatial grid laid over the leaf. It is a
// "dumb" container: it knows its pixel bounds and how to summarize the masks
// inside those bounds, but not how its summary compares to other tiles.
//
// The summary (`TileStat`) is the tile's tissue ratios relative to its *own*
// leaf population. A tile that sees too little leaf reports nothing, because
// ratios over a handful of pixels are noise.

pub mod chunk {
    use crate::core_modules::leaf_mask::{LeafMasks, TissueRatios};
    use crate::core_modules::mask::Rect;

    /// Tissue ratios for one sufficiently covered tile.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct TileStat {
        pub green_ratio: f64,
        pub yellow_ratio: f64,
        pub necrosis_ratio: f64,
        /// Leaf pixels the ratios were computed over.
        pub leaf_pixels: u64,
    }

    impl From<TileStat> for TissueRatios {
        fn from(stat: TileStat) -> Self {
            TissueRatios {
                green: stat.green_ratio,
                yellow: stat.yellow_ratio,
                necrosis: stat.necrosis_ratio,
            }
        }
    }

    /// A rectangular cell of the tile grid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Tile {
        /// Column index in the grid.
        pub tile_x: u32,
        /// Row index in the grid.
        pub tile_y: u32,
        /// Pixel bounds, half-open.
        pub bounds: Rect,
    }

    impl Tile {
        pub fn new(tile_x: u32, tile_y: u32, bounds: Rect) -> Self {
            Self {
                tile_x,
                tile_y,
                bounds,
            }
        }

        /// Summarizes the masks inside this tile, or `None` when fewer than
        /// `min_leaf_pixels` leaf pixels fall inside it.
        pub fn summarize(&self, masks: &LeafMasks, min_leaf_pixels: u64) -> Option<TileStat> {
            let leaf_pixels = masks.leaf.count_in(self.bounds);
            if leaf_pixels < min_leaf_pixels {
                return None;
            }
            let denominator = leaf_pixels.max(1) as f64;
            Some(TileStat {
                green_ratio: masks.green.count_in(self.bounds) as f64 / denominator,
                yellow_ratio: masks.yellow.count_in(self.bounds) as f64 / denominator,
                necrosis_ratio: masks.necrosis.count_in(self.bounds) as f64 / denominator,
                leaf_pixels,
            })
        }
    }
}
