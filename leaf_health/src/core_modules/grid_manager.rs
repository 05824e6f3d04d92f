// THEORY:
// The `GridManager` lays a fixed N x N grid of `Tile`s over the image and turns
// their individual summaries into one robust set of tissue ratios.
//
// Key architectural principles:
// 1.  **Exact partition**: band `i` of a dimension spans
//     `floor(dim * i / N) .. floor(dim * (i + 1) / N)`. The bands cover the
//     image with no gaps or overlaps, and the remainder rows/columns fall
//     wherever the floor division puts them. Reference outputs depend on this
//     exact split.
// 2.  **Coverage gate**: each `Tile` decides for itself whether it saw enough
//     leaf to be trusted; the manager simply collects what comes back.
// 3.  **Median aggregation**: the per-component median across trusted tiles
//     keeps one dominant bright or dark region from dragging the whole-image
//     ratio. With no trusted tile, the whole-image ratios stand unchanged.

use crate::config::TileConfig;
use crate::core_modules::chunk::chunk::{Tile, TileStat};
use crate::core_modules::leaf_mask::{LeafMasks, TissueRatios};
use crate::core_modules::mask::Rect;
use crate::core_modules::utils::stats::median;
use tracing::{debug, trace};

/// Outcome of tile aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct TileAggregate {
    pub ratios: TissueRatios,
    /// Number of tiles that cleared the coverage gate.
    pub tiles_used: usize,
}

impl TileAggregate {
    /// `min(yellow + necrosis, 1)`.
    pub fn stress_ratio(&self) -> f64 {
        (self.ratios.yellow + self.ratios.necrosis).min(1.0)
    }
}

/// Owns the tile layout for one image size.
pub struct GridManager {
    tiles: Vec<Tile>,
    min_leaf_pixels: u64,
}

impl GridManager {
    pub fn new(image_width: u32, image_height: u32, config: &TileConfig) -> Self {
        let grid_size = config.grid_size.max(1);
        let mut tiles = Vec::with_capacity(grid_size as usize * grid_size as usize);
        for tile_y in 0..grid_size {
            let (y0, y1) = band(image_height, grid_size, tile_y);
            for tile_x in 0..grid_size {
                let (x0, x1) = band(image_width, grid_size, tile_x);
                tiles.push(Tile::new(tile_x, tile_y, Rect { x0, y0, x1, y1 }));
            }
        }
        Self {
            tiles,
            min_leaf_pixels: config.min_leaf_pixels,
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Summaries of every tile that cleared the coverage gate, row-major.
    pub fn tile_stats(&self, masks: &LeafMasks) -> Vec<TileStat> {
        self.tiles
            .iter()
            .filter_map(|tile| {
                let stat = tile.summarize(masks, self.min_leaf_pixels);
                if let Some(stat) = &stat {
                    trace!(
                        tile_x = tile.tile_x,
                        tile_y = tile.tile_y,
                        leaf_pixels = stat.leaf_pixels,
                        "tile retained"
                    );
                }
                stat
            })
            .collect()
    }

    /// Median tile ratios, or `whole_image` when no tile qualifies.
    pub fn aggregate(&self, masks: &LeafMasks, whole_image: TissueRatios) -> TileAggregate {
        let stats = self.tile_stats(masks);
        let ratios = median_ratios(&stats).unwrap_or(whole_image);
        debug!(
            tiles_used = stats.len(),
            green = ratios.green,
            yellow = ratios.yellow,
            necrosis = ratios.necrosis,
            "aggregated tile ratios"
        );
        TileAggregate {
            ratios,
            tiles_used: stats.len(),
        }
    }
}

/// Pixel span of band `index` when `dim` is split into `parts` bands.
pub fn band(dim: u32, parts: u32, index: u32) -> (u32, u32) {
    let start = (dim as u64 * index as u64 / parts as u64) as u32;
    let end = (dim as u64 * (index as u64 + 1) / parts as u64) as u32;
    (start, end)
}

fn median_ratios(stats: &[TileStat]) -> Option<TissueRatios> {
    let component = |pick: fn(&TileStat) -> f64| -> Option<f64> {
        median(&stats.iter().map(pick).collect::<Vec<_>>())
    };
    Some(TissueRatios {
        green: component(|s| s.green_ratio)?,
        yellow: component(|s| s.yellow_ratio)?,
        necrosis: component(|s| s.necrosis_ratio)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::mask::Mask;

    fn masks_from(
        width: u32,
        height: u32,
        leaf: impl Fn(u32, u32) -> bool,
        green: impl Fn(u32, u32) -> bool,
    ) -> LeafMasks {
        let at = |f: &dyn Fn(u32, u32) -> bool| {
            Mask::from_fn(width, height, |i| f(i as u32 % width, i as u32 / width))
        };
        let leaf_mask = at(&leaf);
        let green_mask = at(&green).and(&leaf_mask);
        let yellow_mask = at(&|x: u32, y: u32| leaf(x, y) && !green(x, y));
        LeafMasks {
            red: Mask::from_fn(width, height, |_| false),
            necrosis: Mask::from_fn(width, height, |_| false),
            leaf: leaf_mask,
            green: green_mask,
            yellow: yellow_mask,
            exg_threshold: 0.0,
        }
    }

    #[test]
    fn bands_cover_dimension_without_gaps() {
        assert_eq!(band(10, 3, 0), (0, 3));
        assert_eq!(band(10, 3, 1), (3, 6));
        assert_eq!(band(10, 3, 2), (6, 10));
        assert_eq!(band(11, 3, 0), (0, 3));
        assert_eq!(band(11, 3, 1), (3, 7));
        assert_eq!(band(11, 3, 2), (7, 11));
        assert_eq!(band(1, 3, 0), (0, 0));
        assert_eq!(band(1, 3, 1), (0, 0));
        assert_eq!(band(1, 3, 2), (0, 1));
    }

    #[test]
    fn grid_tiles_partition_the_image() {
        let manager = GridManager::new(100, 47, &TileConfig::default());
        assert_eq!(manager.tiles().len(), 9);
        let area: u64 = manager.tiles().iter().map(|t| t.bounds.area()).sum();
        assert_eq!(area, 100 * 47);
        assert_eq!(manager.tiles()[4].bounds, Rect { x0: 33, y0: 15, x1: 66, y1: 31 });
    }

    #[test]
    fn median_resists_one_outlier_region() {
        // 30x30, every tile 10x10 and fully leaf. Only the top-left tile is
        // yellow; the other eight are green.
        let masks = masks_from(30, 30, |_, _| true, |x, y| !(x < 10 && y < 10));
        let manager = GridManager::new(30, 30, &TileConfig::default());
        let whole = masks.whole_image_ratios();
        assert!((whole.green - 800.0 / 900.0).abs() < 1e-12);

        let aggregate = manager.aggregate(&masks, whole);
        assert_eq!(aggregate.tiles_used, 9);
        assert_eq!(aggregate.ratios.green, 1.0);
        assert_eq!(aggregate.ratios.yellow, 0.0);
        assert_eq!(aggregate.stress_ratio(), 0.0);
    }

    #[test]
    fn even_number_of_tiles_averages_middle_pair() {
        // Only the four corner tiles carry leaf. Greens: 1.0, 0.5, 0.5, 0.0.
        let leaf = |x: u32, y: u32| (x < 10 || x >= 20) && (y < 10 || y >= 20);
        let green = |x: u32, y: u32| match (x < 10, y < 10) {
            (true, true) => true,
            (false, true) | (true, false) => x % 2 == 0,
            (false, false) => false,
        };
        let masks = masks_from(30, 30, leaf, green);
        let manager = GridManager::new(30, 30, &TileConfig::default());
        let aggregate = manager.aggregate(&masks, masks.whole_image_ratios());
        assert_eq!(aggregate.tiles_used, 4);
        assert_eq!(aggregate.ratios.green, 0.5);
        assert_eq!(aggregate.ratios.yellow, 0.5);
    }

    #[test]
    fn falls_back_to_whole_image_when_no_tile_qualifies() {
        // 49 leaf pixels in one corner: under the 50-pixel gate.
        let masks = masks_from(30, 30, |x, y| x < 7 && y < 7, |x, _| x < 3);
        let manager = GridManager::new(30, 30, &TileConfig::default());
        let whole = masks.whole_image_ratios();
        let aggregate = manager.aggregate(&masks, whole);
        assert_eq!(aggregate.tiles_used, 0);
        assert_eq!(aggregate.ratios, whole);
        assert!((aggregate.ratios.green - 21.0 / 49.0).abs() < 1e-12);
    }

    #[test]
    fn grid_finer_than_image_leaves_empty_tiles() {
        let config = TileConfig {
            grid_size: 5,
            ..TileConfig::default()
        };
        let manager = GridManager::new(3, 2, &config);
        assert_eq!(manager.tiles().len(), 25);
        let area: u64 = manager.tiles().iter().map(|t| t.bounds.area()).sum();
        assert_eq!(area, 6);
        assert_eq!(band(3, 5, 0), (0, 0));
        assert_eq!(band(3, 5, 4), (2, 3));
    }

    #[test]
    fn stress_is_capped_at_one() {
        let aggregate = TileAggregate {
            ratios: TissueRatios { green: 0.0, yellow: 0.8, necrosis: 0.7 },
            tiles_used: 1,
        };
        assert_eq!(aggregate.stress_ratio(), 1.0);
    }
}
