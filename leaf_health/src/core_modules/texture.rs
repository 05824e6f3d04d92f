// THEORY:
// Disease spots break up the smooth surface of a leaf, so a leaf with many local
// intensity changes is suspicious. The texture estimator measures that with a
// cheap Laplacian stand-in: central differences on the luma plane, averaged
// over the two axes. Pixels on the outer border have a missing neighbor and get
// zero response.
//
// The edge threshold is a percentile of the response over leaf pixels only,
// and the edge ratio is the share of leaf pixels strictly above it. With an
// empty leaf mask both are zero.

use crate::config::TextureConfig;
use crate::core_modules::mask::Mask;
use crate::core_modules::pixel_grid::PixelGrid;
use crate::core_modules::utils::stats::percentile;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureEstimate {
    pub edge_threshold: f64,
    pub edge_ratio: f64,
}

/// Luma plane (Rec. 601) stored as f32, row-major.
pub fn luma_plane(grid: &PixelGrid) -> Vec<f32> {
    grid.rgb().iter().map(|p| p.luminance() as f32).collect()
}

/// Edge strength per pixel: `0.5 * (|dx| + |dy|)` from central differences.
pub fn edge_strength(gray: &[f32], width: u32, height: u32) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    let mut edges = vec![0.0f32; w * h];
    if w < 3 || h < 3 {
        return edges;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let horizontal = (gray[i + 1] - gray[i - 1]).abs();
            let vertical = (gray[i + w] - gray[i - w]).abs();
            edges[i] = 0.5 * (horizontal + vertical);
        }
    }
    edges
}

pub fn estimate(grid: &PixelGrid, leaf: &Mask, config: &TextureConfig) -> TextureEstimate {
    let gray = luma_plane(grid);
    let edges = edge_strength(&gray, grid.width(), grid.height());

    let leaf_edges: Vec<f32> = edges
        .iter()
        .zip(leaf.bits())
        .filter(|&(_, &is_leaf)| is_leaf)
        .map(|(&edge, _)| edge)
        .collect();

    let Some((edge_threshold, edge_ratio)) = share_above_percentile(&leaf_edges, config.edge_percentile)
    else {
        debug!("empty leaf mask, no texture response");
        return TextureEstimate {
            edge_threshold: 0.0,
            edge_ratio: 0.0,
        };
    };
    debug!(edge_threshold, edge_ratio, leaf_pixels = leaf_edges.len(), "texture estimated");

    TextureEstimate {
        edge_threshold: edge_threshold as f64,
        edge_ratio,
    }
}

/// The `q`-th percentile of `edges` and the share of samples strictly above it.
///
/// Both the threshold and the comparison stay in single precision, the
/// precision of the edge plane.
pub fn share_above_percentile(edges: &[f32], q: f64) -> Option<(f32, f64)> {
    let threshold = percentile(edges, q)?;
    let above = edges.iter().filter(|&&edge| edge > threshold).count();
    Some((threshold, above as f64 / edges.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreprocessConfig;
    use image::{Rgb, RgbImage};

    #[test]
    fn border_pixels_have_no_response() {
        let gray: Vec<f32> = (0..25).map(|v| v as f32 * 3.0).collect();
        let edges = edge_strength(&gray, 5, 5);
        for x in 0..5 {
            assert_eq!(edges[x], 0.0);
            assert_eq!(edges[20 + x], 0.0);
        }
        for y in 0..5 {
            assert_eq!(edges[y * 5], 0.0);
            assert_eq!(edges[y * 5 + 4], 0.0);
        }
    }

    #[test]
    fn central_differences_on_a_ramp() {
        // gray = 3 * (y * 5 + x): dx spans 6, dy spans 30.
        let gray: Vec<f32> = (0..25).map(|v| v as f32 * 3.0).collect();
        let edges = edge_strength(&gray, 5, 5);
        assert_eq!(edges[6], 18.0);
        assert_eq!(edges[12], 18.0);
    }

    #[test]
    fn thin_images_are_all_border() {
        let edges = edge_strength(&[1.0, 9.0, 1.0, 9.0], 4, 1);
        assert!(edges.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn empty_leaf_gives_zero_texture() {
        let grid = PixelGrid::from_image(
            &RgbImage::from_pixel(6, 6, Rgb([10, 10, 10])),
            &PreprocessConfig::default(),
        )
        .unwrap();
        let leaf = Mask::from_fn(6, 6, |_| false);
        let texture = estimate(&grid, &leaf, &TextureConfig::default());
        assert_eq!(texture, TextureEstimate { edge_threshold: 0.0, edge_ratio: 0.0 });
    }

    #[test]
    fn flat_leaf_has_no_edges_above_threshold() {
        let grid = PixelGrid::from_image(
            &RgbImage::from_pixel(8, 8, Rgb([40, 200, 40])),
            &PreprocessConfig::default(),
        )
        .unwrap();
        let leaf = Mask::from_fn(8, 8, |_| true);
        let texture = estimate(&grid, &leaf, &TextureConfig::default());
        assert_eq!(texture.edge_threshold, 0.0);
        assert_eq!(texture.edge_ratio, 0.0);
    }

    #[test]
    fn speckled_leaf_reports_edge_share() {
        // A single bright spot on a flat leaf.
        let mut image = RgbImage::from_pixel(9, 9, Rgb([40, 200, 40]));
        image.put_pixel(4, 4, Rgb([200, 240, 200]));
        let grid = PixelGrid::from_image(&image, &PreprocessConfig::default()).unwrap();
        let leaf = Mask::from_fn(9, 9, |_| true);
        let texture = estimate(&grid, &leaf, &TextureConfig::default());
        // The spot lights up its four direct neighbors only.
        assert_eq!(texture.edge_threshold, 0.0);
        assert!((texture.edge_ratio - 4.0 / 81.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_is_interpolated_in_single_precision() {
        // The 70th percentile of two adjacent f32 values rounds onto the upper
        // one, so neither sample is strictly above it.
        let upper = 1.0f32 + f32::EPSILON;
        assert_eq!(share_above_percentile(&[1.0, upper], 70.0), Some((upper, 0.0)));
        assert_eq!(share_above_percentile(&[], 70.0), None);
    }
}
