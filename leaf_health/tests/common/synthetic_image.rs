use image::{Rgb, RgbImage};

pub const LEAF_GREEN: [u8; 3] = [40, 200, 40];
pub const DRY_BROWN: [u8; 3] = [90, 60, 30];
pub const CHLOROTIC_YELLOW: [u8; 3] = [200, 180, 40];
pub const NEUTRAL_GRAY: [u8; 3] = [120, 120, 120];

/// A single flat color.
pub fn uniform(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    RgbImage::from_pixel(width, height, Rgb(rgb))
}

/// A gray backdrop with a small patch in the top-left corner: `green_rows`
/// rows of leaf green followed by `yellow_rows` rows of chlorotic yellow, each
/// `patch_width` pixels wide.
pub fn corner_patch(
    size: u32,
    patch_width: u32,
    green_rows: u32,
    yellow_rows: u32,
) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        if x >= patch_width {
            Rgb(NEUTRAL_GRAY)
        } else if y < green_rows {
            Rgb(LEAF_GREEN)
        } else if y < green_rows + yellow_rows {
            Rgb(CHLOROTIC_YELLOW)
        } else {
            Rgb(NEUTRAL_GRAY)
        }
    })
}

/// Deterministic pseudo-random colors (xorshift32), useful where a test only
/// needs "some busy photo".
pub fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };
    RgbImage::from_fn(width, height, |_, _| {
        let v = next();
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    })
}

/// A green leaf disc on a gray backdrop with chlorotic spots scattered over it.
/// The backdrop covers most of the frame, so every leaf pixel clears the
/// adaptive exG threshold.
pub fn spotted_leaf(size: u32, spot_every: u32) -> RgbImage {
    let center = size as f64 / 2.0;
    let radius = size as f64 * 0.3;
    RgbImage::from_fn(size, size, |x, y| {
        let (dx, dy) = (x as f64 - center, y as f64 - center);
        if dx * dx + dy * dy > radius * radius {
            Rgb(NEUTRAL_GRAY)
        } else if (x / 3 + y / 3) % spot_every == 0 {
            Rgb(CHLOROTIC_YELLOW)
        } else {
            Rgb(LEAF_GREEN)
        }
    })
}
