// THEORY:
// The `PixelGrid` is the preprocessor's output and the only image
// representation the later stages see. It bounds the working resolution
// (longest side at most `max_side`, aspect ratio kept) and then derives an HSV
// plane from the resized RGB plane, so both planes are always co-registered:
// index `i` in one refers to the same pixel as index `i` in the other.
//
// The grid is immutable once built. Decoding compressed bytes into pixels is the
// caller's job; this module only accepts already-decoded RGB data.

use crate::config::PreprocessConfig;
use crate::core_modules::pixel::pixel::{HsvPixel, Pixel};
use crate::error::ClassifyError;
use image::RgbImage;
use std::borrow::Cow;
use tracing::debug;

/// Co-registered RGB and HSV planes of one preprocessed image.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    rgb: Vec<Pixel>,
    hsv: Vec<HsvPixel>,
}

impl PixelGrid {
    /// Validates, resizes if needed and converts an RGB image.
    pub fn from_image(image: &RgbImage, config: &PreprocessConfig) -> Result<Self, ClassifyError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifyError::InvalidDimensions { width, height });
        }

        let working = match target_dimensions(width, height, config.max_side) {
            Some((new_width, new_height)) => {
                debug!(width, height, new_width, new_height, "downscaling input");
                Cow::Owned(image::imageops::resize(
                    image,
                    new_width,
                    new_height,
                    config.filter.filter_type(),
                ))
            }
            None => Cow::Borrowed(image),
        };

        Ok(Self::from_rgb_image(&working))
    }

    /// Same as [`PixelGrid::from_image`] for a packed `RGBRGB...` byte buffer.
    pub fn from_raw(
        width: u32,
        height: u32,
        bytes: &[u8],
        config: &PreprocessConfig,
    ) -> Result<Self, ClassifyError> {
        if width == 0 || height == 0 {
            return Err(ClassifyError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * 3;
        if bytes.len() != expected {
            return Err(ClassifyError::PixelDataLength {
                expected,
                actual: bytes.len(),
            });
        }
        let image = RgbImage::from_raw(width, height, bytes.to_vec()).ok_or(
            ClassifyError::PixelDataLength {
                expected,
                actual: bytes.len(),
            },
        )?;
        Self::from_image(&image, config)
    }

    fn from_rgb_image(image: &RgbImage) -> Self {
        let rgb: Vec<Pixel> = image.pixels().map(Pixel::from).collect();
        let hsv = rgb.iter().map(Pixel::to_hsv).collect();
        Self {
            width: image.width(),
            height: image.height(),
            rgb,
            hsv,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.rgb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rgb.is_empty()
    }

    /// Row-major RGB plane.
    pub fn rgb(&self) -> &[Pixel] {
        &self.rgb
    }

    /// Row-major HSV plane, same layout as [`PixelGrid::rgb`].
    pub fn hsv(&self) -> &[HsvPixel] {
        &self.hsv
    }
}

/// New dimensions when the image must shrink, `None` when it already fits.
///
/// `scale = min(max_side / max(w, h), 1)`; each side is rounded and kept >= 1.
pub fn target_dimensions(width: u32, height: u32, max_side: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    let scale = (max_side as f64 / longest as f64).min(1.0);
    if scale >= 1.0 {
        return None;
    }
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).max(1);
    Some((scaled(width), scaled(height)))
}
