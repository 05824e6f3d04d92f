// THEORY (single-pixel heuristics):
// The `Pixel` module is the smallest unit of the classifier. It holds one RGB
// sample and the per-pixel quantities every later stage needs, all of which can
// be computed from the pixel alone:
//
// - Excess green (exG = 2G - R - B): a vegetation index, signed.
// - Luminance (Rec. 601 luma): the grayscale intensity the texture stage
//   differentiates.
// - HSV bytes: hue, saturation and value packed into 0..=255 each. The hue
//   byte is a proxy for 0..360 degrees (hue_byte = degrees * 255 / 360).
//
// The HSV conversion reproduces the common 8-bit imaging convention: floats
// for the ratios, the hue wrapped with fmod(h/6 + 1, 1), and truncating casts
// back to bytes. Gray pixels (max == min) have zero hue and saturation. All
// of the mask thresholds were calibrated against exactly these byte values, so
// the truncation matters.
//
// Neighbor-aware quantities (gradients, edges) live in the texture module.

pub mod pixel {
    pub type Channel = u8;
    pub type ExcessGreen = i16;
    pub type Luminance = f64;

    /// A packed RGB sample.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
    }

    /// A packed HSV sample, each component on 0..=255.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HsvPixel {
        pub hue: Channel,
        pub saturation: Channel,
        pub value: Channel,
    }

    impl Pixel {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Excess green index, 2G - R - B. Ranges over -510..=510.
        #[inline]
        pub fn excess_green(&self) -> ExcessGreen {
            2 * self.green as ExcessGreen - self.red as ExcessGreen - self.blue as ExcessGreen
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        #[inline]
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }

        /// 8-bit HSV conversion.
        pub fn to_hsv(&self) -> HsvPixel {
            let (r, g, b) = (self.red, self.green, self.blue);
            let maximum_channel = r.max(g.max(b));
            let minimum_channel = r.min(g.min(b));

            if maximum_channel == minimum_channel {
                return HsvPixel {
                    hue: 0,
                    saturation: 0,
                    value: maximum_channel,
                };
            }

            let chroma = (maximum_channel - minimum_channel) as f32;
            let saturation = chroma / maximum_channel as f32;
            let red_distance = (maximum_channel - r) as f32 / chroma;
            let green_distance = (maximum_channel - g) as f32 / chroma;
            let blue_distance = (maximum_channel - b) as f32 / chroma;

            let sector = if r == maximum_channel {
                blue_distance - green_distance
            } else if g == maximum_channel {
                2.0 + red_distance - blue_distance
            } else {
                4.0 + green_distance - red_distance
            };

            // Wrap in double precision, then narrow, as the reference conversion does.
            let hue = ((sector as f64 / 6.0 + 1.0) % 1.0) as f32;

            HsvPixel {
                hue: clip_to_byte((hue as f64 * 255.0) as i32),
                saturation: clip_to_byte((saturation as f64 * 255.0) as i32),
                value: maximum_channel,
            }
        }
    }

    #[inline]
    fn clip_to_byte(value: i32) -> Channel {
        value.clamp(0, 255) as Channel
    }

    impl From<[Channel; 3]> for Pixel {
        fn from(channels: [Channel; 3]) -> Self {
            Pixel::new(channels[0], channels[1], channels[2])
        }
    }

    impl From<&image::Rgb<u8>> for Pixel {
        fn from(rgb: &image::Rgb<u8>) -> Self {
            Pixel::new(rgb.0[0], rgb.0[1], rgb.0[2])
        }
    }
}
