// THEORY:
// A `Mask` is a flat, row-major grid of booleans with the same dimensions as the
// `PixelGrid` it was derived from. Masks are values: the combinators below
// always build a new mask, and nothing mutates one after construction.
//
// Region counting (`count_in`) is what the tile aggregator uses to measure
// coverage inside a rectangle, so it is kept here next to the storage layout.

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Builds a mask by evaluating `predicate` on every pixel index.
    pub fn from_fn(width: u32, height: u32, predicate: impl FnMut(usize) -> bool) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            bits: (0..len).map(predicate).collect(),
        }
    }

    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Self {
        assert_eq!(
            bits.len(),
            width as usize * height as usize,
            "mask bits must cover the full grid"
        );
        Self { width, height, bits }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    /// Number of set pixels.
    pub fn count(&self) -> u64 {
        self.bits.iter().filter(|&&bit| bit).count() as u64
    }

    /// Number of set pixels inside `rect`.
    pub fn count_in(&self, rect: Rect) -> u64 {
        let mut count = 0u64;
        for y in rect.y0..rect.y1 {
            let row = (y * self.width) as usize;
            count += self.bits[row + rect.x0 as usize..row + rect.x1 as usize]
                .iter()
                .filter(|&&bit| bit)
                .count() as u64;
        }
        count
    }

    pub fn and(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a && b)
    }

    pub fn or(&self, other: &Mask) -> Mask {
        self.zip_with(other, |a, b| a || b)
    }

    fn zip_with(&self, other: &Mask, op: impl Fn(bool, bool) -> bool) -> Mask {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "masks must share dimensions"
        );
        Mask {
            width: self.width,
            height: self.height,
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        }
    }
}
