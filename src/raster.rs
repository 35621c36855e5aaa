//! Placement of decoded pixels into a power-of-two texture buffer.

use crate::color::Rgba;

/// (start row, row step) for each interlace pass.
const INTERLACED_PASSES: [(u32, u32); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];
const SEQUENTIAL_PASSES: [(u32, u32); 1] = [(0, 1)];

/// Order in which image rows receive data.
#[derive(Debug, Clone)]
pub struct RowOrder {
    height: u32,
    passes: &'static [(u32, u32)],
    pass: usize,
    next: u32,
}

impl RowOrder {
    pub fn new(height: u32, interlaced: bool) -> Self {
        let passes: &'static [(u32, u32)] = if interlaced {
            &INTERLACED_PASSES
        } else {
            &SEQUENTIAL_PASSES
        };
        Self {
            height,
            passes,
            pass: 0,
            next: passes[0].0,
        }
    }
}

impl Iterator for RowOrder {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            let &(_, step) = self.passes.get(self.pass)?;
            if self.next < self.height {
                let row = self.next;
                self.next += step;
                return Some(row);
            }
            self.pass += 1;
            if let Some(&(start, _)) = self.passes.get(self.pass) {
                self.next = start;
            }
        }
    }
}

/// RGBA pixels of one image block, padded right and bottom with transparent
/// pixels up to power-of-two dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgba>,
}

/// Write cursor over the true image bounds of a [`Bitmap`].
#[derive(Debug)]
pub struct Raster {
    width: u32,
    bitmap: Bitmap,
    rows: RowOrder,
    row: Option<u32>,
    x: u32,
}

impl Raster {
    /// Returns `None` when the padded buffer can not be allocated.
    pub fn new(width: u16, height: u16, interlaced: bool) -> Option<Self> {
        let (width, height) = (u32::from(width), u32::from(height));
        let texture_width = width.next_power_of_two();
        let texture_height = height.next_power_of_two();
        let len = usize::try_from(texture_width)
            .ok()?
            .checked_mul(usize::try_from(texture_height).ok()?)?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).ok()?;
        pixels.resize(len, Rgba::TRANSPARENT);

        let mut rows = RowOrder::new(height, interlaced);
        let row = if width == 0 { None } else { rows.next() };
        Some(Self {
            width,
            bitmap: Bitmap {
                width: texture_width,
                height: texture_height,
                pixels,
            },
            rows,
            row,
            x: 0,
        })
    }

    /// Writes the next pixel. Returns `false` once every row has been filled,
    /// in which case the pixel is dropped.
    pub fn put(&mut self, color: Rgba) -> bool {
        let Some(y) = self.row else {
            return false;
        };
        let index = y as usize * self.bitmap.width as usize + self.x as usize;
        self.bitmap.pixels[index] = color;
        self.x += 1;
        if self.x == self.width {
            self.x = 0;
            self.row = self.rows.next();
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.row.is_none()
    }

    /// Rows below and columns right of the written area stay transparent.
    pub fn finish(self) -> Bitmap {
        self.bitmap
    }
}
