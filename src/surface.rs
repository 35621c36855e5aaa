//! Drawing backend the compositor renders through.

use crate::color::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Source over destination.
    Alpha,
    /// Source color scaled by its alpha is added to the destination.
    Add,
    /// Source overwrites destination.
    Replace,
}

/// A 2D target able to allocate canvases, fill rectangles, blend images
/// into each other and wrap raw pixel buffers as textures.
///
/// Drawing "offscreen" is expressed by passing the target image explicitly;
/// any image can later serve as a source.
pub trait RenderSurface {
    type Image;

    /// Allocates a cleared canvas. Without `alpha` every pixel is opaque.
    fn new_canvas(&mut self, width: u32, height: u32, alpha: bool) -> Self::Image;

    /// Overwrites `rect` of `target` with `color`.
    fn fill_rect(&mut self, target: &mut Self::Image, rect: Rect, color: Rgba);

    /// Draws `source` with its top-left corner at (`x`, `y`).
    fn draw(
        &mut self,
        target: &mut Self::Image,
        source: &Self::Image,
        x: u32,
        y: u32,
        blend: BlendMode,
    );

    /// Wraps a row-major buffer of `width * height` pixels.
    fn new_texture(&mut self, width: u32, height: u32, pixels: &[Rgba]) -> Self::Image;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    alpha: bool,
    pixels: Vec<Rgba>,
}

impl RgbaImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Copies the image into an RGBA8 byte buffer such as a `pixels` frame.
    pub fn write_rgba8(&self, out: &mut [u8]) {
        for (dst, src) in out.chunks_exact_mut(4).zip(&self.pixels) {
            dst.copy_from_slice(&[src.r, src.g, src.b, src.a]);
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn store(&mut self, x: u32, y: u32, mut color: Rgba) {
        if !self.alpha {
            color.a = 255;
        }
        let index = self.index(x, y);
        self.pixels[index] = color;
    }
}

/// In-memory surface over [`RgbaImage`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareSurface;

impl RenderSurface for SoftwareSurface {
    type Image = RgbaImage;

    fn new_canvas(&mut self, width: u32, height: u32, alpha: bool) -> RgbaImage {
        let clear = if alpha {
            Rgba::TRANSPARENT
        } else {
            Rgba::opaque(0, 0, 0)
        };
        RgbaImage {
            width,
            height,
            alpha,
            pixels: vec![clear; width as usize * height as usize],
        }
    }

    fn fill_rect(&mut self, target: &mut RgbaImage, rect: Rect, color: Rgba) {
        let right = rect.x.saturating_add(rect.width).min(target.width);
        let bottom = rect.y.saturating_add(rect.height).min(target.height);
        for y in rect.y..bottom {
            for x in rect.x..right {
                target.store(x, y, color);
            }
        }
    }

    fn draw(
        &mut self,
        target: &mut RgbaImage,
        source: &RgbaImage,
        x: u32,
        y: u32,
        blend: BlendMode,
    ) {
        let right = x.saturating_add(source.width).min(target.width);
        let bottom = y.saturating_add(source.height).min(target.height);
        for ty in y..bottom {
            for tx in x..right {
                let src = source.pixels[source.index(tx - x, ty - y)];
                let dst = target.pixels[target.index(tx, ty)];
                target.store(tx, ty, blend_pixel(src, dst, blend));
            }
        }
    }

    fn new_texture(&mut self, width: u32, height: u32, pixels: &[Rgba]) -> RgbaImage {
        let mut buffer = vec![Rgba::TRANSPARENT; width as usize * height as usize];
        let len = buffer.len().min(pixels.len());
        buffer[..len].copy_from_slice(&pixels[..len]);
        RgbaImage {
            width,
            height,
            alpha: true,
            pixels: buffer,
        }
    }
}

fn blend_pixel(src: Rgba, dst: Rgba, blend: BlendMode) -> Rgba {
    match blend {
        BlendMode::Replace => src,
        BlendMode::Add => {
            let sa = u32::from(src.a);
            let add = |s: u8, d: u8| (u32::from(d) + u32::from(s) * sa / 255).min(255) as u8;
            Rgba::new(
                add(src.r, dst.r),
                add(src.g, dst.g),
                add(src.b, dst.b),
                (u32::from(dst.a) + sa).min(255) as u8,
            )
        }
        BlendMode::Alpha => match src.a {
            255 => src,
            0 => dst,
            _ => {
                let sa = u32::from(src.a);
                // destination weight, already scaled by 255
                let dw = u32::from(dst.a) * (255 - sa) / 255;
                let out_a = sa + dw;
                let mix = |s: u8, d: u8| ((u32::from(s) * sa + u32::from(d) * dw) / out_a) as u8;
                Rgba::new(
                    mix(src.r, dst.r),
                    mix(src.g, dst.g),
                    mix(src.b, dst.b),
                    out_a as u8,
                )
            }
        },
    }
}
