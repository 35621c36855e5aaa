//! Replays the GIF canvas model: frames draw onto a persistent canvas and
//! each frame's disposal method prepares that canvas for the next one.

use log::trace;

use crate::color::Rgba;
use crate::extension::{DisposalMethod, GraphicControl};
use crate::surface::{BlendMode, Rect, RenderSurface};

pub struct Compositor<I> {
    width: u32,
    height: u32,
    alpha: bool,
    background: Option<Rgba>,
    canvas: Option<I>,
    /// Canvas as it was before the first of a run of restore-to-previous frames.
    saved: Option<I>,
}

impl<I> Compositor<I> {
    /// `background` is the global table's background entry, if any.
    pub fn new(width: u16, height: u16, alpha: bool, background: Option<Rgba>) -> Self {
        Self {
            width: u32::from(width),
            height: u32::from(height),
            alpha,
            background,
            canvas: None,
            saved: None,
        }
    }

    /// The persistent canvas, once the first frame has been drawn.
    pub fn canvas(&self) -> Option<&I> {
        self.canvas.as_ref()
    }

    pub fn has_snapshot(&self) -> bool {
        self.saved.is_some()
    }

    /// Color used to clear a frame's rectangle.
    pub fn background_for(&self, control: Option<&GraphicControl>) -> Rgba {
        match control {
            Some(control) if control.transparent => Rgba::TRANSPARENT,
            _ => self.background.unwrap_or(Rgba::TRANSPARENT),
        }
    }

    /// Draws `texture` at `rect`, returns a copy of the resulting canvas and
    /// then applies the frame's disposal method to the canvas.
    pub fn composite<S>(
        &mut self,
        surface: &mut S,
        rect: Rect,
        texture: &I,
        control: Option<&GraphicControl>,
    ) -> I
    where
        S: RenderSurface<Image = I>,
    {
        let disposal = control.map_or(DisposalMethod::None, |control| control.disposal);
        let clear = self.background_for(control);

        let mut canvas = match self.canvas.take() {
            Some(canvas) => canvas,
            None => {
                let mut canvas = surface.new_canvas(self.width, self.height, self.alpha);
                surface.fill_rect(&mut canvas, rect, clear);
                canvas
            }
        };

        if disposal == DisposalMethod::RestorePrevious {
            if self.saved.is_none() {
                trace!("saving canvas before frame at {:?}", rect);
                self.saved = Some(self.copy(surface, &canvas));
            }
        } else if self.saved.take().is_some() {
            trace!("dropping stale canvas snapshot");
        }

        // transparent texels keep the canvas; Add would also brighten opaque overlaps
        surface.draw(&mut canvas, texture, rect.x, rect.y, BlendMode::Alpha);
        let frame = self.copy(surface, &canvas);

        match disposal {
            DisposalMethod::RestoreBackground => {
                trace!("restoring {:?} to {:?}", rect, clear);
                surface.fill_rect(&mut canvas, rect, clear);
            }
            DisposalMethod::RestorePrevious => {
                if let Some(saved) = &self.saved {
                    trace!("restoring saved canvas");
                    surface.draw(&mut canvas, saved, 0, 0, BlendMode::Replace);
                }
            }
            DisposalMethod::None | DisposalMethod::DoNotDispose => {}
        }

        self.canvas = Some(canvas);
        frame
    }

    fn copy<S>(&self, surface: &mut S, source: &I) -> I
    where
        S: RenderSurface<Image = I>,
    {
        let mut copy = surface.new_canvas(self.width, self.height, self.alpha);
        surface.draw(&mut copy, source, 0, 0, BlendMode::Replace);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RgbaImage, SoftwareSurface};

    const BG: Rgba = Rgba::opaque(10, 20, 30);
    const RED: Rgba = Rgba::opaque(255, 0, 0);
    const GREEN: Rgba = Rgba::opaque(0, 255, 0);

    fn control(disposal: DisposalMethod, transparent: bool) -> GraphicControl {
        GraphicControl {
            disposal,
            user_input: false,
            transparent,
            delay: 0,
            transparent_index: 0,
        }
    }

    fn solid(surface: &mut SoftwareSurface, width: u32, height: u32, color: Rgba) -> RgbaImage {
        let pixels = vec![color; (width * height) as usize];
        surface.new_texture(width, height, &pixels)
    }

    #[test]
    fn first_frame_clears_its_rectangle_to_background() {
        let mut surface = SoftwareSurface;
        let mut compositor = Compositor::new(4, 4, true, Some(BG));
        let texture = surface.new_texture(2, 2, &[Rgba::TRANSPARENT; 4]);
        let frame = compositor.composite(&mut surface, Rect::new(1, 1, 2, 2), &texture, None);
        assert_eq!(frame.pixel(1, 1), Some(BG));
        assert_eq!(frame.pixel(0, 0), Some(Rgba::TRANSPARENT));

        let mut compositor = Compositor::new(4, 4, true, Some(BG));
        let transparent = control(DisposalMethod::None, true);
        let frame = compositor.composite(
            &mut surface,
            Rect::new(1, 1, 2, 2),
            &texture,
            Some(&transparent),
        );
        assert_eq!(frame.pixel(1, 1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn restore_background_clears_only_frame_rectangle() {
        let mut surface = SoftwareSurface;
        let mut compositor = Compositor::new(4, 4, true, Some(BG));
        let full = solid(&mut surface, 4, 4, GREEN);
        compositor.composite(&mut surface, Rect::new(0, 0, 4, 4), &full, None);

        let patch = solid(&mut surface, 2, 2, RED);
        let dispose = control(DisposalMethod::RestoreBackground, false);
        let frame = compositor.composite(&mut surface, Rect::new(1, 1, 2, 2), &patch, Some(&dispose));
        assert_eq!(frame.pixel(1, 1), Some(RED));

        let canvas = compositor.canvas().unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let inside = (1..3).contains(&x) && (1..3).contains(&y);
                let expected = if inside { BG } else { GREEN };
                assert_eq!(canvas.pixel(x, y), Some(expected), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn restore_previous_rolls_back_canvas() {
        let mut surface = SoftwareSurface;
        let mut compositor = Compositor::new(2, 1, true, None);
        let base = solid(&mut surface, 2, 1, GREEN);
        compositor.composite(&mut surface, Rect::new(0, 0, 2, 1), &base, None);
        assert!(!compositor.has_snapshot());

        let previous = control(DisposalMethod::RestorePrevious, false);
        let patch = solid(&mut surface, 1, 1, RED);
        let frame = compositor.composite(&mut surface, Rect::new(1, 0, 1, 1), &patch, Some(&previous));
        assert_eq!(frame.pixels(), &[GREEN, RED]);
        assert!(compositor.has_snapshot());
        assert_eq!(compositor.canvas().unwrap().pixels(), &[GREEN, GREEN]);

        // a following restore-to-previous frame keeps the original snapshot
        let frame = compositor.composite(&mut surface, Rect::new(0, 0, 1, 1), &patch, Some(&previous));
        assert_eq!(frame.pixels(), &[RED, GREEN]);
        assert_eq!(compositor.canvas().unwrap().pixels(), &[GREEN, GREEN]);

        // any other disposal discards it
        compositor.composite(&mut surface, Rect::new(0, 0, 1, 1), &patch, None);
        assert!(!compositor.has_snapshot());
        assert_eq!(compositor.canvas().unwrap().pixels(), &[RED, GREEN]);
    }

    #[test]
    fn transparent_texels_keep_canvas() {
        let mut surface = SoftwareSurface;
        let mut compositor = Compositor::new(2, 1, true, None);
        let base = solid(&mut surface, 2, 1, GREEN);
        compositor.composite(&mut surface, Rect::new(0, 0, 2, 1), &base, None);
        let holes = surface.new_texture(2, 1, &[Rgba::TRANSPARENT, RED]);
        let frame = compositor.composite(&mut surface, Rect::new(0, 0, 2, 1), &holes, None);
        assert_eq!(frame.pixels(), &[GREEN, RED]);
    }

    #[test]
    fn frames_are_independent_copies() {
        let mut surface = SoftwareSurface;
        let mut compositor = Compositor::new(1, 1, false, None);
        let red = solid(&mut surface, 1, 1, RED);
        let green = solid(&mut surface, 1, 1, GREEN);
        let first = compositor.composite(&mut surface, Rect::new(0, 0, 1, 1), &red, None);
        let second = compositor.composite(&mut surface, Rect::new(0, 0, 1, 1), &green, None);
        assert_eq!(first.pixels(), &[RED]);
        assert_eq!(second.pixels(), &[GREEN]);
        assert!(!second.has_alpha());
    }
}
