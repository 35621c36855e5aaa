//! Decodes GIF87a/GIF89a files into fully composited frames.
//!
//! Frames are rendered through a [`RenderSurface`], so the same decoder can
//! target an in-memory buffer ([`SoftwareSurface`]) or a graphics backend.
//!
//! ```no_run
//! use gifplay::{decode_file, DecodeOptions, SoftwareSurface};
//!
//! let decoded = decode_file("cat.gif", &DecodeOptions::default(), &mut SoftwareSurface)?;
//! println!("{}x{}, animated: {}", decoded.width(), decoded.height(), decoded.is_animation());
//! # Ok::<(), gifplay::DecodeError>(())
//! ```

use std::path::Path;

pub mod animation;
pub mod color;
pub mod compositor;
pub mod error;
pub mod extension;
pub mod gif;
pub mod lzw;
pub mod raster;
pub mod reader;
pub mod surface;

#[cfg(test)]
mod testutil;

pub use animation::{Animation, Decoded, Frame, Still};
pub use color::{ColorTable, Rgba};
pub use error::{DecodeError, ErrorKind, Result};
pub use extension::DisposalMethod;
pub use gif::{Decoder, Version};
pub use surface::{BlendMode, Rect, RenderSurface, RgbaImage, SoftwareSurface};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Skip Comment extensions instead of collecting them.
    pub ignore_comments: bool,
    /// Stop after this many frames, as if the trailer had been reached.
    pub max_frames: Option<usize>,
}

impl DecodeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_frames == Some(0) {
            return Err(DecodeError::Argument("max_frames must be at least 1"));
        }
        Ok(())
    }
}

/// Decodes a complete GIF held in memory.
pub fn decode<S: RenderSurface>(
    data: &[u8],
    options: &DecodeOptions,
    surface: &mut S,
) -> Result<Decoded<S::Image>> {
    Decoder::new(data, options.clone())?.decode(surface)
}

/// Reads a whole file into memory and decodes it.
pub fn decode_file<S: RenderSurface>(
    path: impl AsRef<Path>,
    options: &DecodeOptions,
    surface: &mut S,
) -> Result<Decoded<S::Image>> {
    options.validate()?;
    let data = std::fs::read(path)?;
    decode(&data, options, surface)
}
