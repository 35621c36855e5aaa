//! GIF format
//! <https://en.wikipedia.org/wiki/GIF>

use log::{debug, trace, warn};
use nom::bits::bits;
use nom::combinator::map;
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::tuple;
use nom::IResult;

use crate::animation::{Animation, Decoded, Frame, Still};
use crate::color::{ColorTable, Rgba};
use crate::compositor::Compositor;
use crate::error::{DecodeError, Result};
use crate::extension::{self, ExtensionState};
use crate::lzw;
use crate::reader::ByteReader;
use crate::surface::{Rect, RenderSurface};
use crate::DecodeOptions;

pub trait Parse
where
    Self: Sized,
{
    fn parse(input: &[u8]) -> IResult<&[u8], Self>;
}

pub const SIGNATURE: &[u8] = b"GIF";
pub const EXTENSION_INTRODUCER: u8 = b'!';
pub const IMAGE_SEPARATOR: u8 = b',';
pub const TRAILER: u8 = b';';

/// Largest canvas or padded image texture the decoder allocates, in pixels.
pub const MAX_PIXELS: u64 = 1 << 26;

fn check_size(offset: usize, width: u32, height: u32) -> Result<()> {
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(DecodeError::TooLarge {
            offset,
            width,
            height,
        });
    }
    Ok(())
}

type BitInput<'a> = (&'a [u8], usize);

/// One bit of a packed field, most significant first.
pub(crate) fn flag(input: BitInput<'_>) -> IResult<BitInput<'_>, bool> {
    map(nom::bits::complete::take(1usize), |bit: u8| bit == 1)(input)
}

/// `N` bits of a packed field, most significant first.
pub(crate) fn field<const N: usize>(input: BitInput<'_>) -> IResult<BitInput<'_>, u8> {
    nom::bits::complete::take(N)(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Gif87a,
    Gif89a,
}

impl Version {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"87a" => Some(Self::Gif87a),
            b"89a" => Some(Self::Gif89a),
            _ => None,
        }
    }

    /// Only 89a canvases carry an alpha channel.
    pub fn has_alpha(self) -> bool {
        self == Self::Gif89a
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    pub width: u16,
    pub height: u16,
    pub global_color_table: bool,
    pub color_resolution: u8,
    pub sorted: bool,
    pub global_color_table_exponent: u8,
    pub background_index: u8,
    pub pixel_aspect_ratio: u8,
}

impl LogicalScreenDescriptor {
    /// Size exponent of the global color table, if one follows.
    pub fn global_color_table(&self) -> Option<u8> {
        self.global_color_table
            .then_some(self.global_color_table_exponent)
    }
}

impl Parse for LogicalScreenDescriptor {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        map(
            tuple((
                le_u16,
                le_u16,
                bits(tuple((flag, field::<3>, flag, field::<3>))),
                le_u8,
                le_u8,
            )),
            |(width, height, (global, resolution, sorted, exponent), background, aspect)| Self {
                width,
                height,
                global_color_table: global,
                color_resolution: resolution + 1,
                sorted,
                global_color_table_exponent: exponent,
                background_index: background,
                pixel_aspect_ratio: aspect,
            },
        )(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// Size exponent of the local color table, if one follows.
    pub local_color_table: Option<u8>,
    pub interlaced: bool,
    pub sorted: bool,
}

impl ImageDescriptor {
    pub fn rect(&self) -> Rect {
        Rect::new(
            u32::from(self.left),
            u32::from(self.top),
            u32::from(self.width),
            u32::from(self.height),
        )
    }
}

impl Parse for ImageDescriptor {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        map(
            tuple((
                le_u16,
                le_u16,
                le_u16,
                le_u16,
                bits(tuple((flag, flag, flag, field::<2>, field::<3>))),
            )),
            |(left, top, width, height, (local, interlaced, sorted, _reserved, exponent))| Self {
                left,
                top,
                width,
                height,
                local_color_table: local.then_some(exponent),
                interlaced,
                sorted,
            },
        )(input)
    }
}

/// Walks the block structure of one GIF file and composites its frames.
pub struct Decoder<'a> {
    reader: ByteReader<'a>,
    options: DecodeOptions,
    version: Version,
    screen: LogicalScreenDescriptor,
    global_table: Option<ColorTable>,
    background: Option<Rgba>,
    extensions: ExtensionState,
}

impl<'a> Decoder<'a> {
    /// Validates options, then reads the header, the Logical Screen Descriptor
    /// and the global color table.
    pub fn new(data: &'a [u8], options: DecodeOptions) -> Result<Self> {
        options.validate()?;
        let mut reader = ByteReader::new(data);

        let signature = reader.read(SIGNATURE.len())?;
        if signature != SIGNATURE {
            return Err(DecodeError::InvalidSignature { offset: 0 });
        }
        let offset = reader.position();
        let version_bytes = reader.read(3)?;
        let version = Version::from_bytes(version_bytes).ok_or_else(|| {
            DecodeError::UnsupportedVersion {
                offset,
                version: String::from_utf8_lossy(version_bytes).into_owned(),
            }
        })?;

        let screen_offset = reader.position();
        let screen: LogicalScreenDescriptor = reader.parse()?;
        check_size(
            screen_offset,
            u32::from(screen.width),
            u32::from(screen.height),
        )?;
        let global_table = match screen.global_color_table() {
            Some(exponent) => Some(reader.parse_with(|input| ColorTable::parse(input, exponent))?),
            None => None,
        };
        let background = global_table.as_ref().map(|table| {
            table.get(screen.background_index).unwrap_or_else(|| {
                warn!(
                    "background index {} is outside the global color table",
                    screen.background_index
                );
                Rgba::TRANSPARENT
            })
        });
        debug!(
            "{:?} {}x{}, global table: {:?}, background: {:?}",
            version,
            screen.width,
            screen.height,
            global_table.as_ref().map(ColorTable::len),
            background.map(|color| format!("{:08X}", color.to_argb())),
        );

        Ok(Self {
            reader,
            options,
            version,
            screen,
            global_table,
            background,
            extensions: ExtensionState::default(),
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn screen(&self) -> &LogicalScreenDescriptor {
        &self.screen
    }

    pub fn global_color_table(&self) -> Option<&ColorTable> {
        self.global_table.as_ref()
    }

    /// Background color from the global table.
    pub fn background(&self) -> Option<Rgba> {
        self.background
    }

    /// Reads blocks up to the trailer, compositing every image through `surface`.
    pub fn decode<S: RenderSurface>(mut self, surface: &mut S) -> Result<Decoded<S::Image>> {
        let mut compositor = Compositor::new(
            self.screen.width,
            self.screen.height,
            self.version.has_alpha(),
            self.background,
        );
        let mut frames = Vec::new();

        loop {
            let offset = self.reader.position();
            match self.reader.read_u8()? {
                EXTENSION_INTRODUCER => extension::read_extension(
                    &mut self.reader,
                    &mut self.extensions,
                    &self.options,
                )?,
                IMAGE_SEPARATOR => {
                    let frame = self.read_image(surface, &mut compositor, offset)?;
                    frames.push(frame);
                    if self.options.max_frames == Some(frames.len()) {
                        debug!("stopping after {} frames", frames.len());
                        break;
                    }
                }
                TRAILER => break,
                identifier => return Err(DecodeError::UnknownBlock { offset, identifier }),
            }
        }

        let (width, height) = (self.screen.width, self.screen.height);
        let comments = std::mem::take(&mut self.extensions.comments);
        if self.extensions.is_animation {
            return Ok(Decoded::Animation(Animation {
                width,
                height,
                loop_count: self.extensions.loop_count,
                comments,
                frames,
            }));
        }
        let image = frames.pop().ok_or(DecodeError::NoImage {
            offset: self.reader.position(),
        })?;
        Ok(Decoded::Still(Still {
            width,
            height,
            image: image.image,
            comments,
        }))
    }

    fn read_image<S: RenderSurface>(
        &mut self,
        surface: &mut S,
        compositor: &mut Compositor<S::Image>,
        offset: usize,
    ) -> Result<Frame<S::Image>> {
        let descriptor: ImageDescriptor = self.reader.parse()?;
        check_size(
            offset,
            u32::from(descriptor.width).next_power_of_two(),
            u32::from(descriptor.height).next_power_of_two(),
        )?;
        let mut local_table = match descriptor.local_color_table {
            Some(exponent) => Some(
                self.reader
                    .parse_with(|input| ColorTable::parse(input, exponent))?,
            ),
            None => None,
        };
        let control = self.extensions.take_graphic_control();
        trace!("image at offset {}: {:?}, control: {:?}", offset, descriptor, control);

        let table = match local_table.as_mut() {
            Some(table) => table,
            None => self
                .global_table
                .as_mut()
                .ok_or(DecodeError::MissingColorTable { offset })?,
        };
        let transparent = control.as_ref().and_then(|control| control.transparent_index());
        let reader = &mut self.reader;
        let bitmap = table.with_transparent(transparent, |table| {
            lzw::decode_image(reader, offset, &descriptor, table)
        })?;

        let texture = surface.new_texture(bitmap.width, bitmap.height, &bitmap.pixels);
        let image = compositor.composite(surface, descriptor.rect(), &texture, control.as_ref());
        let delay = if self.extensions.is_animation {
            control.as_ref().map(|control| control.delay())
        } else {
            None
        };
        Ok(Frame { image, delay })
    }
}
