//! Graphic Control, Application and Comment extension blocks.

use std::time::Duration;

use log::{debug, warn};
use nom::bits::bits;
use nom::combinator::map;
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::tuple;
use nom::IResult;

use crate::error::{DecodeError, Result};
use crate::gif::{field, flag, Parse};
use crate::reader::ByteReader;
use crate::DecodeOptions;

pub const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
pub const APPLICATION_LABEL: u8 = 0xFF;
pub const COMMENT_LABEL: u8 = 0xFE;

const GRAPHIC_CONTROL_SIZE: u8 = 4;
const APPLICATION_SIZE: u8 = 11;
const NETSCAPE_IDENTIFIER: &[u8] = b"NETSCAPE";
const NETSCAPE_AUTHENTICATION: &[u8] = b"2.0";
const NETSCAPE_LOOP_BLOCK: u8 = 1;

/// What happens to the canvas after a frame has been shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    #[default]
    None,
    DoNotDispose,
    RestoreBackground,
    RestorePrevious,
}

impl DisposalMethod {
    /// Reserved values are treated as `None`.
    pub fn from_bits(value: u8) -> Self {
        match value {
            1 => Self::DoNotDispose,
            2 => Self::RestoreBackground,
            3 => Self::RestorePrevious,
            _ => Self::None,
        }
    }
}

/// Contents of a Graphic Control Extension; applies to the next image block only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicControl {
    pub disposal: DisposalMethod,
    pub user_input: bool,
    pub transparent: bool,
    /// In hundredths of a second.
    pub delay: u16,
    pub transparent_index: u8,
}

impl GraphicControl {
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent.then_some(self.transparent_index)
    }

    /// Delay in milliseconds, ten per unit.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.delay) * 10)
    }
}

impl Parse for GraphicControl {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        map(
            tuple((
                bits(tuple((field::<3>, field::<3>, flag, flag))),
                le_u16,
                le_u8,
            )),
            |((_reserved, disposal, user_input, transparent), delay, transparent_index)| Self {
                disposal: DisposalMethod::from_bits(disposal),
                user_input,
                transparent,
                delay,
                transparent_index,
            },
        )(input)
    }
}

/// State mutated by extension blocks over the course of one decode.
#[derive(Debug, Clone, Default)]
pub struct ExtensionState {
    pending: Option<GraphicControl>,
    pub is_animation: bool,
    pub loop_count: Option<u16>,
    pub comments: Vec<String>,
}

impl ExtensionState {
    pub fn pending(&self) -> Option<&GraphicControl> {
        self.pending.as_ref()
    }

    /// Hands the pending Graphic Control to the image block about to be drawn.
    pub fn take_graphic_control(&mut self) -> Option<GraphicControl> {
        self.pending.take()
    }
}

/// Handles one extension block. The reader must be positioned just after
/// the 0x21 introducer.
pub fn read_extension(
    reader: &mut ByteReader<'_>,
    state: &mut ExtensionState,
    options: &DecodeOptions,
) -> Result<()> {
    let label = reader.read_u8()?;
    match label {
        GRAPHIC_CONTROL_LABEL => read_graphic_control(reader, state),
        APPLICATION_LABEL => read_application(reader, state),
        COMMENT_LABEL if options.ignore_comments => reader.skip_sub_blocks(),
        COMMENT_LABEL => {
            let mut text = Vec::new();
            while let Some(block) = reader.read_sub_block()? {
                text.extend_from_slice(block);
            }
            let comment = String::from_utf8_lossy(&text).into_owned();
            debug!("comment: {:?}", comment);
            state.comments.push(comment);
            Ok(())
        }
        label => {
            debug!(
                "skipping extension 0x{:02X} at offset {}",
                label,
                reader.position()
            );
            reader.skip_sub_blocks()
        }
    }
}

fn read_graphic_control(reader: &mut ByteReader<'_>, state: &mut ExtensionState) -> Result<()> {
    let offset = reader.position();
    let size = reader.read_u8()?;
    if size != GRAPHIC_CONTROL_SIZE {
        return Err(DecodeError::GraphicControlSize { offset, size });
    }
    let control: GraphicControl = reader.parse()?;
    reader.skip_sub_blocks()?;
    debug!("graphic control: {:?}", control);
    if state.pending.replace(control).is_some() {
        debug!("graphic control at offset {} replaces an unused one", offset);
    }
    Ok(())
}

fn read_application(reader: &mut ByteReader<'_>, state: &mut ExtensionState) -> Result<()> {
    let offset = reader.position();
    let size = reader.read_u8()?;
    if size != APPLICATION_SIZE {
        return Err(DecodeError::ApplicationSize { offset, size });
    }
    let identifier = reader.read(8)?;
    let authentication = reader.read(3)?;
    if identifier != NETSCAPE_IDENTIFIER || authentication != NETSCAPE_AUTHENTICATION {
        debug!(
            "skipping application extension {:?}",
            String::from_utf8_lossy(identifier)
        );
        return reader.skip_sub_blocks();
    }

    if let Some(block) = reader.read_sub_block()? {
        match block {
            [NETSCAPE_LOOP_BLOCK, low, high, ..] => {
                let loop_count = u16::from_le_bytes([*low, *high]);
                debug!("netscape loop count {}", loop_count);
                state.is_animation = true;
                state.loop_count = Some(loop_count);
            }
            [NETSCAPE_LOOP_BLOCK, ..] => {
                warn!("netscape loop block at offset {} is too short", offset);
            }
            _ => {}
        }
        reader.skip_sub_blocks()?;
    }
    Ok(())
}
