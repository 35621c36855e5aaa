use std::io;

use thiserror::Error;

/// Broad classes of decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Signature, version or structural violation.
    Format,
    /// Attempt to read past the end of the source.
    Bounds,
    /// Caller supplied options were rejected.
    Argument,
    /// Dimensions exceed what the decoder is willing to allocate.
    Limit,
    /// The source could not be loaded.
    Io,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid signature at offset {offset}, expected \"GIF\"")]
    InvalidSignature { offset: usize },
    #[error("unsupported GIF version {version:?} at offset {offset}")]
    UnsupportedVersion { offset: usize, version: String },
    #[error("graphic control extension at offset {offset} has block size {size}, expected 4")]
    GraphicControlSize { offset: usize, size: u8 },
    #[error("application extension at offset {offset} has block size {size}, expected 11")]
    ApplicationSize { offset: usize, size: u8 },
    #[error("unknown block identifier 0x{identifier:02X} at offset {offset}")]
    UnknownBlock { offset: usize, identifier: u8 },
    #[error("image block at offset {offset} has neither a local nor a global color table")]
    MissingColorTable { offset: usize },
    #[error("invalid LZW minimum code size {size} at offset {offset}")]
    InvalidCodeSize { offset: usize, size: u8 },
    #[error("invalid LZW code {code} at offset {offset}")]
    InvalidCode { offset: usize, code: u16 },
    #[error("malformed {what} at offset {offset}")]
    Malformed { offset: usize, what: &'static str },
    #[error("unexpected end of data at offset {offset}")]
    Truncated { offset: usize },
    #[error("{width}x{height} pixels requested at offset {offset} exceed the decoder limit")]
    TooLarge {
        offset: usize,
        width: u32,
        height: u32,
    },
    #[error("no image data before offset {offset}")]
    NoImage { offset: usize },
    #[error("invalid argument: {0}")]
    Argument(&'static str),
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Truncated { .. } => ErrorKind::Bounds,
            Self::Argument(_) => ErrorKind::Argument,
            Self::TooLarge { .. } => ErrorKind::Limit,
            Self::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Format,
        }
    }

    /// Byte offset in the source where the failure was detected, if known.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            Self::InvalidSignature { offset }
            | Self::UnsupportedVersion { offset, .. }
            | Self::GraphicControlSize { offset, .. }
            | Self::ApplicationSize { offset, .. }
            | Self::UnknownBlock { offset, .. }
            | Self::MissingColorTable { offset }
            | Self::InvalidCodeSize { offset, .. }
            | Self::InvalidCode { offset, .. }
            | Self::Malformed { offset, .. }
            | Self::Truncated { offset }
            | Self::TooLarge { offset, .. }
            | Self::NoImage { offset } => Some(offset),
            Self::Argument(_) | Self::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
