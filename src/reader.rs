//! Cursor over an in-memory GIF byte source.

use nom::error::ErrorKind as NomErrorKind;
use nom::IResult;

use crate::error::{DecodeError, Result};
use crate::gif::Parse;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to an absolute offset. Seeking to the very end is allowed.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(DecodeError::Truncated {
                offset: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    pub fn read(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::Truncated {
                offset: self.data.len(),
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read(len).map(|_| ())
    }

    /// Reads the next data sub-block, returning `None` at the zero-length terminator.
    pub fn read_sub_block(&mut self) -> Result<Option<&'a [u8]>> {
        match self.read_u8()? {
            0 => Ok(None),
            len => self.read(len as usize).map(Some),
        }
    }

    /// Seeks past a sub-block chain, including its terminator.
    pub fn skip_sub_blocks(&mut self) -> Result<()> {
        loop {
            match self.read_u8()? {
                0 => return Ok(()),
                len => self.skip(len as usize)?,
            }
        }
    }

    pub fn parse<T: Parse>(&mut self) -> Result<T> {
        self.parse_with(T::parse)
    }

    /// Runs a nom parser at the cursor and advances past what it consumed.
    pub fn parse_with<T, F>(&mut self, mut parser: F) -> Result<T>
    where
        F: FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
    {
        let input = self.remaining();
        match parser(input) {
            Ok((rest, value)) => {
                self.position += input.len() - rest.len();
                Ok(value)
            }
            Err(nom::Err::Incomplete(_)) => Err(DecodeError::Truncated {
                offset: self.data.len(),
            }),
            Err(nom::Err::Error(err) | nom::Err::Failure(err)) => {
                let offset = self.data.len() - err.input.len();
                Err(match err.code {
                    NomErrorKind::Eof => DecodeError::Truncated { offset },
                    _ => DecodeError::Malformed {
                        offset,
                        what: "structure",
                    },
                })
            }
        }
    }
}
