//! Variable-width LZW decoding of GIF image data.

use log::warn;

use crate::color::ColorTable;
use crate::error::{DecodeError, Result};
use crate::gif::ImageDescriptor;
use crate::raster::{Bitmap, Raster};
use crate::reader::ByteReader;

pub const MAX_CODE_WIDTH: u8 = 12;
const MAX_CODES: usize = 1 << MAX_CODE_WIDTH;
const NO_PREFIX: u16 = u16::MAX;

/// Code to payload mapping. Payloads are stored as prefix chains.
#[derive(Debug, Clone)]
pub struct Dictionary {
    min_code_size: u8,
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    first: Vec<u8>,
    lengths: Vec<u16>,
}

impl Dictionary {
    pub fn new(min_code_size: u8) -> Self {
        let mut dictionary = Self {
            min_code_size,
            prefix: Vec::with_capacity(MAX_CODES),
            suffix: Vec::with_capacity(MAX_CODES),
            first: Vec::with_capacity(MAX_CODES),
            lengths: Vec::with_capacity(MAX_CODES),
        };
        for index in 0..dictionary.clear_code() {
            dictionary.insert(NO_PREFIX, index as u8, index as u8, 1);
        }
        // clear and end-of-information carry no payload
        dictionary.insert(NO_PREFIX, 0, 0, 0);
        dictionary.insert(NO_PREFIX, 0, 0, 0);
        dictionary
    }

    pub fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    pub fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    pub fn seeded_len(&self) -> usize {
        usize::from(self.clear_code()) + 2
    }

    /// Number of assigned codes, sentinels included. Also the next code to assign.
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= MAX_CODES
    }

    pub fn contains(&self, code: u16) -> bool {
        usize::from(code) < self.len()
    }

    pub fn reset(&mut self) {
        let len = self.seeded_len();
        self.prefix.truncate(len);
        self.suffix.truncate(len);
        self.first.truncate(len);
        self.lengths.truncate(len);
    }

    /// Appends the entry `payload(prefix) ++ [suffix]`. Ignored once full.
    pub fn push(&mut self, prefix: u16, suffix: u8) {
        if self.is_full() {
            return;
        }
        let p = usize::from(prefix);
        let (first, len) = (self.first[p], self.lengths[p] + 1);
        self.insert(prefix, suffix, first, len);
    }

    pub fn first_byte(&self, code: u16) -> u8 {
        self.first[usize::from(code)]
    }

    /// Appends the payload of `code` to `out`.
    pub fn write(&self, code: u16, out: &mut Vec<u8>) {
        let len = usize::from(self.lengths[usize::from(code)]);
        let start = out.len();
        out.resize(start + len, 0);
        let mut current = code;
        for slot in out[start..].iter_mut().rev() {
            let c = usize::from(current);
            *slot = self.suffix[c];
            current = self.prefix[c];
        }
    }

    fn insert(&mut self, prefix: u16, suffix: u8, first: u8, len: u16) {
        self.prefix.push(prefix);
        self.suffix.push(suffix);
        self.first.push(first);
        self.lengths.push(len);
    }
}

/// What a single code did to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A root code naming one palette index.
    Seeded,
    Clear,
    End,
    /// A previously grown dictionary entry.
    Known,
    /// The code about to be assigned, resolved from the previous code.
    KwKwK,
}

#[derive(Debug, Clone)]
pub struct LzwDecoder {
    dictionary: Dictionary,
    min_code_size: u8,
    code_width: u8,
    previous: Option<u16>,
}

impl LzwDecoder {
    /// `min_code_size` must lie in `1..=8`.
    pub fn new(min_code_size: u8) -> Self {
        Self {
            dictionary: Dictionary::new(min_code_size),
            min_code_size,
            code_width: min_code_size + 1,
            previous: None,
        }
    }

    pub fn code_width(&self) -> u8 {
        self.code_width
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Feeds one code, appending its payload to `out`. Returns `None` for a
    /// code that can not be resolved.
    pub fn step(&mut self, code: u16, out: &mut Vec<u8>) -> Option<Step> {
        if code == self.dictionary.clear_code() {
            self.dictionary.reset();
            self.code_width = self.min_code_size + 1;
            self.previous = None;
            return Some(Step::Clear);
        }
        if code == self.dictionary.end_code() {
            return Some(Step::End);
        }

        let step = if self.dictionary.contains(code) {
            self.dictionary.write(code, out);
            if let Some(previous) = self.previous {
                self.grow(previous, self.dictionary.first_byte(code));
            }
            if code < self.dictionary.clear_code() {
                Step::Seeded
            } else {
                Step::Known
            }
        } else if usize::from(code) == self.dictionary.len() {
            let previous = self.previous?;
            let first = self.dictionary.first_byte(previous);
            self.dictionary.write(previous, out);
            out.push(first);
            self.grow(previous, first);
            Step::KwKwK
        } else {
            return None;
        };

        self.previous = Some(code);
        Some(step)
    }

    fn grow(&mut self, prefix: u16, suffix: u8) {
        if self.dictionary.is_full() {
            return;
        }
        self.dictionary.push(prefix, suffix);
        if self.dictionary.len() >= 1 << self.code_width && self.code_width < MAX_CODE_WIDTH {
            self.code_width += 1;
        }
    }
}

/// LSB-first code unpacker over a sub-block chain.
#[derive(Debug)]
pub struct CodeReader<'r, 'a> {
    reader: &'r mut ByteReader<'a>,
    block: &'a [u8],
    buffer: u32,
    bits: u8,
    finished: bool,
}

impl<'r, 'a> CodeReader<'r, 'a> {
    pub fn new(reader: &'r mut ByteReader<'a>) -> Self {
        Self {
            reader,
            block: &[],
            buffer: 0,
            bits: 0,
            finished: false,
        }
    }

    pub fn position(&self) -> usize {
        self.reader.position() - self.block.len()
    }

    /// Reads a `width`-bit code, or `None` once the chain is exhausted.
    pub fn read_code(&mut self, width: u8) -> Result<Option<u16>> {
        while self.bits < width {
            match self.next_byte()? {
                Some(byte) => {
                    self.buffer |= u32::from(byte) << self.bits;
                    self.bits += 8;
                }
                None => return Ok(None),
            }
        }
        let code = (self.buffer & ((1 << width) - 1)) as u16;
        self.buffer >>= width;
        self.bits -= width;
        Ok(Some(code))
    }

    /// Discards unread data and consumes the chain up to its terminator.
    pub fn finish(self) -> Result<()> {
        if self.finished {
            Ok(())
        } else {
            self.reader.skip_sub_blocks()
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        loop {
            if let Some((&byte, rest)) = self.block.split_first() {
                self.block = rest;
                return Ok(Some(byte));
            }
            if self.finished {
                return Ok(None);
            }
            match self.reader.read_sub_block()? {
                Some(block) => self.block = block,
                None => self.finished = true,
            }
        }
    }
}

/// Lazy stream of palette indices decoded from one image data chain.
#[derive(Debug)]
pub struct Indices<'r, 'a> {
    codes: CodeReader<'r, 'a>,
    decoder: LzwDecoder,
    payload: Vec<u8>,
    cursor: usize,
    done: bool,
}

impl<'r, 'a> Indices<'r, 'a> {
    /// Reads the minimum code size byte and prepares the stream.
    pub fn new(reader: &'r mut ByteReader<'a>) -> Result<Self> {
        let offset = reader.position();
        let size = reader.read_u8()?;
        if !(1..=8).contains(&size) {
            return Err(DecodeError::InvalidCodeSize { offset, size });
        }
        Ok(Self {
            codes: CodeReader::new(reader),
            decoder: LzwDecoder::new(size),
            payload: Vec::new(),
            cursor: 0,
            done: false,
        })
    }

    pub fn finish(self) -> Result<()> {
        self.codes.finish()
    }

    fn refill(&mut self) -> Result<()> {
        self.payload.clear();
        self.cursor = 0;
        let offset = self.codes.position();
        let Some(code) = self.codes.read_code(self.decoder.code_width())? else {
            warn!("image data at offset {} ended without an end-of-information code", offset);
            self.done = true;
            return Ok(());
        };
        match self.decoder.step(code, &mut self.payload) {
            Some(Step::End) => self.done = true,
            Some(_) => {}
            None => return Err(DecodeError::InvalidCode { offset, code }),
        }
        Ok(())
    }
}

impl Iterator for Indices<'_, '_> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Result<u8>> {
        loop {
            if let Some(&index) = self.payload.get(self.cursor) {
                self.cursor += 1;
                return Some(Ok(index));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.refill() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

/// Decodes the image data following `descriptor` through `table` into a
/// padded, interlace-corrected bitmap. `offset` locates the image block.
pub fn decode_image(
    reader: &mut ByteReader<'_>,
    offset: usize,
    descriptor: &ImageDescriptor,
    table: &ColorTable,
) -> Result<Bitmap> {
    let mut raster = Raster::new(descriptor.width, descriptor.height, descriptor.interlaced)
        .ok_or(DecodeError::TooLarge {
            offset,
            width: u32::from(descriptor.width),
            height: u32::from(descriptor.height),
        })?;
    let mut indices = Indices::new(reader)?;
    while !raster.is_complete() {
        match indices.next() {
            Some(index) => {
                raster.put(table.lookup(index?));
            }
            None => break,
        }
    }
    indices.finish()?;
    Ok(raster.finish())
}
