//! Builders for synthetic GIF streams.

use std::collections::HashMap;

const MAX_CODES: u16 = 4096;

/// Reference encoder. Emits a leading clear code, a clear code whenever the
/// code space is exhausted, and a trailing end-of-information code.
pub fn lzw_encode(min_code_size: u8, data: &[u8]) -> Vec<u16> {
    let clear = 1u16 << min_code_size;
    let seed = || -> HashMap<Vec<u8>, u16> { (0..clear).map(|i| (vec![i as u8], i)).collect() };

    let mut table = seed();
    let mut next = clear + 2;
    let mut codes = vec![clear];
    let mut word: Vec<u8> = Vec::new();
    for &index in data {
        let mut extended = word.clone();
        extended.push(index);
        if table.contains_key(&extended) {
            word = extended;
            continue;
        }
        codes.push(table[&word]);
        if next < MAX_CODES {
            table.insert(extended, next);
            next += 1;
        } else {
            codes.push(clear);
            table = seed();
            next = clear + 2;
        }
        word = vec![index];
    }
    if !word.is_empty() {
        codes.push(table[&word]);
    }
    codes.push(clear + 1);
    codes
}

/// Packs codes LSB-first, tracking the code width a GIF decoder would use.
pub fn pack_codes(min_code_size: u8, codes: &[u16]) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let seeded = usize::from(clear) + 2;
    let mut width = min_code_size + 1;
    let mut len = seeded;
    let mut has_previous = false;

    let mut out = Vec::new();
    let mut acc = 0u32;
    let mut bits = 0u8;
    for &code in codes {
        acc |= u32::from(code) << bits;
        bits += width;
        while bits >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            bits -= 8;
        }

        if code == clear {
            width = min_code_size + 1;
            len = seeded;
            has_previous = false;
        } else if code != clear + 1 {
            if has_previous && len < usize::from(MAX_CODES) {
                len += 1;
                if len >= 1 << width && width < 12 {
                    width += 1;
                }
            }
            has_previous = true;
        }
    }
    if bits > 0 {
        out.push(acc as u8);
    }
    out
}

/// Splits `data` into sub-blocks of at most `chunk` bytes plus a terminator.
pub fn sub_blocks(data: &[u8], chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for block in data.chunks(chunk) {
        out.push(block.len() as u8);
        out.extend_from_slice(block);
    }
    out.push(0);
    out
}

fn table_exponent(len: usize) -> u8 {
    assert!(len.is_power_of_two() && (2..=256).contains(&len));
    len.trailing_zeros() as u8 - 1
}

fn push_table(out: &mut Vec<u8>, table: &[[u8; 3]]) {
    for entry in table {
        out.extend_from_slice(entry);
    }
}

/// Image block parameters for [`GifBuilder::image`].
pub struct ImageSpec<'a> {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub local_table: Option<&'a [[u8; 3]]>,
    pub interlaced: bool,
    pub min_code_size: u8,
    pub indices: &'a [u8],
}

impl<'a> ImageSpec<'a> {
    pub fn new(width: u16, height: u16, indices: &'a [u8]) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
            local_table: None,
            interlaced: false,
            min_code_size: 2,
            indices,
        }
    }

    pub fn at(mut self, left: u16, top: u16) -> Self {
        self.left = left;
        self.top = top;
        self
    }
}

pub struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    pub fn new(version: &[u8; 3], width: u16, height: u16) -> Self {
        Self::with_table(version, width, height, None, 0)
    }

    pub fn with_table(
        version: &[u8; 3],
        width: u16,
        height: u16,
        global: Option<&[[u8; 3]]>,
        background: u8,
    ) -> Self {
        let mut bytes = b"GIF".to_vec();
        bytes.extend_from_slice(version);
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        let flags = global.map_or(0, |t| 0b1000_0000 | 0b0111_0000 | table_exponent(t.len()));
        bytes.extend_from_slice(&[flags, background, 0]);
        if let Some(table) = global {
            push_table(&mut bytes, table);
        }
        Self { bytes }
    }

    pub fn netscape(mut self, loop_count: u16) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xFF, 11]);
        self.bytes.extend_from_slice(b"NETSCAPE2.0");
        self.bytes.extend_from_slice(&[3, 1]);
        self.bytes.extend_from_slice(&loop_count.to_le_bytes());
        self.bytes.push(0);
        self
    }

    pub fn graphic_control(mut self, disposal: u8, transparent: Option<u8>, delay: u16) -> Self {
        let flags = (disposal << 2) | u8::from(transparent.is_some());
        self.bytes.extend_from_slice(&[0x21, 0xF9, 4, flags]);
        self.bytes.extend_from_slice(&delay.to_le_bytes());
        self.bytes.extend_from_slice(&[transparent.unwrap_or(0), 0]);
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xFE]);
        self.bytes.extend(sub_blocks(text.as_bytes(), 4));
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn image(mut self, spec: ImageSpec<'_>) -> Self {
        self.bytes.push(0x2C);
        for value in [spec.left, spec.top, spec.width, spec.height] {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
        let mut flags = 0;
        if spec.interlaced {
            flags |= 0b0100_0000;
        }
        if let Some(table) = spec.local_table {
            flags |= 0b1000_0000 | table_exponent(table.len());
        }
        self.bytes.push(flags);
        if let Some(table) = spec.local_table {
            push_table(&mut self.bytes, table);
        }

        // image rows are stored in interlace order
        let mut rows: Vec<usize> = (0..usize::from(spec.height)).collect();
        if spec.interlaced {
            rows = crate::raster::RowOrder::new(u32::from(spec.height), true)
                .map(|row| row as usize)
                .collect();
        }
        let width = usize::from(spec.width);
        let stream: Vec<u8> = rows
            .iter()
            .flat_map(|&row| spec.indices[row * width..(row + 1) * width].iter().copied())
            .collect();

        self.bytes.push(spec.min_code_size);
        let packed = pack_codes(spec.min_code_size, &lzw_encode(spec.min_code_size, &stream));
        self.bytes.extend(sub_blocks(&packed, 255));
        self
    }

    pub fn trailer(mut self) -> Self {
        self.bytes.push(0x3B);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}
