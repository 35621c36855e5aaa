use nom::combinator::map;
use nom::multi::count;
use nom::number::complete::le_u8;
use nom::sequence::tuple;
use nom::IResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Packs the color as `0xAARRGGBB`.
    pub fn to_argb(self) -> u32 {
        u32::from_be_bytes([self.a, self.r, self.g, self.b])
    }
}

/// Global or local palette. Entries are stored opaque as read from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<Rgba>,
}

impl ColorTable {
    pub fn new(entries: Vec<Rgba>) -> Self {
        Self { entries }
    }

    /// Number of entries encoded by a packed size exponent.
    pub fn len_for_exponent(exponent: u8) -> usize {
        1 << (usize::from(exponent & 0b111) + 1)
    }

    /// Parses `2^(exponent + 1)` RGB triplets.
    pub fn parse(input: &[u8], exponent: u8) -> IResult<&[u8], Self> {
        map(
            count(
                map(tuple((le_u8, le_u8, le_u8)), |(r, g, b)| Rgba::opaque(r, g, b)),
                Self::len_for_exponent(exponent),
            ),
            Self::new,
        )(input)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rgba] {
        &self.entries
    }

    pub fn get(&self, index: u8) -> Option<Rgba> {
        self.entries.get(usize::from(index)).copied()
    }

    /// Maps a palette index to a pixel; indices past the table are transparent.
    pub fn lookup(&self, index: u8) -> Rgba {
        self.get(index).unwrap_or(Rgba::TRANSPARENT)
    }

    /// Runs `f` with the entry at `transparent` replaced by a fully transparent
    /// pixel, then puts the original entry back.
    pub fn with_transparent<T>(
        &mut self,
        transparent: Option<u8>,
        f: impl FnOnce(&ColorTable) -> T,
    ) -> T {
        let saved = transparent.and_then(|index| {
            let slot = self.entries.get_mut(usize::from(index))?;
            Some((index, std::mem::replace(slot, Rgba::TRANSPARENT)))
        });
        let result = f(self);
        if let Some((index, entry)) = saved {
            self.entries[usize::from(index)] = entry;
        }
        result
    }
}
