use bytes::BufMut;
use schem_common::VarIntError;

/// A u32 never needs more than five 7-bit groups.
pub const MAX_VARINT_LEN: usize = 5;

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

/// Writes a VarInt: 7 bits per byte, least significant group first, with the
/// continuation bit set on every byte but the last.
///
/// Multi-byte values are emitted as one big-endian `u16`/`u32` store where possible,
/// which lays the groups out in the same order as writing them one at a time.
pub fn write_varint<B: BufMut>(buf: &mut B, value: u32) {
    let group = |shift: u32| (value >> shift) & 0x7F;
    match encoded_len(value) {
        1 => buf.put_u8(value as u8),
        2 => buf.put_u16(((group(0) | 0x80) << 8 | value >> 7) as u16),
        3 => {
            buf.put_u16(((group(0) | 0x80) << 8 | group(7) | 0x80) as u16);
            buf.put_u8((value >> 14) as u8);
        }
        4 => buf.put_u32(
            (group(0) | 0x80) << 24 | (group(7) | 0x80) << 16 | (group(14) | 0x80) << 8 | value >> 21,
        ),
        _ => {
            buf.put_u32(
                (group(0) | 0x80) << 24
                    | (group(7) | 0x80) << 16
                    | (group(14) | 0x80) << 8
                    | group(21)
                    | 0x80,
            );
            buf.put_u8((value >> 28) as u8);
        }
    }
}

pub fn encode(value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    write_varint(&mut out, value);
    out
}

/// Decodes the VarInt starting at `position`, returning the value and the number
/// of bytes it took.
pub fn decode(bytes: &[u8], position: usize) -> Result<(u32, usize), VarIntError> {
    let mut result: u32 = 0;

    for i in 0..MAX_VARINT_LEN {
        let byte = *bytes.get(position + i).ok_or(VarIntError::Truncated)?;
        result |= ((byte & 0x7F) as u32) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(VarIntError::TooLong)
}

/// Sequential VarInt reader over a byte slice.
#[derive(Debug)]
pub struct VarIntReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> VarIntReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub fn read_varint(&mut self) -> Result<u32, VarIntError> {
        let (value, consumed) = decode(self.bytes, self.cursor)?;
        self.cursor += consumed;
        Ok(value)
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

impl Iterator for VarIntReader<'_> {
    type Item = Result<u32, VarIntError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            None
        } else {
            Some(self.read_varint())
        }
    }
}
