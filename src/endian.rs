//! Fixed-width two's-complement integers at arbitrary buffer offsets.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegyError};

/// Byte order of every binary field and sample in a file.
///
/// Big-endian is the historical SEG-Y convention and the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

fn check_bounds(buf: &[u8], offset: usize, width: usize) -> Result<()> {
    if offset + width > buf.len() {
        return Err(SegyError::TruncatedBuffer {
            offset: offset as u64,
            needed: width,
        });
    }
    Ok(())
}

/// Decode a signed 2- or 4-byte integer at `offset`.
///
/// # Panics
/// If `width` is not 2 or 4.  Widths come from the field tables, so any
/// other value is a programming error.
pub fn read_int(buf: &[u8], offset: usize, width: usize, endian: Endianness) -> Result<i32> {
    check_bounds(buf, offset, width)?;
    let bytes = &buf[offset..offset + width];
    Ok(match (width, endian) {
        (2, Endianness::Big)    => BigEndian::read_i16(bytes) as i32,
        (2, Endianness::Little) => LittleEndian::read_i16(bytes) as i32,
        (4, Endianness::Big)    => BigEndian::read_i32(bytes),
        (4, Endianness::Little) => LittleEndian::read_i32(bytes),
        _ => unreachable!("field width must be 2 or 4, got {width}"),
    })
}

/// Encode `value` as a signed 2- or 4-byte integer at `offset`.
/// 2-byte fields keep the low 16 bits.
pub fn write_int(buf: &mut [u8], offset: usize, width: usize, value: i32, endian: Endianness) -> Result<()> {
    check_bounds(buf, offset, width)?;
    let bytes = &mut buf[offset..offset + width];
    match (width, endian) {
        (2, Endianness::Big)    => BigEndian::write_i16(bytes, value as i16),
        (2, Endianness::Little) => LittleEndian::write_i16(bytes, value as i16),
        (4, Endianness::Big)    => BigEndian::write_i32(bytes, value),
        (4, Endianness::Little) => LittleEndian::write_i32(bytes, value),
        _ => unreachable!("field width must be 2 or 4, got {width}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_both_orders() {
        let buf = [0xFF, 0xFE, 0x00, 0x01];
        assert_eq!(read_int(&buf, 0, 2, Endianness::Big).unwrap(), -2);
        assert_eq!(read_int(&buf, 0, 2, Endianness::Little).unwrap(), -257);
        assert_eq!(read_int(&buf, 0, 4, Endianness::Big).unwrap(), 0xFFFE_0001u32 as i32);
        assert_eq!(read_int(&buf, 2, 2, Endianness::Little).unwrap(), 256);
    }

    #[test]
    fn write_then_read() {
        let mut buf = [0u8; 8];
        write_int(&mut buf, 4, 4, -123_456, Endianness::Little).unwrap();
        write_int(&mut buf, 0, 2, -7, Endianness::Big).unwrap();
        assert_eq!(read_int(&buf, 4, 4, Endianness::Little).unwrap(), -123_456);
        assert_eq!(read_int(&buf, 0, 2, Endianness::Big).unwrap(), -7);
        assert_eq!(&buf[..2], &[0xFF, 0xF9]);
    }

    #[test]
    fn out_of_bounds_is_truncated() {
        let buf = [0u8; 3];
        assert!(matches!(
            read_int(&buf, 2, 2, Endianness::Big),
            Err(SegyError::TruncatedBuffer { offset: 2, needed: 2 })
        ));
    }
}
