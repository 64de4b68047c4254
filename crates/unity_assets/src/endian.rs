//! Endian-aware cursors used to decode and re-encode object fields.
//!
//! The byte order of object data is a property of the container, so it is
//! chosen at runtime instead of as a type parameter.

use crate::error::{Error, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, BE, LE};
use std::io::{Cursor, Read};

/// Byte order of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

macro_rules! read_prim {
    ($name:ident, $ty:ty, $method:ident) => {
        pub fn $name(&mut self) -> Result<$ty> {
            Ok(match self.endian {
                Endian::Little => self.cursor.$method::<LE>()?,
                Endian::Big => self.cursor.$method::<BE>()?,
            })
        }
    };
}

macro_rules! write_prim {
    ($name:ident, $ty:ty, $method:ident) => {
        pub fn $name(&mut self, value: $ty) -> Result<()> {
            match self.endian {
                Endian::Little => self.buf.$method::<LE>(value)?,
                Endian::Big => self.buf.$method::<BE>(value)?,
            }
            Ok(())
        }
    };
}

/// Reads primitives from a byte slice with a switchable byte order.
pub struct EndianReader<'a> {
    cursor: Cursor<&'a [u8]>,
    endian: Endian,
}

impl<'a> EndianReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            cursor: Cursor::new(data),
            endian,
        }
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, pos: u64) {
        self.cursor.set_position(pos);
    }

    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.cursor.read_i8()?)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_prim!(read_u16, u16, read_u16);
    read_prim!(read_i16, i16, read_i16);
    read_prim!(read_u32, u32, read_u32);
    read_prim!(read_i32, i32, read_i32);
    read_prim!(read_u64, u64, read_u64);
    read_prim!(read_i64, i64, read_i64);
    read_prim!(read_f32, f32, read_f32);
    read_prim!(read_f64, f64, read_f64);

    /// Read exactly `len` bytes, failing cleanly instead of allocating past the end.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len as u64 > self.remaining() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "requested {} bytes at offset {} with {} remaining",
                    len,
                    self.position(),
                    self.remaining()
                ),
            )));
        }
        let mut out = vec![0u8; len];
        self.cursor.read_exact(&mut out)?;
        Ok(out)
    }

    /// Advance to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: u64) {
        let pos = self.position();
        let rem = pos % alignment;
        if rem != 0 {
            self.set_position(pos + (alignment - rem));
        }
    }
}

/// Writes primitives into a growable buffer with a switchable byte order.
#[derive(Default)]
pub struct EndianWriter {
    buf: Vec<u8>,
    endian: Endian,
}

impl EndianWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buf.push(value);
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.buf.push(value as u8);
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    write_prim!(write_u16, u16, write_u16);
    write_prim!(write_i16, i16, write_i16);
    write_prim!(write_u32, u32, write_u32);
    write_prim!(write_i32, i32, write_i32);
    write_prim!(write_u64, u64, write_u64);
    write_prim!(write_i64, i64, write_i64);
    write_prim!(write_f32, f32, write_f32);
    write_prim!(write_f64, f64, write_f64);

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Zero-pad up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let rem = self.buf.len() % alignment;
        if rem != 0 {
            self.buf.resize(self.buf.len() + (alignment - rem), 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_switches_endianness() {
        let data = [0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00];
        let mut reader = EndianReader::new(&data, Endian::Big);
        assert_eq!(reader.read_u32().unwrap(), 1);
        reader.set_endian(Endian::Little);
        assert_eq!(reader.read_u32().unwrap(), 1);
    }

    #[test]
    fn test_reader_align() {
        let data = [0u8; 16];
        let mut reader = EndianReader::new(&data, Endian::Little);
        reader.set_position(5);
        reader.align(4);
        assert_eq!(reader.position(), 8);
        reader.align(4);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_read_bytes_past_end_fails() {
        let data = [1u8, 2, 3];
        let mut reader = EndianReader::new(&data, Endian::Little);
        assert!(reader.read_bytes(4).is_err());
        assert_eq!(reader.read_bytes(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_writer_align_pads_with_zeros() {
        let mut writer = EndianWriter::new(Endian::Big);
        writer.write_u16(0x0102).unwrap();
        writer.write_u8(7).unwrap();
        writer.align(4);
        assert_eq!(writer.position(), 4);
        assert_eq!(writer.as_slice(), &[1, 2, 7, 0]);
    }
}
