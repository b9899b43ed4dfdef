//! Stream helpers shared by every section codec.
//!
//! All section payloads are read from and written to the file stream
//! directly, so helpers work on any `Read + Seek` / `Write + Seek`.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::format::align_up;
use crate::util::{Error, Result};

const ZEROES: [u8; 256] = [0; 256];

/// Extension trait for reading section data.
pub(crate) trait ReadExt: Read + Seek {
    /// Skip `count` bytes forward.
    fn skip(&mut self, count: u64) -> io::Result<u64> {
        self.seek(SeekFrom::Current(count as i64))
    }

    /// Read a little-endian `u32` that holds an absolute offset.
    fn read_offset(&mut self) -> io::Result<u64> {
        self.read_u32::<LittleEndian>().map(u64::from)
    }

    /// Read an exact number of bytes into a new vec.
    fn read_vec(&mut self, count: usize) -> io::Result<Vec<u8>> {
        // `count` comes from the file and may exceed what is left
        let mut data = Vec::new();
        Read::take(&mut *self, count as u64).read_to_end(&mut data)?;
        if data.len() != count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("wanted {count} bytes, {} remain", data.len()),
            ));
        }
        Ok(data)
    }

    /// Read `N` little-endian floats.
    fn read_f32_array<const N: usize>(&mut self) -> io::Result<[f32; N]> {
        let mut values = [0f32; N];
        self.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    /// Read `N` little-endian words.
    fn read_u32_array<const N: usize>(&mut self) -> io::Result<[u32; N]> {
        let mut values = [0u32; N];
        self.read_u32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    /// Read a word and fail with [`Error::Malformed`] unless it equals `expected`.
    fn expect_u32(&mut self, expected: u32, what: &str) -> Result<()> {
        let offset = self.stream_position()?;
        let value = self.read_u32::<LittleEndian>()?;
        if value != expected {
            return Err(Error::malformed(
                offset,
                format!("expected {what} {expected:#x}, found {value:#x}"),
            ));
        }
        Ok(())
    }
}

impl<R: Read + Seek + ?Sized> ReadExt for R {}

/// Extension trait for writing section data.
pub(crate) trait WriteExt: Write + Seek {
    /// Write `count` zero bytes.
    fn write_padding(&mut self, mut count: u64) -> io::Result<()> {
        while count > 0 {
            let chunk = count.min(ZEROES.len() as u64) as usize;
            self.write_all(&ZEROES[..chunk])?;
            count -= chunk as u64;
        }
        Ok(())
    }

    /// Pad with zeroes up to the next multiple of `alignment` and return the
    /// resulting position.
    fn align_to(&mut self, alignment: u32) -> io::Result<u64> {
        let pos = self.stream_position()?;
        let aligned = align_up(pos, alignment);
        self.write_padding(aligned - pos)?;
        Ok(aligned)
    }

    /// Write an offset as a little-endian `u32`, failing if it does not fit.
    fn write_offset(&mut self, offset: u64) -> Result<()> {
        let value = u32::try_from(offset).map_err(|_| {
            Error::malformed(offset, "offset does not fit in 32 bits")
        })?;
        self.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a slice of little-endian floats.
    fn write_f32_slice(&mut self, values: &[f32]) -> io::Result<()> {
        for value in values {
            self.write_f32::<LittleEndian>(*value)?;
        }
        Ok(())
    }

    /// Write a slice of little-endian words.
    fn write_u32_slice(&mut self, values: &[u32]) -> io::Result<()> {
        for value in values {
            self.write_u32::<LittleEndian>(*value)?;
        }
        Ok(())
    }
}

impl<W: Write + Seek + ?Sized> WriteExt for W {}
