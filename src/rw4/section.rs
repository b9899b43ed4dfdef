//! Per-section placement records.

use std::io::{Read, Seek, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::io::{ReadExt, WriteExt};
use crate::util::Result;

/// Placement of one object's payload in the file.
///
/// One record exists per object. Records are read from disk on every read
/// and rebuilt from scratch on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SectionInfo {
    /// Byte offset of the payload. Absolute, except for base resources
    /// on disk, whose offset is relative to the buffer region.
    pub offset: u64,
    /// Reserved word, preserved.
    pub field_4: u32,
    /// Payload size in bytes.
    pub size: u32,
    /// Power-of-two alignment of `offset`; 0 means none.
    pub alignment: u32,
    /// Position of `type_code` in the manifest type table.
    pub type_code_index: u32,
    /// Type code of the object stored in this section.
    pub type_code: u32,
}

impl SectionInfo {
    /// Read one 24-byte record.
    pub fn read<R: Read + Seek>(stream: &mut R) -> Result<Self> {
        Ok(Self {
            offset: stream.read_offset()?,
            field_4: stream.read_u32::<LittleEndian>()?,
            size: stream.read_u32::<LittleEndian>()?,
            alignment: stream.read_u32::<LittleEndian>()?,
            type_code_index: stream.read_u32::<LittleEndian>()?,
            type_code: stream.read_u32::<LittleEndian>()?,
        })
    }

    /// Write one 24-byte record.
    pub fn write<W: Write + Seek>(&self, stream: &mut W) -> Result<()> {
        stream.write_offset(self.offset)?;
        stream.write_u32::<LittleEndian>(self.field_4)?;
        stream.write_u32::<LittleEndian>(self.size)?;
        stream.write_u32::<LittleEndian>(self.alignment)?;
        stream.write_u32::<LittleEndian>(self.type_code_index)?;
        stream.write_u32::<LittleEndian>(self.type_code)?;
        Ok(())
    }
}
