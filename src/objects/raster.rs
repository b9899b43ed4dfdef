use std::io::{Read, Seek, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::RwSection;
use crate::rw4::io::ReadExt;
use crate::rw4::{IndexTable, ObjectId, ReadContext, WriteContext};
use crate::util::Result;

/// Texture descriptor. The pixels live in a separate `BaseResource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    /// Direct3D format code or FourCC.
    pub texture_format: u32,
    pub texture_flags: u16,
    pub volume_depth: u16,
    /// Runtime texture pointer slot; meaningless on disk.
    pub dx_base_texture: u32,
    pub width: u16,
    pub height: u16,
    pub field_10: u8,
    pub mipmap_levels: u8,
    pub field_14: u32,
    pub field_18: u32,
    pub texture_data: Option<ObjectId>,
}

impl Default for Raster {
    fn default() -> Self {
        Self {
            texture_format: 0,
            texture_flags: 8,
            volume_depth: 0,
            dx_base_texture: 0,
            width: 0,
            height: 0,
            field_10: 8,
            mipmap_levels: 0,
            field_14: 0,
            field_18: 0,
            texture_data: None,
        }
    }
}

impl Raster {
    /// Flag marking a cube map.
    pub const FLAG_CUBE_TEXTURE: u16 = 0x1000;

    pub fn is_cube_map(&self) -> bool {
        self.texture_flags & Self::FLAG_CUBE_TEXTURE != 0
    }
}

impl RwSection for Raster {
    const TYPE_CODE: u32 = 0x20003;
    const ALIGNMENT: u32 = 4;

    fn read<R: Read + Seek>(&mut self, stream: &mut R, ctx: &ReadContext<'_>) -> Result<()> {
        self.texture_format = stream.read_u32::<LittleEndian>()?;
        self.texture_flags = stream.read_u16::<LittleEndian>()?;
        self.volume_depth = stream.read_u16::<LittleEndian>()?;
        self.dx_base_texture = stream.read_u32::<LittleEndian>()?;
        self.width = stream.read_u16::<LittleEndian>()?;
        self.height = stream.read_u16::<LittleEndian>()?;
        self.field_10 = stream.read_u8()?;
        self.mipmap_levels = stream.read_u8()?;
        stream.skip(2)?;
        self.field_14 = stream.read_u32::<LittleEndian>()?;
        self.field_18 = stream.read_u32::<LittleEndian>()?;
        self.texture_data = ctx.get(stream.read_u32::<LittleEndian>()?)?;
        Ok(())
    }

    fn write<W: Write + Seek>(&self, stream: &mut W, ctx: &mut WriteContext<'_>) -> Result<()> {
        stream.write_u32::<LittleEndian>(self.texture_format)?;
        stream.write_u16::<LittleEndian>(self.texture_flags)?;
        stream.write_u16::<LittleEndian>(self.volume_depth)?;
        stream.write_u32::<LittleEndian>(self.dx_base_texture)?;
        stream.write_u16::<LittleEndian>(self.width)?;
        stream.write_u16::<LittleEndian>(self.height)?;
        stream.write_u8(self.field_10)?;
        stream.write_u8(self.mipmap_levels)?;
        stream.write_u16::<LittleEndian>(0)?;
        stream.write_u32::<LittleEndian>(self.field_14)?;
        stream.write_u32::<LittleEndian>(self.field_18)?;
        stream.write_u32::<LittleEndian>(ctx.index_of(self.texture_data)?)?;
        Ok(())
    }
}
