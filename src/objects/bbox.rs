use std::io::{Read, Seek, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::RwSection;
use crate::rw4::io::{ReadExt, WriteExt};
use crate::rw4::{ReadContext, WriteContext};
use crate::util::Result;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    pub min: Vec3,
    pub field_c: u32,
    pub max: Vec3,
    pub field_1c: u32,
}

impl BBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max, ..Default::default() }
    }

    pub(crate) fn read_from<R: Read + Seek>(&mut self, stream: &mut R) -> Result<()> {
        self.min = Vec3::from_array(stream.read_f32_array()?);
        self.field_c = stream.read_u32::<LittleEndian>()?;
        self.max = Vec3::from_array(stream.read_f32_array()?);
        self.field_1c = stream.read_u32::<LittleEndian>()?;
        Ok(())
    }

    pub(crate) fn write_to<W: Write + Seek>(&self, stream: &mut W) -> Result<()> {
        stream.write_f32_slice(&self.min.to_array())?;
        stream.write_u32::<LittleEndian>(self.field_c)?;
        stream.write_f32_slice(&self.max.to_array())?;
        stream.write_u32::<LittleEndian>(self.field_1c)?;
        Ok(())
    }
}

impl RwSection for BBox {
    const TYPE_CODE: u32 = 0x80005;
    const ALIGNMENT: u32 = 16;

    fn read<R: Read + Seek>(&mut self, stream: &mut R, _ctx: &ReadContext<'_>) -> Result<()> {
        self.read_from(stream)
    }

    fn write<W: Write + Seek>(&self, stream: &mut W, _ctx: &mut WriteContext<'_>) -> Result<()> {
        self.write_to(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_layout() {
        let bbox = BBox { min: Vec3::new(-1.0, -2.0, -3.0), field_c: 7, max: Vec3::ONE, field_1c: 9 };

        let mut cursor = Cursor::new(Vec::new());
        bbox.write_to(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[12..16], &7u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1.0f32.to_le_bytes());

        let mut read = BBox::default();
        read.read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read, bbox);
    }
}
