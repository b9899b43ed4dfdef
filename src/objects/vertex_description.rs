use std::io::{Read, Seek, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::RwSection;
use crate::rw4::{ReadContext, WriteContext};
use crate::util::Result;

/// One vertex attribute of a [`VertexDescription`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexElement {
    pub stream: u16,
    /// Byte offset of the attribute inside a vertex.
    pub offset: u16,
    /// `D3DDECLTYPE`.
    pub decl_type: u8,
    /// `D3DDECLMETHOD`.
    pub method: u8,
    /// `D3DDECLUSAGE`.
    pub usage: u8,
    pub usage_index: u8,
    /// RenderWare attribute code (position, normal, texcoord0, ...).
    pub type_code: u32,
}

impl VertexElement {
    pub const POSITION: u32 = 0;
    pub const NORMAL: u32 = 2;
    pub const COLOR: u32 = 3;
    pub const COLOR1: u32 = 5;
    pub const TEXCOORD0: u32 = 6;
    pub const BLENDINDICES: u32 = 14;
    pub const BLENDWEIGHTS: u32 = 15;
    pub const POINTSIZE: u32 = 16;
    pub const POSITION2: u32 = 17;
    pub const NORMAL2: u32 = 18;
    pub const TANGENT: u32 = 19;
    pub const BINORMAL: u32 = 20;
    pub const FOG: u32 = 21;
    pub const BLENDINDICES2: u32 = 22;
    pub const BLENDWEIGHTS2: u32 = 23;

    /// Bit this attribute contributes to the description's element flags.
    pub fn element_flag(&self) -> u32 {
        match self.type_code {
            Self::POSITION => 0x1,
            Self::POSITION2 => 0x2,
            Self::TANGENT => 0x100,
            Self::COLOR => 0x1000,
            Self::COLOR1 => 0x2000,
            // texcoord0..texcoord7
            code @ 6..=13 => 0x10000 << (code - Self::TEXCOORD0),
            Self::NORMAL => 0x0100_0000,
            Self::NORMAL2 => 0x0200_0000,
            Self::BLENDINDICES => 0x1000_0000,
            Self::BLENDINDICES2 => 0x2000_0000,
            Self::BLENDWEIGHTS => 0x4000_0000,
            Self::BLENDWEIGHTS2 => 0x8000_0000,
            _ => 0,
        }
    }

    fn read_from<R: Read>(stream: &mut R) -> Result<Self> {
        Ok(Self {
            stream: stream.read_u16::<LittleEndian>()?,
            offset: stream.read_u16::<LittleEndian>()?,
            decl_type: stream.read_u8()?,
            method: stream.read_u8()?,
            usage: stream.read_u8()?,
            usage_index: stream.read_u8()?,
            type_code: stream.read_u32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, stream: &mut W) -> Result<()> {
        stream.write_u16::<LittleEndian>(self.stream)?;
        stream.write_u16::<LittleEndian>(self.offset)?;
        stream.write_u8(self.decl_type)?;
        stream.write_u8(self.method)?;
        stream.write_u8(self.usage)?;
        stream.write_u8(self.usage_index)?;
        stream.write_u32::<LittleEndian>(self.type_code)?;
        Ok(())
    }
}

/// Vertex layout, stored standalone or inside a compiled material state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexDescription {
    pub field_0: u32,
    pub field_4: u32,
    /// OR of [`VertexElement::element_flag`] over all elements.
    pub element_flags: u32,
    pub field_e: u8,
    pub vertex_size: u8,
    pub field_10: u32,
    pub elements: Vec<VertexElement>,
}

impl VertexDescription {
    /// Recompute `element_flags` from the element list.
    pub fn update_element_flags(&mut self) {
        self.element_flags = self.elements.iter().fold(0, |acc, e| acc | e.element_flag());
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        20 + 12 * self.elements.len()
    }

    pub(crate) fn read_from<R: Read>(&mut self, stream: &mut R) -> Result<()> {
        self.field_0 = stream.read_u32::<LittleEndian>()?;
        self.field_4 = stream.read_u32::<LittleEndian>()?;
        self.element_flags = stream.read_u32::<LittleEndian>()?;
        let count = stream.read_u16::<LittleEndian>()?;
        self.field_e = stream.read_u8()?;
        self.vertex_size = stream.read_u8()?;
        self.field_10 = stream.read_u32::<LittleEndian>()?;

        self.elements.clear();
        for _ in 0..count {
            self.elements.push(VertexElement::read_from(stream)?);
        }
        Ok(())
    }

    pub(crate) fn write_to<W: Write>(&self, stream: &mut W) -> Result<()> {
        stream.write_u32::<LittleEndian>(self.field_0)?;
        stream.write_u32::<LittleEndian>(self.field_4)?;
        stream.write_u32::<LittleEndian>(self.element_flags)?;
        stream.write_u16::<LittleEndian>(self.elements.len() as u16)?;
        stream.write_u8(self.field_e)?;
        stream.write_u8(self.vertex_size)?;
        stream.write_u32::<LittleEndian>(self.field_10)?;
        for element in &self.elements {
            element.write_to(stream)?;
        }
        Ok(())
    }
}

impl RwSection for VertexDescription {
    const TYPE_CODE: u32 = 0x20004;
    const ALIGNMENT: u32 = 4;

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

    fn sample() -> VertexDescription {
        let mut desc = VertexDescription {
            vertex_size: 20,
            elements: vec![
                VertexElement { decl_type: 2, type_code: VertexElement::POSITION, ..Default::default() },
                VertexElement {
                    offset: 12,
                    decl_type: 1,
                    usage: 5,
                    type_code: VertexElement::TEXCOORD0 + 1,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        desc.update_element_flags();
        desc
    }

    #[test]
    fn test_element_flags() {
        let desc = sample();
        assert_eq!(desc.element_flags, 0x1 | 0x20000);
    }

    #[test]
    fn test_layout() {
        let desc = sample();
        let mut cursor = Cursor::new(Vec::new());
        desc.write_to(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), desc.size());
        assert_eq!(&bytes[12..14], &2u16.to_le_bytes());
        assert_eq!(bytes[15], 20);

        let mut read = VertexDescription::default();
        read.read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read, desc);
    }
}
