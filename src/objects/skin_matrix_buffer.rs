use std::io::{Read, Seek, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec4;

use super::RwSection;
use crate::rw4::io::{ReadExt, WriteExt};
use crate::rw4::{IndexTable, ReadContext, WriteContext};
use crate::util::{Error, Result};

/// Offset of the matrix array inside the payload.
const MATRICES_OFFSET: u32 = 16;

/// Row-major 3x4 affine matrix.
pub type Matrix3x4 = [Vec4; 3];

/// Per-bone skinning matrices.
///
/// The payload starts with a sub-reference to its own matrix array, which
/// is registered with the container on every write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinMatrixBuffer {
    pub matrices: Vec<Matrix3x4>,
    /// Reserved words after the count.
    pub fields: [u32; 2],
}

impl RwSection for SkinMatrixBuffer {
    const TYPE_CODE: u32 = 0x7000F;
    const ALIGNMENT: u32 = 16;

    fn read<R: Read + Seek>(&mut self, stream: &mut R, ctx: &ReadContext<'_>) -> Result<()> {
        let pos = stream.stream_position()?;
        let pointer = stream.read_u32::<LittleEndian>()?;
        if ctx.get(pointer)?.is_none() {
            return Err(Error::malformed(pos, "skin matrix buffer has no data pointer"));
        }

        let count = stream.read_u32::<LittleEndian>()?;
        self.fields = stream.read_u32_array()?;

        self.matrices.clear();
        for _ in 0..count {
            let rows: [f32; 12] = stream.read_f32_array()?;
            self.matrices.push([
                Vec4::from_slice(&rows[0..4]),
                Vec4::from_slice(&rows[4..8]),
                Vec4::from_slice(&rows[8..12]),
            ]);
        }
        Ok(())
    }

    fn write<W: Write + Seek>(&self, stream: &mut W, ctx: &mut WriteContext<'_>) -> Result<()> {
        let pointer = ctx.add_reference(ctx.current(), MATRICES_OFFSET)?;
        stream.write_u32::<LittleEndian>(pointer)?;
        stream.write_u32::<LittleEndian>(self.matrices.len() as u32)?;
        stream.write_u32_slice(&self.fields)?;
        for matrix in &self.matrices {
            for row in matrix {
                stream.write_f32_slice(&row.to_array())?;
            }
        }
        Ok(())
    }
}
