use std::io::{Read, Seek, Write};

use crate::rw4::ReadContext;
use crate::rw4::io::ReadExt;
use crate::util::Result;

/// Section whose type code is not registered.
///
/// The payload is kept verbatim together with the type code and alignment
/// it was read with, so it is written back in its original slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownSection {
    pub type_code: u32,
    pub alignment: u32,
    pub data: Vec<u8>,
}

impl UnknownSection {
    pub fn new(type_code: u32, alignment: u32) -> Self {
        Self { type_code, alignment, data: Vec::new() }
    }

    pub(crate) fn read<R: Read + Seek>(&mut self, stream: &mut R, ctx: &ReadContext<'_>) -> Result<()> {
        self.data = stream.read_vec(ctx.section().size as usize)?;
        Ok(())
    }

    pub(crate) fn write<W: Write + Seek>(&self, stream: &mut W) -> Result<()> {
        stream.write_all(&self.data)?;
        Ok(())
    }
}
