use std::io::{Read, Seek, Write};

use super::RwSection;
use crate::rw4::format::BASE_RESOURCE_TYPE_CODE;
use crate::rw4::io::ReadExt;
use crate::rw4::{ReadContext, WriteContext};
use crate::util::Result;

/// Raw buffer (pixels, vertices, indices) stored in the buffer region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseResource {
    pub data: Vec<u8>,
}

impl BaseResource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl RwSection for BaseResource {
    const TYPE_CODE: u32 = BASE_RESOURCE_TYPE_CODE;
    const ALIGNMENT: u32 = 16;

    fn read<R: Read + Seek>(&mut self, stream: &mut R, ctx: &ReadContext<'_>) -> Result<()> {
        self.data = stream.read_vec(ctx.section().size as usize)?;
        Ok(())
    }

    fn write<W: Write + Seek>(&self, stream: &mut W, _ctx: &mut WriteContext<'_>) -> Result<()> {
        stream.write_all(&self.data)?;
        Ok(())
    }
}
