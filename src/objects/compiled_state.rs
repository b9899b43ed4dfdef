use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt};

use super::RwSection;
use crate::material::MaterialStateCompiler;
use crate::rw4::io::ReadExt;
use crate::rw4::{IndexTable, ReadContext, WriteContext};
use crate::util::{Error, Result};

/// Compiled material state.
///
/// Reading keeps only the raw blob. The structured form is produced on
/// demand by [`decompile`](Self::decompile) and turned back into bytes by
/// [`compile`](Self::compile).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledState {
    /// Raw blob, length prefix included. Empty until compiled.
    pub data: Vec<u8>,
    pub compiler: Option<MaterialStateCompiler>,
}

impl CompiledState {
    /// A state that will be compiled when its container is written.
    pub fn from_compiler(compiler: MaterialStateCompiler) -> Self {
        Self { data: Vec::new(), compiler: Some(compiler) }
    }

    pub fn is_decompiled(&self) -> bool {
        self.compiler.is_some()
    }

    /// Whether the structured form exists but has no bytes yet.
    pub fn needs_compile(&self) -> bool {
        self.data.is_empty() && self.compiler.is_some()
    }

    /// Decode the raw blob into its structured form.
    pub fn decompile(&mut self, table: &impl IndexTable) -> Result<&mut MaterialStateCompiler> {
        let compiler = MaterialStateCompiler::decompile(&self.data, table)?;
        Ok(self.compiler.insert(compiler))
    }

    /// Re-encode the structured form into the raw blob.
    ///
    /// Does nothing if the state was never decompiled.
    pub fn compile(&mut self, table: &impl IndexTable) -> Result<()> {
        if let Some(compiler) = self.compiler.as_mut() {
            self.data = compiler.compile(table)?;
        }
        Ok(())
    }
}

impl RwSection for CompiledState {
    const TYPE_CODE: u32 = 0x2000B;
    const ALIGNMENT: u32 = 16;

    fn read<R: Read + Seek>(&mut self, stream: &mut R, ctx: &ReadContext<'_>) -> Result<()> {
        let pos = stream.stream_position()?;
        let size = stream.read_u32::<LittleEndian>()?;
        if size < 4 || size > ctx.section().size {
            return Err(Error::malformed(
                pos,
                format!("state length {size} does not fit section of {} bytes", ctx.section().size),
            ));
        }
        stream.seek(SeekFrom::Start(pos))?;
        self.data = stream.read_vec(size as usize)?;
        self.compiler = None;
        Ok(())
    }

    fn write<W: Write + Seek>(&self, stream: &mut W, _ctx: &mut WriteContext<'_>) -> Result<()> {
        if self.data.is_empty() {
            return Err(Error::malformed(stream.stream_position()?, "compiled state has no data"));
        }
        stream.write_all(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rw4::{IndexView, ObjectId, SectionInfo};
    use std::io::Cursor;

    #[test]
    fn test_lazy_decompile() {
        let mut compiler = MaterialStateCompiler::new();
        compiler.renderer_id = 7;
        let table = IndexView::new(1, &[]);
        let blob = compiler.compile(&table).unwrap();

        let section = SectionInfo { size: blob.len() as u32 + 8, ..Default::default() };
        let mut bytes = blob.clone();
        bytes.extend_from_slice(&[0; 8]);

        let mut state = CompiledState::default();
        state.read(&mut Cursor::new(bytes), &ReadContext::new(table, section)).unwrap();
        assert_eq!(state.data, blob);
        assert!(!state.is_decompiled());

        assert_eq!(state.decompile(&table).unwrap().renderer_id, 7);
        assert!(state.is_decompiled());
    }

    #[test]
    fn test_oversized_length() {
        let section = SectionInfo { size: 8, ..Default::default() };
        let bytes = 64u32.to_le_bytes().to_vec();
        let mut state = CompiledState::default();
        let err = state
            .read(&mut Cursor::new(bytes), &ReadContext::new(IndexView::new(0, &[]), section))
            .unwrap_err();
        assert!(matches!(err, Error::Malformed { offset: 0, .. }));
    }

    #[test]
    fn test_write_requires_data() {
        let state = CompiledState::from_compiler(MaterialStateCompiler::new());
        assert!(state.needs_compile());
        let mut refs = Vec::new();
        let mut ctx = WriteContext::new(1, &mut refs, ObjectId(0));
        assert!(state.write(&mut Cursor::new(Vec::new()), &mut ctx).is_err());
    }
}
