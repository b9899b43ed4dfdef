//! The RenderWare object container.
//!
//! Reading happens in three strict phases: every object slot is created from
//! its section info, then the sub-reference table is resolved, and only then
//! are the payloads read in order. Writing reserves the header, writes each
//! payload at its aligned offset, then back-patches the header and the
//! section-info table.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::ptr;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, trace, warn};

use super::format::*;
use super::header::{Header, RenderWareKind};
use super::index::{self, IndexSpace, ObjectId, NO_OBJECT};
use super::io::WriteExt;
use super::manifest::{SectionTypes, SubReference};
use super::references::{push_reference, IndexTable, IndexView, ReadContext, WriteContext};
use super::section::SectionInfo;
use crate::objects::{CompiledState, ObjectVariant, RwObject, RwSection, UnknownSection};
use crate::util::{Error, Result};

/// An ordered graph of RenderWare objects.
///
/// The position of an object in the list is its [`ObjectId`] and its slot
/// in the `Object` index space. Positions are only meaningful for the
/// current object list; every write recomputes offsets from scratch.
#[derive(Debug, Clone, Default)]
pub struct RenderWare {
    header: Header,
    objects: Vec<RwObject>,
    section_infos: Vec<SectionInfo>,
}

impl RenderWare {
    pub fn new(kind: RenderWareKind) -> Self {
        Self { header: Header::new(kind), ..Default::default() }
    }

    /// Read a container from any seekable reader.
    pub fn from_reader<R: Read + Seek>(stream: &mut R) -> Result<Self> {
        let mut renderware = Self::default();
        renderware.read(stream)?;
        Ok(renderware)
    }

    /// Open a file, memory-mapped when the `mmap` feature is enabled.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    ///
    /// Falls back to buffered reads when mapping is unavailable or fails.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(path = %path.display(), use_mmap, "opening RenderWare file");

        if use_mmap {
            if let Some(result) = Self::read_mapped(&file) {
                return result;
            }
        }
        Self::from_reader(&mut BufReader::new(file))
    }

    #[cfg(feature = "mmap")]
    fn read_mapped(file: &File) -> Option<Result<Self>> {
        if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
            return None;
        }
        // Safety: the mapping is read-only and dropped before returning.
        match unsafe { memmap2::Mmap::map(file) } {
            Ok(mmap) => Some(Self::from_reader(&mut std::io::Cursor::new(&mmap[..]))),
            Err(e) => {
                warn!(error = %e, "memory mapping failed, using buffered reads");
                None
            }
        }
    }

    #[cfg(not(feature = "mmap"))]
    fn read_mapped(_file: &File) -> Option<Result<Self>> {
        None
    }

    /// Write to a new file at `path`.
    ///
    /// Edits to a decompiled state are not saved unless
    /// [`compile_states`](Self::compile_states) runs first.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read only the file kind, without parsing the rest.
    pub fn peek_kind<R: Read + Seek>(stream: &mut R) -> Result<RenderWareKind> {
        stream.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 28];
        stream.read_exact(&mut magic)?;
        if &magic != RW4_MAGIC {
            return Err(Error::InvalidMagic);
        }
        let code = stream.read_u32::<LittleEndian>()?;
        RenderWareKind::from_code(code).ok_or(Error::UnknownKind(code))
    }

    // ------------------------------------------------------------------
    // Kind and header
    // ------------------------------------------------------------------

    pub fn kind(&self) -> RenderWareKind {
        self.header.kind
    }

    pub fn set_kind(&mut self, kind: RenderWareKind) {
        self.header.kind = kind;
    }

    pub fn is_model(&self) -> bool {
        self.header.kind == RenderWareKind::Model
    }

    pub fn is_texture(&self) -> bool {
        self.header.kind == RenderWareKind::Texture
    }

    pub fn is_special(&self) -> bool {
        self.header.kind == RenderWareKind::Special
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Section infos of the last read or write.
    ///
    /// After a write, base-resource offsets are relative to the buffer
    /// region, as stored on disk.
    pub fn section_infos(&self) -> &[SectionInfo] {
        &self.section_infos
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Append an object and return its handle.
    pub fn add(&mut self, object: impl Into<RwObject>) -> ObjectId {
        self.objects.push(object.into());
        ObjectId(self.objects.len() - 1)
    }

    pub fn objects(&self) -> &[RwObject] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&RwObject> {
        self.objects.get(id.0)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut RwObject> {
        self.objects.get_mut(id.0)
    }

    /// Typed access to one object.
    pub fn get_as<T: ObjectVariant>(&self, id: ObjectId) -> Option<&T> {
        self.object(id).and_then(T::from_object)
    }

    pub fn get_as_mut<T: ObjectVariant>(&mut self, id: ObjectId) -> Option<&mut T> {
        self.object_mut(id).and_then(T::from_object_mut)
    }

    /// All objects of one variant, in list order.
    pub fn objects_of<'a, T: ObjectVariant + 'a>(&'a self) -> impl Iterator<Item = (ObjectId, &'a T)> + 'a {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, object)| T::from_object(object).map(|o| (ObjectId(i), o)))
    }

    /// Resolve a reference value to the object it designates.
    pub fn get_object(&self, value: u32) -> Result<Option<&RwObject>> {
        Ok(self.get(value)?.and_then(|id| self.objects.get(id.0)))
    }

    /// Handle of `object`, found by identity rather than equality.
    pub fn position(&self, object: &RwObject) -> Option<ObjectId> {
        self.objects.iter().position(|o| ptr::eq(o, object)).map(ObjectId)
    }

    /// Reference value of an object found by identity.
    pub fn index_of_object(&self, object: Option<&RwObject>) -> Result<u32> {
        match object {
            None => Ok(NO_OBJECT),
            Some(object) => {
                let id = self.position(object).ok_or(Error::ObjectNotFound)?;
                Ok(index::encode(IndexSpace::Object, id.0 as u32))
            }
        }
    }

    /// Register a pointer to byte `offset` of `object`'s payload.
    ///
    /// The table is rebuilt on every write; entries added here are only
    /// useful for resolving indices before then.
    pub fn add_reference(&mut self, object: ObjectId, offset: u32) -> Result<u32> {
        let count = self.objects.len();
        push_reference(&mut self.header.section_manifest.sub_references.references, count, object, offset)
    }

    /// Display name of an object: its variant and position.
    pub fn name(&self, id: ObjectId) -> Option<String> {
        self.object(id).map(|o| format!("{}-{}", o.type_name(), id.0))
    }

    // ------------------------------------------------------------------
    // Material states
    // ------------------------------------------------------------------

    /// Decompile every compiled state. Returns how many were decompiled.
    ///
    /// Errors name the state and its offset from the last read or write.
    pub fn decompile_states(&mut self) -> Result<usize> {
        let view = IndexView::new(self.objects.len(), &self.header.section_manifest.sub_references.references);
        let infos = &self.section_infos;
        let mut count = 0;
        for (i, object) in self.objects.iter_mut().enumerate() {
            if let RwObject::CompiledState(state) = object {
                state
                    .decompile(&view)
                    .map_err(|e| e.in_section(i, CompiledState::TYPE_CODE, section_offset(infos, i)))?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Recompile every decompiled state.
    pub fn compile_states(&mut self) -> Result<usize> {
        self.compile_states_where(|state| state.is_decompiled())
    }

    fn compile_states_where(
        &mut self,
        select: impl Fn(&CompiledState) -> bool,
    ) -> Result<usize> {
        let view = IndexView::new(self.objects.len(), &self.header.section_manifest.sub_references.references);
        let infos = &self.section_infos;
        let mut count = 0;
        for (i, object) in self.objects.iter_mut().enumerate() {
            if let RwObject::CompiledState(state) = object {
                if select(state) {
                    state
                        .compile(&view)
                        .map_err(|e| e.in_section(i, CompiledState::TYPE_CODE, section_offset(infos, i)))?;
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Read / write
    // ------------------------------------------------------------------

    /// Replace the contents of this container with the file in `stream`.
    pub fn read<R: Read + Seek>(&mut self, stream: &mut R) -> Result<()> {
        self.objects.clear();
        self.section_infos.clear();
        stream.seek(SeekFrom::Start(0))?;

        let infos = self.header.read(stream)?;
        let types = &self.header.section_manifest.types;

        for (i, info) in infos.iter().enumerate() {
            if types.type_codes.get(info.type_code_index as usize) != Some(&info.type_code) {
                warn!(
                    index = i,
                    type_code = format_args!("{:#x}", info.type_code),
                    type_code_index = info.type_code_index,
                    "section type code does not match the type table"
                );
            }

            let object = RwObject::from_type_code(info.type_code).unwrap_or_else(|| {
                warn!(
                    index = i,
                    type_code = format_args!("{:#x}", info.type_code),
                    size = info.size,
                    "unrecognized section type, keeping raw bytes"
                );
                UnknownSection::new(info.type_code, info.alignment).into()
            });
            self.objects.push(object);
        }

        let sub_references = &mut self.header.section_manifest.sub_references;
        sub_references.read_references(stream, self.objects.len())?;

        let view = IndexView::new(self.objects.len(), &sub_references.references);
        for (i, (object, info)) in self.objects.iter_mut().zip(&infos).enumerate() {
            stream.seek(SeekFrom::Start(info.offset))?;
            object
                .read(stream, &ReadContext::new(view, *info))
                .map_err(|e| e.in_section(i, info.type_code, info.offset))?;
            trace!(index = i, kind = object.type_name(), offset = info.offset, size = info.size, "read section");
        }

        debug!(
            objects = self.objects.len(),
            sub_references = view.sub_references().len(),
            "read RenderWare"
        );
        self.section_infos = infos;
        Ok(())
    }

    /// Serialize the whole graph to `stream`, starting at offset 0.
    ///
    /// Compiled states that were built in memory but never compiled are
    /// compiled first. A state that was decompiled and then edited keeps
    /// its old bytes unless [`compile_states`](Self::compile_states) runs
    /// before the write.
    pub fn write<W: Write + Seek>(&mut self, stream: &mut W) -> Result<()> {
        self.compile_states_where(|state| state.needs_compile())?;

        let object_count = self.objects.len();
        let section_count = u32::try_from(object_count)
            .map_err(|_| Error::malformed(0, "too many sections"))?;
        let manifest = &mut self.header.section_manifest;
        manifest.sub_references.references.clear();
        manifest.types.rebuild(self.objects.iter().map(RwObject::type_code));

        stream.seek(SeekFrom::Start(0))?;
        stream.write_padding(HEADER_SIZE + manifest.size())?;

        let mut infos = vec![SectionInfo::default(); object_count];

        for (i, object) in self.objects.iter().enumerate() {
            if object.is_base_resource() {
                continue;
            }
            let offset = stream.align_to(object.alignment())?;
            let mut ctx = WriteContext::new(object_count, &mut manifest.sub_references.references, ObjectId(i));
            object
                .write(stream, &mut ctx)
                .map_err(|e| e.in_section(i, object.type_code(), offset))?;
            let end = stream.stream_position()?;
            infos[i] = section_info(&manifest.types, object, offset, end - offset)?;
            trace!(index = i, kind = object.type_name(), offset, size = end - offset, "wrote section");
        }

        let p_section_info = stream.stream_position()?;
        stream.write_padding(object_count as u64 * SECTION_INFO_SIZE)?;

        manifest.sub_references.offset = stream.stream_position()?;
        for reference in &manifest.sub_references.references {
            stream.write_u32::<LittleEndian>(index::encode(IndexSpace::Object, reference.object.0 as u32))?;
            stream.write_u32::<LittleEndian>(reference.offset)?;
        }
        stream.write_padding(SUB_REFERENCE_PADDING)?;

        let p_buffer_data = stream.stream_position()?;
        for (i, object) in self.objects.iter().enumerate() {
            if !object.is_base_resource() {
                continue;
            }
            let offset = stream.align_to(object.alignment())?;
            let mut ctx = WriteContext::new(object_count, &mut manifest.sub_references.references, ObjectId(i));
            object
                .write(stream, &mut ctx)
                .map_err(|e| e.in_section(i, object.type_code(), offset))?;
            let end = stream.stream_position()?;
            infos[i] = section_info(&manifest.types, object, offset - p_buffer_data, end - offset)?;
        }
        let end = stream.stream_position()?;
        let buffers_size = end - p_buffer_data;

        stream.seek(SeekFrom::Start(0))?;
        self.header.write(stream, section_count, p_section_info, p_buffer_data, buffers_size)?;

        stream.seek(SeekFrom::Start(p_section_info))?;
        for info in &infos {
            info.write(stream)?;
        }
        stream.seek(SeekFrom::Start(end))?;

        debug!(
            objects = object_count,
            sub_references = self.header.section_manifest.sub_references.references.len(),
            p_section_info,
            p_buffer_data,
            buffers_size,
            "wrote RenderWare"
        );
        self.section_infos = infos;
        Ok(())
    }
}

/// Offset of section `index` as of the last read or write.
fn section_offset(infos: &[SectionInfo], index: usize) -> u64 {
    infos.get(index).map_or(0, |info| info.offset)
}

fn section_info(types: &SectionTypes, object: &RwObject, offset: u64, size: u64) -> Result<SectionInfo> {
    let type_code = object.type_code();
    let type_code_index = types.index_of(type_code).ok_or_else(|| {
        Error::malformed(offset, format!("type code {type_code:#x} missing from the type table"))
    })?;
    let size = u32::try_from(size)
        .map_err(|_| Error::malformed(offset, format!("section of {size} bytes is too large")))?;

    Ok(SectionInfo {
        offset,
        field_4: 0,
        size,
        alignment: object.alignment(),
        type_code_index,
        type_code,
    })
}

impl IndexTable for RenderWare {
    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn sub_references(&self) -> &[SubReference] {
        &self.header.section_manifest.sub_references.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{BBox, BaseResource, Raster};
    use std::io::Cursor;

    fn written(renderware: &mut RenderWare) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        renderware.write(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_empty_roundtrip() {
        let mut renderware = RenderWare::new(RenderWareKind::Special);
        let bytes = written(&mut renderware);
        assert_eq!(
            bytes.len() as u64,
            HEADER_SIZE + renderware.header().section_manifest.size() + SUB_REFERENCE_PADDING
        );

        let read = RenderWare::from_reader(&mut Cursor::new(bytes)).unwrap();
        assert!(read.is_special());
        assert!(read.objects().is_empty());
    }

    #[test]
    fn test_get_and_index_of() {
        let mut renderware = RenderWare::default();
        let a = renderware.add(BBox::default());
        let b = renderware.add(Raster::default());

        assert_eq!(renderware.get(1).unwrap(), Some(b));
        assert_eq!(renderware.get(NO_OBJECT).unwrap(), None);
        assert_eq!(renderware.index_of(Some(a)).unwrap(), 0);
        assert_eq!(renderware.index_of(None).unwrap(), NO_OBJECT);

        let object = renderware.object(b).unwrap();
        assert_eq!(renderware.position(object), Some(b));
        assert_eq!(renderware.index_of_object(Some(object)).unwrap(), 1);

        let copy = object.clone();
        assert_eq!(renderware.position(&copy), None);
        assert!(matches!(renderware.index_of_object(Some(&copy)), Err(Error::ObjectNotFound)));

        let sub = renderware.add_reference(a, 4).unwrap();
        assert_eq!(renderware.get(sub).unwrap(), Some(a));
        assert_eq!(renderware.index_of_in(Some(a), IndexSpace::SubReference).unwrap(), sub);
    }

    #[test]
    fn test_base_resources_live_in_buffer_region() {
        let mut renderware = RenderWare::new(RenderWareKind::Texture);
        let data = renderware.add(BaseResource::new(vec![1, 2, 3, 4, 5]));
        renderware.add(Raster { texture_data: Some(data), ..Default::default() });
        let bytes = written(&mut renderware);

        let word = |o: u64| {
            let o = o as usize;
            u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
        };
        let p_buffer_data = word(BUFFER_DATA_PTR_OFFSET) as u64;
        let relative = renderware.section_infos()[0].offset;
        let start = (p_buffer_data + relative) as usize;
        assert_eq!(start % 16, 0);
        assert_eq!(&bytes[start..start + 5], &[1, 2, 3, 4, 5]);
        assert_eq!(word(0x4C) as u64, relative + 5);
        assert_eq!(bytes.len() as u64, p_buffer_data + relative + 5);

        let read = RenderWare::from_reader(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.section_infos()[0].offset, p_buffer_data + relative);
        assert_eq!(read.get_as::<BaseResource>(ObjectId(0)).unwrap().data, vec![1, 2, 3, 4, 5]);
        assert_eq!(read.get_as::<Raster>(ObjectId(1)).unwrap().texture_data, Some(ObjectId(0)));
    }

    #[test]
    fn test_type_table() {
        let mut renderware = RenderWare::default();
        renderware.add(BBox::default());
        renderware.add(BaseResource::default());
        renderware.add(Raster::default());
        written(&mut renderware);

        let types = &renderware.header().section_manifest.types.type_codes;
        assert_eq!(types[..5], RESERVED_TYPE_CODES);
        assert_eq!(types[5..], [0x20003, 0x80005]);

        let infos = renderware.section_infos();
        assert_eq!(infos[0].type_code_index, 6);
        assert_eq!(infos[1].type_code_index, 1);
        assert_eq!(infos[2].type_code_index, 5);
    }

    #[test]
    fn test_peek_kind() {
        let mut renderware = RenderWare::new(RenderWareKind::Texture);
        let mut cursor = Cursor::new(written(&mut renderware));
        cursor.set_position(100);
        assert_eq!(RenderWare::peek_kind(&mut cursor).unwrap(), RenderWareKind::Texture);
    }

    #[test]
    fn test_section_error_names_object() {
        let mut renderware = RenderWare::default();
        renderware.add(BBox::default());
        renderware.add(Raster { texture_data: Some(ObjectId(9)), ..Default::default() });

        let err = renderware.write(&mut Cursor::new(Vec::new())).unwrap_err();
        match err {
            Error::Section { index, type_code, source, .. } => {
                assert_eq!(index, 1);
                assert_eq!(type_code, 0x20003);
                assert!(matches!(*source, Error::DanglingObject(9)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_names_and_typed_filter() {
        let mut renderware = RenderWare::default();
        renderware.add(BBox::default());
        renderware.add(Raster::default());
        renderware.add(BBox::default());

        let boxes: Vec<_> = renderware.objects_of::<BBox>().map(|(id, _)| id).collect();
        assert_eq!(boxes, vec![ObjectId(0), ObjectId(2)]);
        assert_eq!(renderware.name(ObjectId(1)).as_deref(), Some("Raster-1"));
        assert_eq!(renderware.name(ObjectId(3)), None);
    }
}
