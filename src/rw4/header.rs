//! Fixed-layout file prologue.

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use super::format::*;
use super::io::{ReadExt, WriteExt};
use super::manifest::SectionManifest;
use super::section::SectionInfo;
use crate::util::{Error, Result};

/// Kind of content stored in a RenderWare file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RenderWareKind {
    #[default]
    Model,
    Texture,
    Special,
}

impl RenderWareKind {
    /// On-disk code of this kind.
    pub const fn code(self) -> u32 {
        match self {
            Self::Model => 1,
            Self::Texture => 0x0400_0000,
            Self::Special => 0xCAFE_D00D,
        }
    }

    /// Kind for an on-disk code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Model),
            0x0400_0000 => Some(Self::Texture),
            0xCAFE_D00D => Some(Self::Special),
            _ => None,
        }
    }
}

impl fmt::Display for RenderWareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "MODEL"),
            Self::Texture => write!(f, "TEXTURE"),
            Self::Special => write!(f, "SPECIAL"),
        }
    }
}

/// The file header and its section manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub kind: RenderWareKind,
    /// Opaque word preserved verbatim.
    pub unknown_bits: u32,
    pub section_manifest: SectionManifest,
}

impl Default for Header {
    fn default() -> Self {
        Self::new(RenderWareKind::Model)
    }
}

impl Header {
    pub fn new(kind: RenderWareKind) -> Self {
        Self {
            kind,
            unknown_bits: DEFAULT_UNKNOWN_BITS,
            section_manifest: SectionManifest::default(),
        }
    }

    /// Bytes occupied by the header and manifest.
    pub fn size(&self) -> u64 {
        HEADER_SIZE + self.section_manifest.size()
    }

    /// Read the header, the manifest and every section-info record.
    ///
    /// Base-resource offsets are made absolute by adding the buffer-region
    /// pointer.
    pub fn read<R: Read + Seek>(&mut self, stream: &mut R) -> Result<Vec<SectionInfo>> {
        let start = stream.stream_position()?;
        let mut magic = [0u8; 28];
        stream.read_exact(&mut magic)?;
        if &magic != RW4_MAGIC {
            return Err(Error::InvalidMagic);
        }

        stream.seek(SeekFrom::Start(start + KIND_OFFSET))?;
        let code = stream.read_u32::<LittleEndian>()?;
        self.kind = RenderWareKind::from_code(code).ok_or(Error::UnknownKind(code))?;

        // The count at 0x20 is not authoritative.
        stream.seek(SeekFrom::Start(start + SECTION_COUNT_OFFSET))?;
        let section_count = stream.read_u32::<LittleEndian>()?;
        stream.seek(SeekFrom::Start(start + SECTION_INFO_PTR_OFFSET))?;
        let p_section_info = stream.read_offset()?;
        stream.seek(SeekFrom::Start(start + BUFFER_DATA_PTR_OFFSET))?;
        let p_buffer_data = stream.read_offset()?;
        stream.seek(SeekFrom::Start(start + UNKNOWN_BITS_OFFSET))?;
        self.unknown_bits = stream.read_u32::<LittleEndian>()?;

        stream.seek(SeekFrom::Start(start + HEADER_SIZE))?;
        self.section_manifest.read(stream)?;

        debug!(
            kind = %self.kind,
            section_count,
            p_section_info,
            p_buffer_data,
            "read RenderWare header"
        );

        stream.seek(SeekFrom::Start(p_section_info))?;
        let mut section_infos = Vec::with_capacity((section_count as usize).min(0x1000));
        for _ in 0..section_count {
            let mut info = SectionInfo::read(stream)?;
            if info.type_code == BASE_RESOURCE_TYPE_CODE {
                info.offset += p_buffer_data;
            }
            section_infos.push(info);
        }

        Ok(section_infos)
    }

    /// Write the header and manifest at the current position.
    ///
    /// Section-info records are not written here.
    pub fn write<W: Write + Seek>(
        &self,
        stream: &mut W,
        section_count: u32,
        p_section_info: u64,
        p_buffer_data: u64,
        buffers_size: u64,
    ) -> Result<()> {
        stream.write_all(RW4_MAGIC)?;
        stream.write_u32::<LittleEndian>(self.kind.code())?;
        stream.write_u32::<LittleEndian>(section_count)?;
        stream.write_u32::<LittleEndian>(section_count)?;
        stream.write_u32::<LittleEndian>(match self.kind {
            RenderWareKind::Texture => 4,
            _ => 16,
        })?;
        stream.write_u32::<LittleEndian>(0)?;
        stream.write_offset(p_section_info)?;
        stream.write_u32_slice(&[0x98, 0, 0, 0])?;
        stream.write_offset(p_buffer_data)?;
        stream.write_u32::<LittleEndian>(16)?;
        stream.write_offset(buffers_size)?;
        stream.write_u32_slice(&[4, 0, 1, 0, 1])?;
        stream.write_u32::<LittleEndian>(self.unknown_bits)?;
        stream.write_u32_slice(&[4, 0, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0])?;

        self.section_manifest.write(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn written(header: &Header, count: u32) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor, count, 0x300, 0x400, 0x80).unwrap();
        cursor.into_inner()
    }

    fn word(bytes: &[u8], offset: u64) -> u32 {
        let o = offset as usize;
        u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
    }

    #[test]
    fn test_kind_codes() {
        for kind in [RenderWareKind::Model, RenderWareKind::Texture, RenderWareKind::Special] {
            assert_eq!(RenderWareKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(RenderWareKind::from_code(2), None);
    }

    #[test]
    fn test_field_offsets() {
        let header = Header::new(RenderWareKind::Texture);
        let bytes = written(&header, 3);

        assert_eq!(&bytes[..28], RW4_MAGIC);
        assert_eq!(word(&bytes, KIND_OFFSET), 0x0400_0000);
        assert_eq!(word(&bytes, 0x20), 3);
        assert_eq!(word(&bytes, SECTION_COUNT_OFFSET), 3);
        assert_eq!(word(&bytes, 0x28), 4);
        assert_eq!(word(&bytes, SECTION_INFO_PTR_OFFSET), 0x300);
        assert_eq!(word(&bytes, BUFFER_DATA_PTR_OFFSET), 0x400);
        assert_eq!(word(&bytes, 0x4C), 0x80);
        assert_eq!(word(&bytes, UNKNOWN_BITS_OFFSET), DEFAULT_UNKNOWN_BITS);
        assert_eq!(word(&bytes, HEADER_SIZE), MANIFEST_TYPE_CODE);
        assert_eq!(bytes.len() as u64, header.size());
    }

    #[test]
    fn test_model_constant() {
        let bytes = written(&Header::new(RenderWareKind::Model), 0);
        assert_eq!(word(&bytes, 0x28), 16);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = written(&Header::default(), 0);
        bytes[1] = b'X';
        let err = Header::default().read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic));
    }

    #[test]
    fn test_unknown_kind() {
        let mut bytes = written(&Header::default(), 0);
        bytes[KIND_OFFSET as usize] = 7;
        let err = Header::default().read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::UnknownKind(7)));
    }

    #[test]
    fn test_second_count_wins() {
        let mut bytes = written(&Header::default(), 0);
        bytes[0x20] = 5;
        let len = bytes.len() as u32;
        bytes[SECTION_INFO_PTR_OFFSET as usize..][..4].copy_from_slice(&len.to_le_bytes());
        let infos = Header::default().read(&mut Cursor::new(bytes)).unwrap();
        assert!(infos.is_empty());
    }

    #[test]
    fn test_read_adjusts_base_resources() {
        let mut header = Header::new(RenderWareKind::Model);
        header.unknown_bits = 0x1234;

        let mut cursor = Cursor::new(Vec::new());
        let infos_at = header.size();
        header.write(&mut cursor, 2, infos_at, 0x1000, 0).unwrap();
        SectionInfo { offset: 0x200, type_code: 0x20003, ..Default::default() }
            .write(&mut cursor)
            .unwrap();
        SectionInfo { offset: 0x10, type_code: BASE_RESOURCE_TYPE_CODE, ..Default::default() }
            .write(&mut cursor)
            .unwrap();

        cursor.set_position(0);
        let mut read = Header::default();
        let infos = read.read(&mut cursor).unwrap();
        assert_eq!(read.unknown_bits, 0x1234);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].offset, 0x200);
        assert_eq!(infos[1].offset, 0x1010);
    }
}
