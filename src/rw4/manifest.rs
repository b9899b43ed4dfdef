//! Section manifest: the four small tables that follow the fixed header.
//!
//! ```text
//! +------------------------+  0x98
//! | manifest head          |  32 bytes, pointers relative to its start
//! +------------------------+
//! | types                  |  12 + 4 * n bytes
//! +------------------------+
//! | external arenas        |  36 bytes
//! +------------------------+
//! | sub-references         |  24 bytes (table itself lives elsewhere)
//! +------------------------+
//! | atoms                  |  12 bytes
//! +------------------------+
//! ```

use std::collections::BTreeSet;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::trace;

use super::format::*;
use super::index::{self, IndexSpace, ObjectId};
use super::io::{ReadExt, WriteExt};
use crate::util::{Error, Result};

const HEAD_SIZE: u64 = 32;
const TYPES_FIXED_SIZE: u64 = 12;
const EXTERNAL_ARENAS_SIZE: u64 = 36;
const SUB_REFERENCES_SIZE: u64 = 24;
const ATOMS_SIZE: u64 = 12;

/// Ordered table of the distinct type codes used in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTypes {
    pub type_codes: Vec<u32>,
    /// Opaque word following the count.
    pub field_8: u32,
}

impl Default for SectionTypes {
    fn default() -> Self {
        Self { type_codes: RESERVED_TYPE_CODES.to_vec(), field_8: 12 }
    }
}

impl SectionTypes {
    /// Rebuild the table: the reserved prefix followed by the sorted set of
    /// all other codes in use. Base resources are covered by the prefix.
    pub fn rebuild(&mut self, codes: impl IntoIterator<Item = u32>) {
        let used: BTreeSet<u32> = codes
            .into_iter()
            .filter(|code| !RESERVED_TYPE_CODES.contains(code))
            .collect();

        self.type_codes.clear();
        self.type_codes.extend_from_slice(&RESERVED_TYPE_CODES);
        self.type_codes.extend(used);
    }

    /// Position of `type_code` in the table.
    pub fn index_of(&self, type_code: u32) -> Option<u32> {
        self.type_codes.iter().position(|c| *c == type_code).map(|i| i as u32)
    }

    fn size(&self) -> u64 {
        TYPES_FIXED_SIZE + 4 * self.type_codes.len() as u64
    }
}

/// External arena descriptor; eight opaque words preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalArenas {
    pub fields: [u32; 8],
}

impl Default for ExternalArenas {
    fn default() -> Self {
        Self { fields: [3, 0x18, 1, 0xFFB0_0000, 1, 0, 0, 0] }
    }
}

/// A pointer into the interior of an object's serialized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubReference {
    pub object: ObjectId,
    /// Byte offset inside the object's payload.
    pub offset: u32,
}

/// Sub-reference table header and entries.
///
/// The header is read with the manifest; the entries can only be resolved
/// once every object slot exists, see [`SubReferences::read_references`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubReferences {
    pub references: Vec<SubReference>,
    /// Opaque words preceding the count.
    pub fields: [u32; 3],
    /// Absolute offset of the entry table.
    pub offset: u64,
    /// Entry count as declared by the header.
    count: u32,
}

impl SubReferences {
    /// Read the entry table, resolving each target in the `Object` space.
    pub fn read_references<R: Read + Seek>(&mut self, stream: &mut R, object_count: usize) -> Result<()> {
        self.references.clear();
        if self.count == 0 {
            return Ok(());
        }

        stream.seek(SeekFrom::Start(self.offset))?;
        for _ in 0..self.count {
            let pos = stream.stream_position()?;
            let value = stream.read_u32::<LittleEndian>()?;
            let offset = stream.read_u32::<LittleEndian>()?;

            let slot = match index::decode(value)? {
                (IndexSpace::Object, slot) if (slot as usize) < object_count => slot as usize,
                _ => {
                    return Err(Error::malformed(
                        pos,
                        format!("sub-reference target {value:#x} is not an object"),
                    ))
                }
            };
            self.references.push(SubReference { object: ObjectId(slot), offset });
        }

        trace!(count = self.references.len(), "read sub-references");
        Ok(())
    }

    /// Number of entries declared in the header.
    pub fn declared_count(&self) -> u32 {
        self.count
    }
}

/// Two opaque words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Atoms {
    pub fields: [u32; 2],
}

/// The four manifest tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionManifest {
    /// Opaque words of the manifest head.
    pub fields: [u32; 2],
    pub types: SectionTypes,
    pub external_arenas: ExternalArenas,
    pub sub_references: SubReferences,
    pub atoms: Atoms,
}

impl Default for SectionManifest {
    fn default() -> Self {
        Self {
            fields: [12, 0],
            types: SectionTypes::default(),
            external_arenas: ExternalArenas::default(),
            sub_references: SubReferences::default(),
            atoms: Atoms::default(),
        }
    }
}

impl SectionManifest {
    /// Serialized size of the manifest.
    pub fn size(&self) -> u64 {
        HEAD_SIZE + self.types.size() + EXTERNAL_ARENAS_SIZE + SUB_REFERENCES_SIZE + ATOMS_SIZE
    }

    /// Read the manifest at the current position.
    ///
    /// Only the sub-reference header is read here, not its entries.
    pub fn read<R: Read + Seek>(&mut self, stream: &mut R) -> Result<()> {
        let base = stream.stream_position()?;

        stream.expect_u32(MANIFEST_TYPE_CODE, "manifest type code")?;
        stream.expect_u32(4, "manifest block count")?;
        self.fields = stream.read_u32_array()?;
        let [p_types, p_arenas, p_sub_references, p_atoms] = stream.read_u32_array::<4>()?;

        stream.seek(SeekFrom::Start(base + p_types as u64))?;
        stream.expect_u32(TYPES_TYPE_CODE, "types type code")?;
        let count = stream.read_u32::<LittleEndian>()?;
        self.types.field_8 = stream.read_u32::<LittleEndian>()?;
        self.types.type_codes.clear();
        for _ in 0..count {
            self.types.type_codes.push(stream.read_u32::<LittleEndian>()?);
        }

        stream.seek(SeekFrom::Start(base + p_arenas as u64))?;
        stream.expect_u32(EXTERNAL_ARENAS_TYPE_CODE, "external arenas type code")?;
        self.external_arenas.fields = stream.read_u32_array()?;

        stream.seek(SeekFrom::Start(base + p_sub_references as u64))?;
        stream.expect_u32(SUB_REFERENCES_TYPE_CODE, "sub-references type code")?;
        self.sub_references.fields = stream.read_u32_array()?;
        self.sub_references.count = stream.read_u32::<LittleEndian>()?;
        self.sub_references.offset = stream.read_offset()?;

        stream.seek(SeekFrom::Start(base + p_atoms as u64))?;
        stream.expect_u32(ATOMS_TYPE_CODE, "atoms type code")?;
        self.atoms.fields = stream.read_u32_array()?;

        Ok(())
    }

    /// Write the manifest at the current position.
    ///
    /// The sub-reference count and table offset are taken from the current
    /// entry list and `sub_references.offset`.
    pub fn write<W: Write + Seek>(&self, stream: &mut W) -> Result<()> {
        let p_types = HEAD_SIZE;
        let p_arenas = p_types + self.types.size();
        let p_sub_references = p_arenas + EXTERNAL_ARENAS_SIZE;
        let p_atoms = p_sub_references + SUB_REFERENCES_SIZE;

        stream.write_u32::<LittleEndian>(MANIFEST_TYPE_CODE)?;
        stream.write_u32::<LittleEndian>(4)?;
        stream.write_u32_slice(&self.fields)?;
        for pointer in [p_types, p_arenas, p_sub_references, p_atoms] {
            stream.write_offset(pointer)?;
        }

        stream.write_u32::<LittleEndian>(TYPES_TYPE_CODE)?;
        stream.write_u32::<LittleEndian>(self.types.type_codes.len() as u32)?;
        stream.write_u32::<LittleEndian>(self.types.field_8)?;
        stream.write_u32_slice(&self.types.type_codes)?;

        stream.write_u32::<LittleEndian>(EXTERNAL_ARENAS_TYPE_CODE)?;
        stream.write_u32_slice(&self.external_arenas.fields)?;

        stream.write_u32::<LittleEndian>(SUB_REFERENCES_TYPE_CODE)?;
        stream.write_u32_slice(&self.sub_references.fields)?;
        stream.write_u32::<LittleEndian>(self.sub_references.references.len() as u32)?;
        stream.write_offset(self.sub_references.offset)?;

        stream.write_u32::<LittleEndian>(ATOMS_TYPE_CODE)?;
        stream.write_u32_slice(&self.atoms.fields)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_rebuild_types() {
        let mut types = SectionTypes::default();
        types.rebuild([0x2000B, BASE_RESOURCE_TYPE_CODE, 0x20003, 0x2000B, 0x80005]);
        assert_eq!(
            types.type_codes,
            vec![0, BASE_RESOURCE_TYPE_CODE, 0x10031, 0x10032, 0x10010, 0x20003, 0x2000B, 0x80005]
        );
        assert_eq!(types.index_of(0x20003), Some(5));
        assert_eq!(types.index_of(BASE_RESOURCE_TYPE_CODE), Some(1));
        assert_eq!(types.index_of(0x12345), None);
    }

    #[test]
    fn test_size_matches_written_bytes() {
        let mut manifest = SectionManifest::default();
        manifest.types.rebuild([0x20003, 0x2000B]);

        let mut cursor = Cursor::new(Vec::new());
        manifest.write(&mut cursor).unwrap();
        assert_eq!(cursor.get_ref().len() as u64, manifest.size());
        assert_eq!(manifest.size(), 116 + 4 * 7);
    }

    #[test]
    fn test_manifest_roundtrip() {
        let mut manifest = SectionManifest::default();
        manifest.types.rebuild([0x20003]);
        manifest.external_arenas.fields[7] = 0xAB;
        manifest.atoms.fields = [1, 2];
        manifest.sub_references.offset = 0x400;
        manifest.sub_references.references.push(SubReference { object: ObjectId(0), offset: 16 });

        let mut cursor = Cursor::new(Vec::new());
        manifest.write(&mut cursor).unwrap();

        let mut read = SectionManifest::default();
        cursor.set_position(0);
        read.read(&mut cursor).unwrap();

        assert_eq!(read.types, manifest.types);
        assert_eq!(read.external_arenas, manifest.external_arenas);
        assert_eq!(read.atoms, manifest.atoms);
        assert_eq!(read.sub_references.offset, 0x400);
        assert_eq!(read.sub_references.declared_count(), 1);
        assert!(read.sub_references.references.is_empty());
    }

    #[test]
    fn test_sub_reference_must_target_object() {
        let mut data = Vec::new();
        data.extend_from_slice(&index::NO_OBJECT.to_le_bytes());
        data.extend_from_slice(&16u32.to_le_bytes());

        let mut refs = SubReferences { count: 1, offset: 0, ..Default::default() };
        let err = refs.read_references(&mut Cursor::new(data), 4).unwrap_err();
        assert!(matches!(err, Error::Malformed { offset: 0, .. }));
    }
}
