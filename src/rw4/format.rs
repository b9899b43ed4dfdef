//! RenderWare 4 format constants and layout helpers.

/// Magic bytes at the start of every RW4 file.
pub const RW4_MAGIC: &[u8; 28] = &[
    0x89, 0x52, 0x57, 0x34, 0x77, 0x33, 0x32, 0x00, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x20, 0x04, 0x00,
    0x34, 0x35, 0x34, 0x00, 0x30, 0x30, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Size of the fixed header, before the section manifest.
pub const HEADER_SIZE: u64 = 0x98;

/// Offset of the file kind in the header.
pub const KIND_OFFSET: u64 = 0x1C;

/// Offset of the authoritative section count.
pub const SECTION_COUNT_OFFSET: u64 = 0x24;

/// Offset of the section-info table pointer.
pub const SECTION_INFO_PTR_OFFSET: u64 = 0x30;

/// Offset of the buffer-data region pointer.
pub const BUFFER_DATA_PTR_OFFSET: u64 = 0x44;

/// Offset of the opaque `unknown_bits` word.
pub const UNKNOWN_BITS_OFFSET: u64 = 0x64;

/// Default value of the opaque `unknown_bits` header word.
pub const DEFAULT_UNKNOWN_BITS: u32 = 0x00C0_0758;

/// Size of one section-info record.
pub const SECTION_INFO_SIZE: u64 = 24;

/// Zero padding written after the sub-reference table.
pub const SUB_REFERENCE_PADDING: u64 = 48;

/// Type code of raw buffer sections, stored in the trailing buffer region.
pub const BASE_RESOURCE_TYPE_CODE: u32 = 0x10030;

/// Type codes that always open the manifest type table, in order.
pub const RESERVED_TYPE_CODES: [u32; 5] = [0, BASE_RESOURCE_TYPE_CODE, 0x10031, 0x10032, 0x10010];

/// Section manifest block type codes.
pub const MANIFEST_TYPE_CODE: u32 = 0x10004;
pub const TYPES_TYPE_CODE: u32 = 0x10005;
pub const EXTERNAL_ARENAS_TYPE_CODE: u32 = 0x10006;
pub const SUB_REFERENCES_TYPE_CODE: u32 = 0x10007;
pub const ATOMS_TYPE_CODE: u32 = 0x10008;

/// Round `offset` up to the next multiple of `alignment`.
///
/// An alignment of 0 or 1 leaves the offset unchanged.
#[inline]
pub const fn align_up(offset: u64, alignment: u32) -> u64 {
    let alignment = if alignment == 0 { 1 } else { alignment as u64 };
    offset.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(RW4_MAGIC.len(), 28);
        assert_eq!(&RW4_MAGIC[1..4], b"RW4");
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 4), 20);
        assert_eq!(align_up(17, 0), 17);
        assert_eq!(align_up(17, 1), 17);
    }

    #[test]
    fn test_reserved_prefix() {
        assert_eq!(RESERVED_TYPE_CODES[0], 0);
        assert_eq!(RESERVED_TYPE_CODES[1], BASE_RESOURCE_TYPE_CODE);
    }
}
