//! Cross-reference index encoding.
//!
//! Every reference stored inside a section payload is a 32-bit value whose
//! top bits select an index space and whose low 22 bits select a slot:
//!
//! ```text
//! 31        22 21                     0
//! +-----------+-----------------------+
//! |   space   |         slot          |
//! +-----------+-----------------------+
//! ```

use std::fmt;

use crate::util::{Error, Result};

/// Number of bits used by the slot part of an index.
pub const SLOT_BITS: u32 = 22;

/// Mask extracting the slot from an index.
pub const SLOT_MASK: u32 = (1 << SLOT_BITS) - 1;

/// Canonical encoding of the null reference.
pub const NO_OBJECT: u32 = (IndexSpace::NoObject as u32) << SLOT_BITS;

/// Address space selected by the top bits of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum IndexSpace {
    /// Slot is a position in the container's object list.
    Object = 0,
    /// Null reference; the slot is ignored.
    NoObject = 1,
    /// Slot is a position in the manifest's sub-reference table.
    SubReference = 2,
}

impl IndexSpace {
    /// Convert a raw space number.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Object),
            1 => Some(Self::NoObject),
            2 => Some(Self::SubReference),
            _ => None,
        }
    }
}

/// Encode a (space, slot) pair.
///
/// `NoObject` always encodes with slot 0.
#[inline]
pub fn encode(space: IndexSpace, slot: u32) -> u32 {
    debug_assert!(slot <= SLOT_MASK, "slot {slot:#x} does not fit in {SLOT_BITS} bits");
    match space {
        IndexSpace::NoObject => NO_OBJECT,
        _ => ((space as u32) << SLOT_BITS) | (slot & SLOT_MASK),
    }
}

/// Decode an index into its (space, slot) pair.
///
/// `NoObject` always decodes with slot 0.
pub fn decode(value: u32) -> Result<(IndexSpace, u32)> {
    match IndexSpace::from_u32(value >> SLOT_BITS) {
        Some(IndexSpace::NoObject) => Ok((IndexSpace::NoObject, 0)),
        Some(space) => Ok((space, value & SLOT_MASK)),
        None => Err(Error::InvalidIndex(value)),
    }
}

/// Handle to an object inside a [`RenderWare`](crate::RenderWare) container.
///
/// The handle is the object's position in the container's object list, which
/// is also its slot in the `Object` index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectId(pub usize);

impl ObjectId {
    /// Position in the container's object list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_spaces() {
        for space in [IndexSpace::Object, IndexSpace::SubReference] {
            for slot in [0, 1, 0x1234, SLOT_MASK] {
                assert_eq!(decode(encode(space, slot)).unwrap(), (space, slot));
            }
        }
        assert_eq!(decode(encode(IndexSpace::NoObject, 0)).unwrap(), (IndexSpace::NoObject, 0));
    }

    #[test]
    fn test_no_object_ignores_slot() {
        assert_eq!(encode(IndexSpace::NoObject, 77), NO_OBJECT);
        assert_eq!(NO_OBJECT, 0x0040_0000);
        assert_eq!(decode(NO_OBJECT | 5).unwrap(), (IndexSpace::NoObject, 0));
    }

    #[test]
    fn test_bit_layout() {
        assert_eq!(encode(IndexSpace::Object, 3), 3);
        assert_eq!(encode(IndexSpace::SubReference, 1), 0x0080_0001);
    }

    #[test]
    fn test_invalid_space() {
        assert!(matches!(decode(0xFFFF_FFFF), Err(Error::InvalidIndex(0xFFFF_FFFF))));
        assert!(matches!(decode(3 << SLOT_BITS), Err(Error::InvalidIndex(_))));
    }
}
