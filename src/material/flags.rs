//! Flag words of a compiled material state.
//!
//! Only the bits below are interpreted. Every other bit is carried in the
//! compiler's `extra_flags*` fields and written back unchanged.

use bitflags::bitflags;

bitflags! {
    /// First flag word: which optional members follow the blob head.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags1: u32 {
        const MODEL_TO_WORLD        = 0x0000_0001;
        const MODEL_TO_WORLD_OBJECT = 0x0000_0002;
        const SHADER_DATA           = 0x0000_0008;
        const MATERIAL_COLOR        = 0x0000_0010;
        const AMBIENT_COLOR         = 0x0000_0020;
        /// One bit per optional float, bits 6 to 13.
        const OPTIONAL_FLOATS       = 0x0000_3FC0;
        const USE_BOOLEANS          = 0x0000_8000;
        const RESERVED_INT          = 0x0001_0000;
        const RESERVED_VEC3         = 0x0002_0000;
        const RESERVED_FLOAT1       = 0x0004_0000;
        const RESERVED_FLOAT2       = 0x0008_0000;
        const VERTEX_DESCRIPTION    = 0x0010_0000;
    }
}

bitflags! {
    /// Second flag word. The low 16 bits mirror [`Flags1`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags2: u32 {
        const MIRROR             = 0x0000_FFFF;
        const VERTEX_DESCRIPTION = 0x0010_0000;
    }
}

bitflags! {
    /// Third flag word: texture slots, render states and the palette.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags3: u32 {
        /// One bit per sampler index, 0 to 16.
        const TEXTURE_SLOTS   = 0x0001_FFFF;
        const RENDER_STATES   = 0x0002_0000;
        const PALETTE_ENTRIES = 0x0010_0000;
    }
}

bitflags! {
    /// Bits of `field_14` that gate the reserved integer arrays.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Field14: u32 {
        const RESERVED_7  = 0x0002_0000;
        const RESERVED_11A = 0x0004_0000;
        const RESERVED_11B = 0x0008_0000;
    }
}

/// Flag bit of optional float `index` (0 to 7).
#[inline]
pub(crate) const fn optional_float_bit(index: usize) -> u32 {
    1 << (6 + index)
}

/// Number of texture samplers addressable by [`Flags3::TEXTURE_SLOTS`].
pub const SAMPLER_COUNT: usize = 17;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_masks() {
        assert_eq!(Flags1::all().bits(), 0x001F_BFFB);
        assert_eq!(Flags2::all().bits(), 0x0010_FFFF);
        assert_eq!(Flags3::all().bits(), 0x0013_FFFF);
        assert_eq!(Flags3::TEXTURE_SLOTS.bits().count_ones() as usize, SAMPLER_COUNT);
    }

    #[test]
    fn test_optional_float_bits() {
        let all = (0..8).fold(0, |acc, i| acc | optional_float_bit(i));
        assert_eq!(all, Flags1::OPTIONAL_FLOATS.bits());
    }
}
