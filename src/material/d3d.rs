//! Direct3D 9 state identifiers used as keys in compiled states.
//!
//! Values are stored as raw numbers so that states this crate has no name
//! for still round-trip. Only commonly used identifiers get a constant.

use std::fmt;
use std::hash::Hash;

/// Raw conversion shared by the state key types.
pub trait StateKey: Copy + Eq + Hash {
    fn from_raw(value: u32) -> Self;
    fn raw(self) -> u32;
}

macro_rules! d3d_key {
    ($(#[$meta:meta])* $name:ident { $($constant:ident = $value:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        pub struct $name(pub u32);

        impl $name {
            $(pub const $constant: Self = Self($value);)*

            /// Direct3D name of this identifier, if known.
            pub fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($constant)),)*
                    _ => None,
                }
            }
        }

        impl StateKey for $name {
            fn from_raw(value: u32) -> Self {
                Self(value)
            }

            fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, "{}", self.0),
                }
            }
        }
    };
}

d3d_key! {
    /// `D3DRENDERSTATETYPE`.
    RenderStateType {
        ZENABLE = 7,
        ZWRITEENABLE = 14,
        ALPHATESTENABLE = 15,
        SRCBLEND = 19,
        DESTBLEND = 20,
        CULLMODE = 22,
        ALPHAREF = 24,
        ALPHAFUNC = 25,
        ALPHABLENDENABLE = 27,
        SRCBLENDALPHA = 207,
        DESTBLENDALPHA = 208,
    }
}

d3d_key! {
    /// `D3DTEXTURESTAGESTATETYPE`.
    TextureStageStateType {
        COLOROP = 1,
        COLORARG1 = 2,
        COLORARG2 = 3,
        ALPHAOP = 4,
        ALPHAARG1 = 5,
        ALPHAARG2 = 6,
    }
}

d3d_key! {
    /// `D3DSAMPLERSTATETYPE`.
    SamplerStateType {
        ADDRESSU = 1,
        ADDRESSV = 2,
        ADDRESSW = 3,
        BORDERCOLOR = 4,
        MAGFILTER = 5,
        MINFILTER = 6,
        MIPFILTER = 7,
    }
}

/// `D3DPRIMITIVETYPE` triangle list, the default primitive type.
pub const D3DPT_TRIANGLELIST: u32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(RenderStateType::CULLMODE.name(), Some("CULLMODE"));
        assert_eq!(RenderStateType(999).name(), None);
        assert_eq!(SamplerStateType::MIPFILTER.to_string(), "MIPFILTER");
        assert_eq!(TextureStageStateType(77).to_string(), "77");
    }
}
