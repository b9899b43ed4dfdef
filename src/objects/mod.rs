//! Section payload types.
//!
//! Every object stored in a RenderWare container is one variant of the
//! closed [`RwObject`] union. Each variant implements [`RwSection`], which
//! ties it to a type code and an alignment and provides its payload codec.
//! Sections whose type code is not registered are kept as
//! [`UnknownSection`] raw bytes so that they round-trip in place.
//!
//! - [`BaseResource`] - raw buffer stored in the trailing buffer region
//! - [`Raster`] - texture descriptor
//! - [`VertexDescription`] - vertex layout
//! - [`CompiledState`] - compiled material state blob
//! - [`SkinMatrixBuffer`] - skinning matrices, self sub-referenced
//! - [`BBox`] - axis-aligned bounding box
//! - [`TriangleKdTreeProcedural`] - collision kd-tree

use std::io::{Read, Seek, Write};

use crate::rw4::{ReadContext, WriteContext};
use crate::util::Result;

mod base_resource;
mod bbox;
mod compiled_state;
mod kd_tree;
mod raster;
mod skin_matrix_buffer;
mod unknown;
mod vertex_description;

pub use base_resource::BaseResource;
pub use bbox::BBox;
pub use compiled_state::CompiledState;
pub use kd_tree::{KdTreeNode, TriangleKdTreeProcedural};
pub use raster::Raster;
pub use skin_matrix_buffer::{Matrix3x4, SkinMatrixBuffer};
pub use unknown::UnknownSection;
pub use vertex_description::{VertexDescription, VertexElement};

/// Payload codec of one registered section type.
///
/// Objects are created empty with [`Default`] before any payload is read,
/// so `read` may resolve references to siblings that are not populated yet.
pub trait RwSection: Default {
    /// Type code identifying this variant on disk.
    const TYPE_CODE: u32;

    /// Required alignment of the payload offset; 0 means none.
    const ALIGNMENT: u32 = 0;

    /// Populate from the stream, positioned at the payload start.
    fn read<R: Read + Seek>(&mut self, stream: &mut R, ctx: &ReadContext<'_>) -> Result<()>;

    /// Serialize at the current stream position.
    fn write<W: Write + Seek>(&self, stream: &mut W, ctx: &mut WriteContext<'_>) -> Result<()>;
}

/// Typed access into an [`RwObject`].
pub trait ObjectVariant: Sized {
    fn from_object(object: &RwObject) -> Option<&Self>;
    fn from_object_mut(object: &mut RwObject) -> Option<&mut Self>;
}

macro_rules! rw_objects {
    ($($variant:ident),* $(,)?) => {
        /// One object of a RenderWare container.
        #[derive(Debug, Clone, PartialEq)]
        pub enum RwObject {
            $($variant($variant),)*
            /// Section with an unregistered type code.
            Unknown(UnknownSection),
        }

        impl RwObject {
            /// Construct an empty object for a registered type code.
            pub fn from_type_code(type_code: u32) -> Option<Self> {
                $(
                    if type_code == <$variant as RwSection>::TYPE_CODE {
                        return Some(Self::$variant($variant::default()));
                    }
                )*
                None
            }

            /// Type codes of every registered variant.
            pub fn registered_type_codes() -> &'static [u32] {
                &[$(<$variant as RwSection>::TYPE_CODE),*]
            }

            pub fn type_code(&self) -> u32 {
                match self {
                    $(Self::$variant(_) => <$variant as RwSection>::TYPE_CODE,)*
                    Self::Unknown(section) => section.type_code,
                }
            }

            pub fn alignment(&self) -> u32 {
                match self {
                    $(Self::$variant(_) => <$variant as RwSection>::ALIGNMENT,)*
                    Self::Unknown(section) => section.alignment,
                }
            }

            /// Name of the variant, for diagnostics.
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($variant),)*
                    Self::Unknown(_) => "Unknown",
                }
            }

            pub fn read<R: Read + Seek>(&mut self, stream: &mut R, ctx: &ReadContext<'_>) -> Result<()> {
                match self {
                    $(Self::$variant(object) => object.read(stream, ctx),)*
                    Self::Unknown(section) => section.read(stream, ctx),
                }
            }

            pub fn write<W: Write + Seek>(&self, stream: &mut W, ctx: &mut WriteContext<'_>) -> Result<()> {
                match self {
                    $(Self::$variant(object) => object.write(stream, ctx),)*
                    Self::Unknown(section) => section.write(stream),
                }
            }
        }

        $(
            impl From<$variant> for RwObject {
                fn from(object: $variant) -> Self {
                    Self::$variant(object)
                }
            }

            impl ObjectVariant for $variant {
                fn from_object(object: &RwObject) -> Option<&Self> {
                    match object {
                        RwObject::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_object_mut(object: &mut RwObject) -> Option<&mut Self> {
                    match object {
                        RwObject::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

rw_objects! {
    BaseResource,
    Raster,
    VertexDescription,
    CompiledState,
    SkinMatrixBuffer,
    BBox,
    TriangleKdTreeProcedural,
}

impl RwObject {
    /// Whether the type code of this section was not recognized.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Whether this section is stored in the trailing buffer region.
    pub fn is_base_resource(&self) -> bool {
        matches!(self, Self::BaseResource(_))
    }

    /// Downcast to a concrete variant.
    pub fn downcast_ref<T: ObjectVariant>(&self) -> Option<&T> {
        T::from_object(self)
    }

    pub fn downcast_mut<T: ObjectVariant>(&mut self) -> Option<&mut T> {
        T::from_object_mut(self)
    }
}

impl From<UnknownSection> for RwObject {
    fn from(section: UnknownSection) -> Self {
        Self::Unknown(section)
    }
}

impl ObjectVariant for UnknownSection {
    fn from_object(object: &RwObject) -> Option<&Self> {
        match object {
            RwObject::Unknown(inner) => Some(inner),
            _ => None,
        }
    }

    fn from_object_mut(object: &mut RwObject) -> Option<&mut Self> {
        match object {
            RwObject::Unknown(inner) => Some(inner),
            _ => None,
        }
    }
}
