//! # RW4
//!
//! Rust implementation of the RenderWare 4 (.rw4) object container used by
//! Spore models and textures.
//!
//! A file is an ordered list of typed sections ("objects") that reference
//! each other through packed 32-bit index values. This crate reads and
//! writes the container, the registered section payloads, and the compiled
//! material-state records.
//!
//! ## Modules
//!
//! - [`util`] - Error handling
//! - [`rw4`] - Container, header, manifest and index encoding
//! - [`objects`] - Section payload types and the type-code registry
//! - [`material`] - Compiled material-state codec
//! - [`texture`] - Texture bridge for TEXTURE-kind containers
//!
//! ## Example
//!
//! ```ignore
//! use rw4::prelude::*;
//!
//! let mut renderware = RenderWare::open("model.rw4")?;
//! for (id, raster) in renderware.objects_of::<Raster>() {
//!     println!("{}: {}x{}", id.index(), raster.width, raster.height);
//! }
//! renderware.save("copy.rw4")?;
//! ```

pub mod util;
pub mod rw4;
pub mod objects;
pub mod material;
pub mod texture;

// Re-export commonly used types
pub use util::{Error, Result};
pub use rw4::{IndexTable, ObjectId, RenderWare, RenderWareKind};
pub use objects::RwObject;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::rw4::{IndexSpace, IndexTable, ObjectId, RenderWare, RenderWareKind, NO_OBJECT};
    pub use crate::objects::*;
    pub use crate::material::{MaterialStateCompiler, ModelToWorld, ShaderConstant, TextureSlot};
    pub use crate::texture::Texture;
}
