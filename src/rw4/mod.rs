//! RenderWare 4 container codec.
//!
//! ## File layout
//!
//! ```text
//! 0x00  fixed header (0x98 bytes): magic, kind, counts, region pointers
//! 0x98  section manifest: types, external arenas, sub-references, atoms
//! ....  section payloads, each at its own alignment
//! ....  section-info table (24 bytes per object)
//! ....  sub-reference table, then 48 bytes of padding
//! ....  buffer region: base-resource payloads
//! ```
//!
//! ## Key Concepts
//!
//! - **Objects**: payloads in a fixed order; position is identity
//! - **Index values**: 32-bit references split into a space and a slot, see [`index`]
//! - **Sub-references**: pointers to a byte offset inside another object's payload

mod container;
pub mod format;
mod header;
pub mod index;
pub(crate) mod io;
mod manifest;
mod references;
mod section;

pub use container::RenderWare;
pub use header::{Header, RenderWareKind};
pub use index::{IndexSpace, ObjectId, NO_OBJECT};
pub use manifest::{Atoms, ExternalArenas, SectionManifest, SectionTypes, SubReference, SubReferences};
pub use references::{IndexTable, IndexView, ReadContext, WriteContext};
pub use section::SectionInfo;
