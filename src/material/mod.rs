//! Compiled material states.
//!
//! This module decodes and encodes the payload of `CompiledState` sections:
//! a flag-driven, variable-length record of render states, texture bindings
//! and shader constants used by the renderer.
//!
//! ## Key Concepts
//!
//! - **Flag words**: which optional members are present; see [`flags`]
//! - **Render state groups**: group id to Direct3D render-state values
//! - **Texture slots**: a raster bound to a sampler, with stage and sampler states
//!
//! ## Example
//!
//! ```ignore
//! use rw4::material::{MaterialStateCompiler, TextureSlot};
//!
//! let mut state = MaterialStateCompiler::new();
//! state.material_color = Some(glam::Vec4::ONE);
//! state.texture_slots.push(TextureSlot::new(0, Some(raster)));
//! let blob = state.compile(&renderware)?;
//! ```

mod compiler;
pub mod d3d;
pub mod flags;
mod state;

pub use compiler::{MaterialStateCompiler, RenderStateGroups};
pub use d3d::{RenderStateType, SamplerStateType, StateKey, TextureStageStateType};
pub use flags::{Field14, Flags1, Flags2, Flags3, SAMPLER_COUNT};
pub use state::{
    ModelToWorld, ShaderConstant, TextureSlot, DEFAULT_SAMPLER_STATES_MASK, DEFAULT_STAGE_STATES_MASK,
};
