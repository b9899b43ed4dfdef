//! Members of a compiled material state.

use glam::Mat4;
use indexmap::IndexMap;

use super::d3d::{SamplerStateType, TextureStageStateType};
use crate::rw4::ObjectId;

/// Default stage-state mask of a new texture slot.
pub const DEFAULT_STAGE_STATES_MASK: u32 = 0x3F;

/// Default sampler-state mask of a new texture slot.
pub const DEFAULT_SAMPLER_STATES_MASK: u32 = 0x73;

/// Model-to-world transform, either inline or held by another object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelToWorld {
    Object(Option<ObjectId>),
    Matrix(Mat4),
}

/// Shader constant block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderConstant {
    /// Register index; never 0, which terminates the list.
    pub index: i16,
    pub offset: i16,
    pub data: Vec<u32>,
    /// Word that follows an entry without data.
    pub empty_padding: u32,
}

impl ShaderConstant {
    pub fn new(index: i16, offset: i16, data: Vec<u32>) -> Self {
        Self { index, offset, data, empty_padding: 0 }
    }
}

/// Texture bound to one sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub sampler_index: u32,
    /// Usually a `Raster`, sometimes another compiled state.
    pub raster: Option<ObjectId>,
    /// When 0, no stage states are stored.
    pub stage_states_mask: u32,
    pub stage_states: IndexMap<TextureStageStateType, u32>,
    /// When 0, no sampler states are stored.
    pub sampler_states_mask: u32,
    pub sampler_states: IndexMap<SamplerStateType, u32>,
}

impl Default for TextureSlot {
    fn default() -> Self {
        Self {
            sampler_index: 0,
            raster: None,
            stage_states_mask: DEFAULT_STAGE_STATES_MASK,
            stage_states: IndexMap::new(),
            sampler_states_mask: DEFAULT_SAMPLER_STATES_MASK,
            sampler_states: IndexMap::new(),
        }
    }
}

impl TextureSlot {
    pub fn new(sampler_index: u32, raster: Option<ObjectId>) -> Self {
        Self { sampler_index, raster, ..Default::default() }
    }
}
