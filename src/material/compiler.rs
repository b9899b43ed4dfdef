//! Compiled material state codec.
//!
//! A compiled state is a length-prefixed blob whose members are present or
//! absent depending on three flag words and `field_14`:
//!
//! ```text
//! length | primitive | flags1 | flags2 | flags3 | field_14 | renderer | pad
//! [model to world]      flags1 & MODEL_TO_WORLD
//! [vertex description]  flags1 & VERTEX_DESCRIPTION
//! [shader data]         flags1 & SHADER_DATA, terminated by index 0
//! [material color] [ambient color] [optional floats] [booleans]
//! [reserved groups]     flags1 bits 16..19, field_14 bits 17..19
//! [render states]       flags3 & RENDER_STATES, -1 terminated
//! palette index         always present
//! [texture slots]       flags3 & TEXTURE_SLOTS, -1 terminated
//! [trailing bytes]
//! ```

use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Mat4, Vec3, Vec4};
use indexmap::IndexMap;
use tracing::trace;

use super::d3d::{RenderStateType, StateKey, D3DPT_TRIANGLELIST};
use super::flags::{optional_float_bit, Field14, Flags1, Flags2, Flags3, SAMPLER_COUNT};
use super::state::{ModelToWorld, ShaderConstant, TextureSlot};
use crate::objects::VertexDescription;
use crate::rw4::io::{ReadExt, WriteExt};
use crate::rw4::index;
use crate::rw4::{IndexSpace, IndexTable, ObjectId};
use crate::util::{Error, Result};

/// Terminator of every -1 terminated list.
const SENTINEL: u32 = u32::MAX;

/// Zero bytes following the shader data terminator.
const SHADER_DATA_END_PADDING: u64 = 6;

type Blob<'a> = Cursor<&'a [u8]>;

/// Render-state groups: group id to (state, value) pairs.
pub type RenderStateGroups = IndexMap<u32, IndexMap<RenderStateType, u32>>;

/// Structured form of a compiled material state.
///
/// [`decompile`](Self::decompile) and [`compile`](Self::compile) are
/// inverse. Flag bits are derived from which members are present; bits this
/// crate does not interpret are kept in `extra_flags*`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialStateCompiler {
    /// `D3DPRIMITIVETYPE`.
    pub primitive_type: u32,
    pub renderer_id: u32,
    /// Opaque word; bits 17..19 gate the reserved integer arrays.
    pub field_14: u32,

    pub model_to_world: Option<ModelToWorld>,
    pub vertex_description: Option<VertexDescription>,
    pub shader_data: Vec<ShaderConstant>,
    /// RGBA.
    pub material_color: Option<Vec4>,
    /// RGB.
    pub ambient_color: Option<Vec3>,
    pub optional_floats: [Option<f32>; 8],
    pub booleans: Option<[bool; SAMPLER_COUNT]>,

    pub reserved_int: Option<u32>,
    pub reserved_vec3: Option<[f32; 3]>,
    pub reserved_float1: Option<f32>,
    pub reserved_float2: Option<f32>,
    pub reserved_7: Option<[u32; 7]>,
    pub reserved_11a: Option<[u32; 11]>,
    pub reserved_11b: Option<[u32; 11]>,

    pub render_states: RenderStateGroups,
    pub palette_entries: Option<ObjectId>,
    /// Palette index word as stored; written verbatim when there is no
    /// palette object.
    pub palette_word: u32,
    pub texture_slots: Vec<TextureSlot>,

    pub extra_flags1: u32,
    pub extra_flags2: u32,
    pub extra_flags3: u32,
    /// Bytes after the last decoded member.
    pub trailing: Vec<u8>,

    flags: [u32; 3],
}

impl Default for MaterialStateCompiler {
    fn default() -> Self {
        Self {
            primitive_type: D3DPT_TRIANGLELIST,
            renderer_id: 0,
            field_14: 0,
            model_to_world: None,
            vertex_description: None,
            shader_data: Vec::new(),
            material_color: None,
            ambient_color: None,
            optional_floats: [None; 8],
            booleans: None,
            reserved_int: None,
            reserved_vec3: None,
            reserved_float1: None,
            reserved_float2: None,
            reserved_7: None,
            reserved_11a: None,
            reserved_11b: None,
            render_states: IndexMap::new(),
            palette_entries: None,
            palette_word: SENTINEL,
            texture_slots: Vec::new(),
            extra_flags1: 0,
            extra_flags2: 0,
            extra_flags3: 0,
            trailing: Vec::new(),
            flags: [0; 3],
        }
    }
}

impl MaterialStateCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// First flag word as last read or written.
    pub fn flags1(&self) -> u32 {
        self.flags[0]
    }

    pub fn flags2(&self) -> u32 {
        self.flags[1]
    }

    pub fn flags3(&self) -> u32 {
        self.flags[2]
    }

    /// Decode a compiled blob, resolving object references through `table`.
    ///
    /// A blob that ends before its last flagged member is
    /// [`Error::Malformed`] at the blob offset where reading stopped.
    pub fn decompile(data: &[u8], table: &impl IndexTable) -> Result<Self> {
        let mut stream: Blob<'_> = Cursor::new(data);
        Self::read_blob(&mut stream, data, table).map_err(|e| match e {
            Error::Io(io) if io.kind() == ErrorKind::UnexpectedEof => Error::malformed(
                stream.position(),
                "material state ends before its last member",
            ),
            other => other,
        })
    }

    fn read_blob(stream: &mut Blob<'_>, data: &[u8], table: &impl IndexTable) -> Result<Self> {
        let size = stream.read_u32::<LittleEndian>()?;
        if size as usize != data.len() {
            return Err(Error::malformed(
                0,
                format!("state length {size} does not match blob length {}", data.len()),
            ));
        }

        let mut state = Self::default();
        state.primitive_type = stream.read_u32::<LittleEndian>()?;
        let flags1 = stream.read_u32::<LittleEndian>()?;
        let flags2 = stream.read_u32::<LittleEndian>()?;
        let flags3 = stream.read_u32::<LittleEndian>()?;
        state.field_14 = stream.read_u32::<LittleEndian>()?;
        state.renderer_id = stream.read_u32::<LittleEndian>()?;
        stream.skip(4)?;

        let f1 = Flags1::from_bits_truncate(flags1);
        let f3 = Flags3::from_bits_truncate(flags3);
        let f14 = Field14::from_bits_truncate(state.field_14);

        if f1.contains(Flags1::MODEL_TO_WORLD) {
            state.model_to_world = Some(if f1.contains(Flags1::MODEL_TO_WORLD_OBJECT) {
                ModelToWorld::Object(table.get(stream.read_u32::<LittleEndian>()?)?)
            } else {
                let rows: [f32; 16] = stream.read_f32_array()?;
                ModelToWorld::Matrix(Mat4::from_cols_array(&rows).transpose())
            });
        }

        if f1.contains(Flags1::VERTEX_DESCRIPTION) {
            let mut description = VertexDescription::default();
            description.read_from(stream)?;
            state.vertex_description = Some(description);
        }

        if f1.contains(Flags1::SHADER_DATA) {
            state.shader_data = read_shader_data(stream)?;
        }

        if f1.contains(Flags1::MATERIAL_COLOR) {
            state.material_color = Some(Vec4::from_array(stream.read_f32_array()?));
        }
        if f1.contains(Flags1::AMBIENT_COLOR) {
            state.ambient_color = Some(Vec3::from_array(stream.read_f32_array()?));
        }

        for (i, value) in state.optional_floats.iter_mut().enumerate() {
            if flags1 & optional_float_bit(i) != 0 {
                *value = Some(stream.read_f32::<LittleEndian>()?);
            }
        }

        if f1.contains(Flags1::USE_BOOLEANS) {
            let mut bytes = [0u8; SAMPLER_COUNT];
            stream.read_exact(&mut bytes)?;
            state.booleans = Some(bytes.map(|b| b != 0));
        }

        if f1.contains(Flags1::RESERVED_INT) {
            state.reserved_int = Some(stream.read_u32::<LittleEndian>()?);
        }
        if f1.contains(Flags1::RESERVED_VEC3) {
            state.reserved_vec3 = Some(stream.read_f32_array()?);
        }
        if f1.contains(Flags1::RESERVED_FLOAT1) {
            state.reserved_float1 = Some(stream.read_f32::<LittleEndian>()?);
        }
        if f1.contains(Flags1::RESERVED_FLOAT2) {
            state.reserved_float2 = Some(stream.read_f32::<LittleEndian>()?);
        }

        if f14.contains(Field14::RESERVED_7) {
            state.reserved_7 = Some(stream.read_u32_array()?);
        }
        if f14.contains(Field14::RESERVED_11A) {
            state.reserved_11a = Some(stream.read_u32_array()?);
        }
        if f14.contains(Field14::RESERVED_11B) {
            state.reserved_11b = Some(stream.read_u32_array()?);
        }

        if f3.contains(Flags3::RENDER_STATES) {
            state.render_states = read_render_states(stream)?;
        }

        state.palette_word = stream.read_u32::<LittleEndian>()?;
        if f3.contains(Flags3::PALETTE_ENTRIES) {
            state.palette_entries = table.get(state.palette_word)?;
        }

        if f3.intersects(Flags3::TEXTURE_SLOTS) {
            state.texture_slots = read_texture_slots(stream, table)?;
        }

        let end = stream.position() as usize;
        state.trailing = data.get(end..).unwrap_or_default().to_vec();

        state.extra_flags1 = flags1 & !Flags1::all().bits();
        state.extra_flags2 = flags2 & !Flags2::all().bits();
        state.extra_flags3 = flags3 & !Flags3::all().bits();
        state.flags = [flags1, flags2, flags3];

        trace!(
            flags1 = format_args!("{flags1:#x}"),
            flags3 = format_args!("{flags3:#x}"),
            slots = state.texture_slots.len(),
            "decompiled material state"
        );
        Ok(state)
    }

    /// Encode into a compiled blob, resolving objects through `table`.
    ///
    /// Flag words and the gating bits of `field_14` are recomputed from the
    /// members. When texture slots exist and no booleans were set, the
    /// booleans are synthesized from the slots. Derived members are stored
    /// on `self` only when the blob was built.
    pub fn compile(&mut self, table: &impl IndexTable) -> Result<Vec<u8>> {
        for slot in &self.texture_slots {
            if slot.sampler_index as usize >= SAMPLER_COUNT {
                return Err(Error::malformed(
                    0,
                    format!("sampler index {} is out of range", slot.sampler_index),
                ));
            }
        }

        let booleans = match self.booleans {
            None if !self.texture_slots.is_empty() => {
                let mut booleans = [false; SAMPLER_COUNT];
                for slot in &self.texture_slots {
                    booleans[slot.sampler_index as usize] = true;
                }
                Some(booleans)
            }
            explicit => explicit,
        };

        let [flags1, flags2, flags3] = self.derive_flags(booleans.is_some());
        let field_14 = (self.field_14 & !Field14::all().bits()) | self.derive_field_14().bits();

        let mut stream = Cursor::new(Vec::new());
        stream.write_u32::<LittleEndian>(0)?;
        stream.write_u32::<LittleEndian>(self.primitive_type)?;
        stream.write_u32::<LittleEndian>(flags1)?;
        stream.write_u32::<LittleEndian>(flags2)?;
        stream.write_u32::<LittleEndian>(flags3)?;
        stream.write_u32::<LittleEndian>(field_14)?;
        stream.write_u32::<LittleEndian>(self.renderer_id)?;
        stream.write_padding(4)?;

        match &self.model_to_world {
            Some(ModelToWorld::Object(object)) => {
                stream.write_u32::<LittleEndian>(table.index_of(*object)?)?;
            }
            Some(ModelToWorld::Matrix(matrix)) => {
                stream.write_f32_slice(&matrix.transpose().to_cols_array())?;
            }
            None => {}
        }

        if let Some(description) = &self.vertex_description {
            description.write_to(&mut stream)?;
        }

        if !self.shader_data.is_empty() {
            write_shader_data(&mut stream, &self.shader_data)?;
        }

        if let Some(color) = self.material_color {
            stream.write_f32_slice(&color.to_array())?;
        }
        if let Some(color) = self.ambient_color {
            stream.write_f32_slice(&color.to_array())?;
        }
        for value in self.optional_floats.iter().flatten() {
            stream.write_f32::<LittleEndian>(*value)?;
        }
        if let Some(booleans) = booleans {
            stream.write_all(&booleans.map(u8::from))?;
        }

        if let Some(value) = self.reserved_int {
            stream.write_u32::<LittleEndian>(value)?;
        }
        if let Some(values) = &self.reserved_vec3 {
            stream.write_f32_slice(values)?;
        }
        if let Some(value) = self.reserved_float1 {
            stream.write_f32::<LittleEndian>(value)?;
        }
        if let Some(value) = self.reserved_float2 {
            stream.write_f32::<LittleEndian>(value)?;
        }
        if let Some(values) = &self.reserved_7 {
            stream.write_u32_slice(values)?;
        }
        if let Some(values) = &self.reserved_11a {
            stream.write_u32_slice(values)?;
        }
        if let Some(values) = &self.reserved_11b {
            stream.write_u32_slice(values)?;
        }

        if !self.render_states.is_empty() {
            write_render_states(&mut stream, &self.render_states)?;
        }

        let palette_word = match self.palette_entries {
            Some(_) => table.index_of(self.palette_entries)?,
            // a cleared palette must not leave a stale object reference behind
            None if points_to_object(self.palette_word) => SENTINEL,
            None => self.palette_word,
        };
        stream.write_u32::<LittleEndian>(palette_word)?;

        if !self.texture_slots.is_empty() {
            write_texture_slots(&mut stream, &self.texture_slots, table)?;
        }

        stream.write_all(&self.trailing)?;

        let size = stream.position();
        let size = u32::try_from(size)
            .map_err(|_| Error::malformed(size, "compiled state does not fit in 32 bits"))?;
        stream.seek(SeekFrom::Start(0))?;
        stream.write_u32::<LittleEndian>(size)?;

        self.booleans = booleans;
        self.field_14 = field_14;
        self.palette_word = palette_word;
        self.flags = [flags1, flags2, flags3];
        Ok(stream.into_inner())
    }

    fn derive_flags(&self, use_booleans: bool) -> [u32; 3] {
        let mut f1 = Flags1::empty();
        f1.set(Flags1::MODEL_TO_WORLD, self.model_to_world.is_some());
        f1.set(
            Flags1::MODEL_TO_WORLD_OBJECT,
            matches!(self.model_to_world, Some(ModelToWorld::Object(_))),
        );
        f1.set(Flags1::SHADER_DATA, !self.shader_data.is_empty());
        f1.set(Flags1::MATERIAL_COLOR, self.material_color.is_some());
        f1.set(Flags1::AMBIENT_COLOR, self.ambient_color.is_some());
        f1.set(Flags1::USE_BOOLEANS, use_booleans);
        f1.set(Flags1::RESERVED_INT, self.reserved_int.is_some());
        f1.set(Flags1::RESERVED_VEC3, self.reserved_vec3.is_some());
        f1.set(Flags1::RESERVED_FLOAT1, self.reserved_float1.is_some());
        f1.set(Flags1::RESERVED_FLOAT2, self.reserved_float2.is_some());
        f1.set(Flags1::VERTEX_DESCRIPTION, self.vertex_description.is_some());

        let floats = self
            .optional_floats
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .fold(0, |acc, (i, _)| acc | optional_float_bit(i));
        let flags1 = f1.bits() | floats | (self.extra_flags1 & !Flags1::all().bits());

        let mut f2 = Flags2::empty();
        f2.set(Flags2::VERTEX_DESCRIPTION, self.vertex_description.is_some());
        let flags2 = (flags1 & Flags2::MIRROR.bits()) | f2.bits() | (self.extra_flags2 & !Flags2::all().bits());

        let slots = self.texture_slots.iter().fold(0u32, |acc, s| acc | (1 << s.sampler_index));
        let mut f3 = Flags3::from_bits_truncate(slots);
        f3.set(Flags3::RENDER_STATES, !self.render_states.is_empty());
        f3.set(Flags3::PALETTE_ENTRIES, self.palette_entries.is_some());
        let flags3 = f3.bits() | (self.extra_flags3 & !Flags3::all().bits());

        [flags1, flags2, flags3]
    }

    fn derive_field_14(&self) -> Field14 {
        let mut bits = Field14::empty();
        bits.set(Field14::RESERVED_7, self.reserved_7.is_some());
        bits.set(Field14::RESERVED_11A, self.reserved_11a.is_some());
        bits.set(Field14::RESERVED_11B, self.reserved_11b.is_some());
        bits
    }
}

fn remaining(stream: &Blob<'_>) -> u64 {
    (stream.get_ref().len() as u64).saturating_sub(stream.position())
}

fn read_shader_data(stream: &mut Blob<'_>) -> Result<Vec<ShaderConstant>> {
    let mut constants = Vec::new();
    loop {
        let index = stream.read_i16::<LittleEndian>()?;
        if index == 0 {
            break;
        }
        let offset = stream.read_i16::<LittleEndian>()?;

        let pos = stream.position();
        let length = stream.read_u32::<LittleEndian>()?;
        if length % 4 != 0 {
            return Err(Error::malformed(
                pos,
                format!("shader data length {length} is not a multiple of 4"),
            ));
        }
        if u64::from(length) > remaining(stream) {
            return Err(Error::malformed(pos, format!("shader data length {length} overruns the state")));
        }

        let mut constant = ShaderConstant::new(index, offset, Vec::new());
        if length == 0 {
            constant.empty_padding = stream.read_u32::<LittleEndian>()?;
        } else {
            constant.data = vec![0; length as usize / 4];
            stream.read_u32_into::<LittleEndian>(&mut constant.data)?;
        }
        constants.push(constant);
    }
    stream.skip(SHADER_DATA_END_PADDING)?;
    Ok(constants)
}

fn write_shader_data<W: Write + Seek>(stream: &mut W, constants: &[ShaderConstant]) -> Result<()> {
    for constant in constants {
        if constant.index == 0 {
            return Err(Error::malformed(stream.stream_position()?, "shader constant index 0 is reserved"));
        }
        stream.write_i16::<LittleEndian>(constant.index)?;
        stream.write_i16::<LittleEndian>(constant.offset)?;
        stream.write_u32::<LittleEndian>(constant.data.len() as u32 * 4)?;
        if constant.data.is_empty() {
            stream.write_u32::<LittleEndian>(constant.empty_padding)?;
        } else {
            stream.write_u32_slice(&constant.data)?;
        }
    }
    stream.write_i16::<LittleEndian>(0)?;
    stream.write_padding(SHADER_DATA_END_PADDING)?;
    Ok(())
}

/// Whether a raw reference word designates an object.
fn points_to_object(value: u32) -> bool {
    matches!(index::decode(value), Ok((IndexSpace::Object | IndexSpace::SubReference, _)))
}

/// Read `(key, value)` pairs up to a -1 key.
fn read_state_pairs<K: StateKey>(stream: &mut Blob<'_>) -> Result<IndexMap<K, u32>> {
    let mut states = IndexMap::new();
    loop {
        let pos = stream.position();
        let key = stream.read_u32::<LittleEndian>()?;
        if key == SENTINEL {
            return Ok(states);
        }
        let value = stream.read_u32::<LittleEndian>()?;
        if states.insert(K::from_raw(key), value).is_some() {
            return Err(Error::malformed(pos, format!("state {key} is set twice")));
        }
    }
}

fn write_state_pairs<K: StateKey, W: Write + Seek>(stream: &mut W, states: &IndexMap<K, u32>) -> Result<()> {
    for (key, value) in states {
        if key.raw() == SENTINEL {
            return Err(Error::malformed(stream.stream_position()?, "state key -1 is reserved"));
        }
        stream.write_u32::<LittleEndian>(key.raw())?;
        stream.write_u32::<LittleEndian>(*value)?;
    }
    stream.write_u32::<LittleEndian>(SENTINEL)?;
    Ok(())
}

fn read_render_states(stream: &mut Blob<'_>) -> Result<RenderStateGroups> {
    let mut groups = IndexMap::new();
    loop {
        let pos = stream.position();
        let group = stream.read_u32::<LittleEndian>()?;
        if group == SENTINEL {
            return Ok(groups);
        }
        let states = read_state_pairs(stream)?;
        if groups.insert(group, states).is_some() {
            return Err(Error::malformed(pos, format!("render state group {group} appears twice")));
        }
    }
}

fn write_render_states<W: Write + Seek>(stream: &mut W, groups: &RenderStateGroups) -> Result<()> {
    for (group, states) in groups {
        if *group == SENTINEL {
            return Err(Error::malformed(stream.stream_position()?, "render state group -1 is reserved"));
        }
        stream.write_u32::<LittleEndian>(*group)?;
        write_state_pairs(stream, states)?;
    }
    stream.write_u32::<LittleEndian>(SENTINEL)?;
    Ok(())
}

fn read_texture_slots(stream: &mut Blob<'_>, table: &impl IndexTable) -> Result<Vec<TextureSlot>> {
    let mut slots = Vec::new();
    loop {
        let sampler_index = stream.read_u32::<LittleEndian>()?;
        if sampler_index == SENTINEL {
            return Ok(slots);
        }

        let mut slot = TextureSlot::new(sampler_index, table.get(stream.read_u32::<LittleEndian>()?)?);
        slot.stage_states_mask = stream.read_u32::<LittleEndian>()?;
        if slot.stage_states_mask != 0 {
            slot.stage_states = read_state_pairs(stream)?;
        }
        slot.sampler_states_mask = stream.read_u32::<LittleEndian>()?;
        if slot.sampler_states_mask != 0 {
            slot.sampler_states = read_state_pairs(stream)?;
        }
        slots.push(slot);
    }
}

fn write_texture_slots<W: Write + Seek>(
    stream: &mut W,
    slots: &[TextureSlot],
    table: &impl IndexTable,
) -> Result<()> {
    for slot in slots {
        stream.write_u32::<LittleEndian>(slot.sampler_index)?;
        stream.write_u32::<LittleEndian>(table.index_of(slot.raster)?)?;

        write_masked_states(stream, slot.stage_states_mask, &slot.stage_states, "stage")?;
        write_masked_states(stream, slot.sampler_states_mask, &slot.sampler_states, "sampler")?;
    }
    stream.write_u32::<LittleEndian>(SENTINEL)?;
    Ok(())
}

fn write_masked_states<K: StateKey, W: Write + Seek>(
    stream: &mut W,
    mask: u32,
    states: &IndexMap<K, u32>,
    what: &str,
) -> Result<()> {
    stream.write_u32::<LittleEndian>(mask)?;
    if mask != 0 {
        write_state_pairs(stream, states)?;
    } else if !states.is_empty() {
        return Err(Error::malformed(
            stream.stream_position()?,
            format!("{} {what} states would be dropped by a zero mask", states.len()),
        ));
    }
    Ok(())
}
