use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::{BBox, RwSection};
use crate::rw4::io::{ReadExt, WriteExt};
use crate::rw4::{ReadContext, WriteContext};
use crate::util::{Error, Result};

/// Nibble used to fill the last word of the triangle flag table.
const FLAG_FILL: u32 = 0xF;

/// One node of the kd-tree, kept opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KdTreeNode {
    pub integers: [u32; 6],
    pub floats: [f32; 2],
}

/// Collision mesh with a procedural kd-tree over its triangles.
///
/// ```text
/// bbox | fields | counts | p_triangles p_vertices p_tree p_flags
/// [align 16] vertices (x, y, z, pad)
/// triangles (4 words each)
/// triangle flags (4 bits each, 8 per word)
/// [align 16] tree header | tree bbox | nodes
/// ```
///
/// The four pointers are absolute file offsets and are back-patched once
/// the tables are written.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleKdTreeProcedural {
    pub bounding_box: BBox,
    pub field_20: u32,
    pub field_24: u32,
    pub field_2c: u32,
    pub vertices: Vec<Vec3>,
    /// Three vertex indices and one extra word per triangle.
    pub triangles: Vec<[u32; 4]>,
    /// One 4-bit value per triangle.
    pub triangle_flags: Vec<u8>,
    pub tree_bounding_box: BBox,
    pub nodes: Vec<KdTreeNode>,
}

impl Default for TriangleKdTreeProcedural {
    fn default() -> Self {
        Self {
            bounding_box: BBox::default(),
            field_20: 0x00D5_9208,
            field_24: 8,
            field_2c: 0,
            vertices: Vec::new(),
            triangles: Vec::new(),
            triangle_flags: Vec::new(),
            tree_bounding_box: BBox::default(),
            nodes: Vec::new(),
        }
    }
}

impl RwSection for TriangleKdTreeProcedural {
    const TYPE_CODE: u32 = 0x80003;
    const ALIGNMENT: u32 = 16;

    fn read<R: Read + Seek>(&mut self, stream: &mut R, _ctx: &ReadContext<'_>) -> Result<()> {
        self.bounding_box.read_from(stream)?;
        self.field_20 = stream.read_u32::<LittleEndian>()?;
        self.field_24 = stream.read_u32::<LittleEndian>()?;
        let triangle_count = stream.read_u32::<LittleEndian>()?;
        self.field_2c = stream.read_u32::<LittleEndian>()?;
        let vertex_count = stream.read_u32::<LittleEndian>()?;

        let p_triangles = stream.read_offset()?;
        let p_vertices = stream.read_offset()?;
        let p_tree = stream.read_offset()?;
        let p_flags = stream.read_offset()?;

        stream.seek(SeekFrom::Start(p_vertices))?;
        self.vertices.clear();
        for _ in 0..vertex_count {
            self.vertices.push(Vec3::from_array(stream.read_f32_array()?));
            stream.skip(4)?;
        }

        stream.seek(SeekFrom::Start(p_triangles))?;
        self.triangles.clear();
        for _ in 0..triangle_count {
            self.triangles.push(stream.read_u32_array()?);
        }

        stream.seek(SeekFrom::Start(p_flags))?;
        self.triangle_flags.clear();
        let mut word = 0;
        for i in 0..triangle_count as usize {
            if i % 8 == 0 {
                word = stream.read_u32::<LittleEndian>()?;
            }
            self.triangle_flags.push(((word >> ((i % 8) * 4)) & 0xF) as u8);
        }

        stream.seek(SeekFrom::Start(p_tree))?;
        stream.skip(4)?;
        let node_count = stream.read_u32::<LittleEndian>()?;
        stream.skip(8)?;
        self.tree_bounding_box.read_from(stream)?;

        self.nodes.clear();
        for _ in 0..node_count {
            self.nodes.push(KdTreeNode {
                integers: stream.read_u32_array()?,
                floats: stream.read_f32_array()?,
            });
        }
        Ok(())
    }

    fn write<W: Write + Seek>(&self, stream: &mut W, _ctx: &mut WriteContext<'_>) -> Result<()> {
        if self.triangle_flags.len() != self.triangles.len() {
            return Err(Error::malformed(
                stream.stream_position()?,
                format!(
                    "{} triangle flags for {} triangles",
                    self.triangle_flags.len(),
                    self.triangles.len()
                ),
            ));
        }

        self.bounding_box.write_to(stream)?;
        stream.write_u32::<LittleEndian>(self.field_20)?;
        stream.write_u32::<LittleEndian>(self.field_24)?;
        stream.write_u32::<LittleEndian>(self.triangles.len() as u32)?;
        stream.write_u32::<LittleEndian>(self.field_2c)?;
        stream.write_u32::<LittleEndian>(self.vertices.len() as u32)?;

        let pointers_at = stream.stream_position()?;
        stream.write_padding(4 * 4)?;

        let p_vertices = stream.align_to(16)?;
        for vertex in &self.vertices {
            stream.write_f32_slice(&vertex.to_array())?;
            stream.write_padding(4)?;
        }

        // Vertices and triangles are 16 bytes each, so both stay aligned.
        let p_triangles = stream.stream_position()?;
        for triangle in &self.triangles {
            stream.write_u32_slice(triangle)?;
        }

        let p_flags = stream.stream_position()?;
        for chunk in self.triangle_flags.chunks(8) {
            let mut word = 0u32;
            for i in 0..8 {
                let nibble = chunk.get(i).map_or(FLAG_FILL, |f| u32::from(f & 0xF));
                word |= nibble << (i * 4);
            }
            stream.write_u32::<LittleEndian>(word)?;
        }

        let p_tree = stream.align_to(16)?;
        stream.write_offset(p_vertices.saturating_sub(8 * 4))?;
        stream.write_u32::<LittleEndian>(self.nodes.len() as u32)?;
        stream.write_u32::<LittleEndian>(self.triangles.len() as u32)?;
        stream.write_padding(4)?;
        self.tree_bounding_box.write_to(stream)?;
        for node in &self.nodes {
            stream.write_u32_slice(&node.integers)?;
            stream.write_f32_slice(&node.floats)?;
        }

        let end = stream.stream_position()?;
        stream.seek(SeekFrom::Start(pointers_at))?;
        for pointer in [p_triangles, p_vertices, p_tree, p_flags] {
            stream.write_offset(pointer)?;
        }
        stream.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}
