//! Integration tests for reading and writing RenderWare containers.

use std::io::Cursor;

use glam::{Vec3, Vec4};
use rw4::material::{MaterialStateCompiler, RenderStateType, TextureSlot};
use rw4::prelude::*;

use tempfile::NamedTempFile;

fn write(renderware: &mut RenderWare) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    renderware.write(&mut cursor).expect("Failed to write");
    cursor.into_inner()
}

fn read(bytes: Vec<u8>) -> RenderWare {
    RenderWare::from_reader(&mut Cursor::new(bytes)).expect("Failed to read")
}

/// A model-like container touching every registered variant.
fn sample_model() -> RenderWare {
    let mut renderware = RenderWare::new(RenderWareKind::Model);

    let pixels = renderware.add(BaseResource::new((0..=255).collect()));
    let raster = renderware.add(Raster {
        texture_format: rw4::texture::fourcc(b"DXT1"),
        width: 16,
        height: 16,
        mipmap_levels: 1,
        texture_data: Some(pixels),
        ..Default::default()
    });

    let mut description = VertexDescription {
        vertex_size: 20,
        elements: vec![
            VertexElement { decl_type: 2, usage: 0, type_code: VertexElement::POSITION, ..Default::default() },
            VertexElement { offset: 12, decl_type: 1, usage: 5, type_code: VertexElement::TEXCOORD0, ..Default::default() },
        ],
        ..Default::default()
    };
    description.update_element_flags();
    renderware.add(description);

    let mut state = MaterialStateCompiler::new();
    state.material_color = Some(Vec4::new(1.0, 0.5, 0.25, 1.0));
    state.render_states.entry(0).or_default().insert(RenderStateType::CULLMODE, 1);
    state.texture_slots.push(TextureSlot::new(0, Some(raster)));
    renderware.add(CompiledState::from_compiler(state));

    renderware.add(SkinMatrixBuffer {
        matrices: vec![[Vec4::X, Vec4::Y, Vec4::Z], [Vec4::ONE, Vec4::ZERO, Vec4::W]],
        fields: [0, 0],
    });
    renderware.add(BBox::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
    renderware.add(TriangleKdTreeProcedural {
        bounding_box: BBox::new(Vec3::ZERO, Vec3::ONE),
        vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        triangles: vec![[0, 1, 2, 0]],
        triangle_flags: vec![3],
        tree_bounding_box: BBox::new(Vec3::ZERO, Vec3::ONE),
        nodes: vec![KdTreeNode { integers: [1, 2, 3, 4, 5, 6], floats: [0.5, 1.5] }],
        ..Default::default()
    });
    renderware
}

#[test]
fn test_roundtrip_all_variants() {
    let mut original = sample_model();
    let bytes = write(&mut original);

    let mut copy = read(bytes.clone());
    assert_eq!(copy.kind(), RenderWareKind::Model);
    assert_eq!(copy.objects().len(), original.objects().len());
    assert!(copy.objects().iter().all(|o| !o.is_unknown()));

    assert_eq!(copy.decompile_states().unwrap(), 1);
    assert_eq!(copy.objects(), original.objects());

    // A second write of the read copy is byte-identical.
    assert_eq!(write(&mut copy), bytes);
}

#[test]
fn test_alignment_invariant() {
    let mut renderware = sample_model();
    let copy = read(write(&mut renderware));

    for (i, section) in copy.section_infos().iter().enumerate() {
        let alignment = section.alignment.max(1) as u64;
        assert_eq!(section.offset % alignment, 0, "section {i} is misaligned");
        assert_eq!(section.alignment, copy.objects()[i].alignment());
    }
}

#[test]
fn test_unknown_type_code_keeps_position() {
    let mut renderware = RenderWare::new(RenderWareKind::Special);
    renderware.add(BBox::new(Vec3::ZERO, Vec3::ONE));
    let mut unknown = UnknownSection::new(0x00FF_0001, 8);
    unknown.data = vec![9, 8, 7, 6, 5];
    renderware.add(unknown.clone());
    renderware.add(BBox::new(Vec3::ONE, Vec3::splat(2.0)));

    let bytes = write(&mut renderware);
    let mut copy = read(bytes.clone());

    assert_eq!(copy.objects().len(), 3);
    assert!(!copy.objects()[0].is_unknown());
    assert!(copy.objects()[1].is_unknown());
    assert_eq!(copy.get_as::<UnknownSection>(ObjectId(1)), Some(&unknown));
    assert_eq!(copy.get_as::<BBox>(ObjectId(2)).unwrap().max, Vec3::splat(2.0));

    assert_eq!(write(&mut copy), bytes);
}

#[test]
fn test_sub_reference_into_own_payload() {
    let mut renderware = RenderWare::new(RenderWareKind::Model);
    renderware.add(BBox::default());
    let a = renderware.add(SkinMatrixBuffer {
        matrices: vec![[Vec4::X, Vec4::Y, Vec4::Z]],
        fields: [0, 0],
    });

    let copy = read(write(&mut renderware));
    let references = copy.sub_references();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].object, a);
    assert_eq!(references[0].offset, 16);

    let value = copy.index_of_in(Some(a), IndexSpace::SubReference).unwrap();
    assert_eq!(value >> 22, 2);
    assert_eq!(copy.get(value).unwrap(), Some(a));
    assert!(matches!(copy.get_object(value).unwrap(), Some(RwObject::SkinMatrixBuffer(_))));
}

#[test]
fn test_write_is_repeatable() {
    let mut renderware = sample_model();
    let first = write(&mut renderware);
    let second = write(&mut renderware);
    assert_eq!(first, second);
    assert_eq!(renderware.sub_references().len(), 1);
}

#[test]
fn test_texture_file_roundtrip() {
    let texture = Texture {
        format: rw4::texture::fourcc(b"DXT5"),
        width: 8,
        height: 8,
        mipmap_levels: 2,
        cube_map: false,
        data: (0..80).collect(),
    };
    let mut renderware = RenderWare::from_texture(texture.clone());

    let temp = NamedTempFile::new().expect("Failed to create temp file");
    renderware.save(temp.path()).expect("Failed to save");

    let mut file = std::fs::File::open(temp.path()).unwrap();
    assert_eq!(RenderWare::peek_kind(&mut file).unwrap(), RenderWareKind::Texture);

    let loaded = RenderWare::open(temp.path()).expect("Failed to open");
    assert_eq!(loaded.to_texture().unwrap(), texture);

    let buffered = RenderWare::open_opts(temp.path(), false).expect("Failed to open");
    assert_eq!(buffered.objects(), loaded.objects());
}

#[test]
fn test_bad_magic() {
    let mut bytes = write(&mut RenderWare::default());
    bytes[1] = b'X';
    let err = RenderWare::from_reader(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::InvalidMagic));
}

#[test]
fn test_truncated_file() {
    let mut bytes = write(&mut sample_model());
    bytes.truncate(bytes.len() - 40);
    let err = RenderWare::from_reader(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::Io(_) | Error::Section { .. }));
}

#[test]
fn test_empty_file_fails_to_open() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    assert!(RenderWare::open(temp.path()).is_err());
}

#[test]
fn test_dangling_reference_names_section() {
    let mut renderware = RenderWare::new(RenderWareKind::Model);
    renderware.add(BBox::default());
    renderware.add(Raster { texture_data: Some(ObjectId(0)), ..Default::default() });

    let mut bytes = write(&mut renderware);
    let raster_at = renderware.section_infos()[1].offset;

    // texture_data is the last word of the raster payload
    let word = raster_at as usize + 28;
    assert_eq!(&bytes[word..word + 4], &0u32.to_le_bytes());
    bytes[word..word + 4].copy_from_slice(&9u32.to_le_bytes());

    let err = RenderWare::from_reader(&mut Cursor::new(bytes)).unwrap_err();
    match err {
        Error::Section { index, offset, source, .. } => {
            assert_eq!(index, 1);
            assert_eq!(offset, raster_at);
            assert!(matches!(*source, Error::InvalidIndex(9)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_short_state_names_section() {
    let mut state = MaterialStateCompiler::new();
    state.material_color = Some(Vec4::ONE);
    let mut data = state.compile(&RenderWare::default()).unwrap();

    // header plus half of the material color
    data.truncate(40);
    data[..4].copy_from_slice(&40u32.to_le_bytes());

    let mut renderware = RenderWare::new(RenderWareKind::Model);
    renderware.add(BBox::default());
    renderware.add(CompiledState { data, compiler: None });

    let mut copy = read(write(&mut renderware));
    let state_at = copy.section_infos()[1].offset;
    assert_ne!(state_at, 0);

    match copy.decompile_states().unwrap_err() {
        Error::Section { index, offset, source, .. } => {
            assert_eq!(index, 1);
            assert_eq!(offset, state_at);
            assert!(matches!(*source, Error::Malformed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}
