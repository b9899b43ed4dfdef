//! Texture bridge.
//!
//! A TEXTURE-kind container holds one [`Raster`] and the [`BaseResource`]
//! with its pixels. [`Texture`] is the flat tuple exchanged with an external
//! DDS codec; decoding pixels is not done here.

use crate::objects::{BaseResource, Raster};
use crate::rw4::{ObjectId, RenderWare, RenderWareKind};
use crate::util::{Error, Result};

/// `D3DFMT_R8G8B8`.
pub const D3DFMT_R8G8B8: u32 = 20;
/// `D3DFMT_A8R8G8B8`.
pub const D3DFMT_A8R8G8B8: u32 = 21;
/// `D3DFMT_A8`.
pub const D3DFMT_A8: u32 = 28;

/// Build a FourCC format code such as `DXT5`.
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

/// Raster metadata together with its pixel buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Texture {
    /// Direct3D format code or FourCC.
    pub format: u32,
    pub width: u16,
    pub height: u16,
    pub mipmap_levels: u8,
    pub cube_map: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub data: Vec<u8>,
}

impl Texture {
    /// Format as text: the Direct3D name, a printable FourCC, or the number.
    pub fn format_name(&self) -> String {
        match self.format {
            D3DFMT_R8G8B8 => "R8G8B8".to_string(),
            D3DFMT_A8R8G8B8 => "A8R8G8B8".to_string(),
            D3DFMT_A8 => "A8".to_string(),
            format => {
                let bytes = format.to_le_bytes();
                if bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
                    String::from_utf8_lossy(&bytes).into_owned()
                } else {
                    format.to_string()
                }
            }
        }
    }
}

impl RenderWare {
    /// Extract the single texture of a TEXTURE-kind container.
    pub fn to_texture(&self) -> Result<Texture> {
        if !self.is_texture() {
            return Err(Error::NotTexture(format!("container kind is {}", self.kind())));
        }

        let mut rasters = self.objects_of::<Raster>();
        let (id, raster) = rasters
            .next()
            .ok_or_else(|| Error::NotTexture("no raster".to_string()))?;
        if rasters.next().is_some() {
            return Err(Error::NotTexture("more than one raster".to_string()));
        }

        let data = raster
            .texture_data
            .and_then(|data| self.get_as::<BaseResource>(data))
            .ok_or_else(|| {
                Error::NotTexture(format!("raster {} has no pixel buffer", id.index()))
            })?;

        Ok(Texture {
            format: raster.texture_format,
            width: raster.width,
            height: raster.height,
            mipmap_levels: raster.mipmap_levels,
            cube_map: raster.is_cube_map(),
            data: data.data.clone(),
        })
    }

    /// Build a TEXTURE-kind container from a texture.
    pub fn from_texture(texture: Texture) -> Self {
        let mut renderware = RenderWare::new(RenderWareKind::Texture);
        let mut raster = Raster {
            texture_format: texture.format,
            width: texture.width,
            height: texture.height,
            mipmap_levels: texture.mipmap_levels,
            ..Default::default()
        };
        if texture.cube_map {
            raster.texture_flags |= Raster::FLAG_CUBE_TEXTURE;
        }

        let data: ObjectId = renderware.add(BaseResource::new(texture.data));
        raster.texture_data = Some(data);
        renderware.add(raster);
        renderware
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::BBox;

    fn sample() -> Texture {
        Texture {
            format: fourcc(b"DXT5"),
            width: 64,
            height: 32,
            mipmap_levels: 7,
            cube_map: true,
            data: vec![0xAB; 96],
        }
    }

    #[test]
    fn test_from_texture_layout() {
        let renderware = RenderWare::from_texture(sample());
        assert!(renderware.is_texture());
        assert_eq!(renderware.objects().len(), 2);
        assert!(renderware.objects()[0].is_base_resource());

        let raster = renderware.get_as::<Raster>(ObjectId(1)).unwrap();
        assert_eq!(raster.texture_data, Some(ObjectId(0)));
        assert_eq!(raster.texture_flags, 8 | Raster::FLAG_CUBE_TEXTURE);
        assert_eq!(raster.field_10, 8);
    }

    #[test]
    fn test_to_texture() {
        let texture = sample();
        let renderware = RenderWare::from_texture(texture.clone());
        let back = renderware.to_texture().unwrap();
        assert_eq!(back, texture);
        assert_eq!(back.fourcc_name().as_deref(), Some("DXT5"));
    }

    #[test]
    fn test_to_texture_preconditions() {
        let mut model = RenderWare::from_texture(sample());
        model.set_kind(RenderWareKind::Model);
        assert!(matches!(model.to_texture(), Err(Error::NotTexture(_))));

        let empty = RenderWare::new(RenderWareKind::Texture);
        assert!(matches!(empty.to_texture(), Err(Error::NotTexture(_))));

        let mut missing = RenderWare::new(RenderWareKind::Texture);
        missing.add(BBox::default());
        missing.add(Raster::default());
        assert!(matches!(missing.to_texture(), Err(Error::NotTexture(_))));

        let mut two = RenderWare::from_texture(sample());
        two.add(Raster::default());
        assert!(matches!(two.to_texture(), Err(Error::NotTexture(_))));
    }

    #[test]
    fn test_format_names() {
        let name = |format| Texture { format, ..Default::default() }.format_name();
        assert_eq!(name(D3DFMT_R8G8B8), "R8G8B8");
        assert_eq!(name(D3DFMT_A8R8G8B8), "A8R8G8B8");
        assert_eq!(name(D3DFMT_A8), "A8");
        assert_eq!(name(fourcc(b"DXT5")), "DXT5");
        assert_eq!(name(0x31), "49");
    }
}
