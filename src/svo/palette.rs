//! Material palette lookup.

use bytemuck::{Pod, Zeroable};

/// One material palette entry: `(albedo, roughness, metalness, emissive)`.
#[derive(Copy, Clone, Debug, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct Material {
    pub albedo: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: [f32; 3],
}

impl Material {
    pub const fn new(albedo: [f32; 3], roughness: f32, metalness: f32, emissive: [f32; 3]) -> Self {
        Self {
            albedo,
            roughness,
            metalness,
            emissive,
        }
    }
}

/// A flat, index-addressed material palette. Host-side construction of
/// the palette's contents is out of scope; this type exposes lookup
/// only, matching the read-only-during-a-frame invariant upstream nodes
/// rely on.
#[derive(Clone, Debug, Default)]
pub struct MaterialPalette {
    materials: Vec<Material>,
}

impl MaterialPalette {
    pub fn new(materials: Vec<Material>) -> Self {
        Self { materials }
    }

    pub fn get(&self, material_id: u32) -> Option<&Material> {
        self.materials.get(material_id as usize)
    }

    pub fn as_slice(&self) -> &[Material] {
        &self.materials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_same_fields_that_went_in() {
        let mat = Material::new([1.0, 0.0, 0.0], 0.5, 0.1, [0.0; 3]);
        let palette = MaterialPalette::new(vec![mat]);
        assert_eq!(palette.get(0), Some(&mat));
        assert_eq!(palette.get(1), None);
    }
}
