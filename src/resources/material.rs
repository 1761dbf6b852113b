//! Material Parameters
//!
//! The material data extracted from a model file: the metallic-roughness
//! parameter set plus the flags the core binds during draws. Texture maps
//! are out of scope for the core; factors are enough to shade untextured
//! geometry and to round-trip what the file declares.

use glam::{Vec3, Vec4};

/// Metallic-roughness material record.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    /// RGBA base color factor.
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Vec3,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color: Vec4::ONE,
            metallic: 1.0,
            roughness: 1.0,
            emissive: Vec3::ZERO,
            double_sided: false,
        }
    }
}

impl Material {
    #[must_use]
    pub fn with_base_color(base_color: Vec4) -> Self {
        Self {
            base_color,
            ..Default::default()
        }
    }
}
