//! Model Resource
//!
//! A [`Model`] is the renderable form of a parsed model file: a list of
//! primitives (each owning its vertex buffer and optional index buffer) and
//! the material table they reference. Models own their buffers — dropping a
//! model returns every GPU allocation it created.
//!
//! Invariant: a constructed model always has at least one primitive, and
//! every primitive's vertex buffer is non-empty. Loads that cannot satisfy
//! this fail instead of producing a partial model.

use std::path::{Path, PathBuf};

use crate::resources::buffer::Buffer;
use crate::resources::material::Material;

/// One triangle-list primitive: a vertex buffer, an optional index buffer,
/// and an index into the model's material table.
#[derive(Debug)]
pub struct Primitive {
    pub(crate) vertex_buffer: Buffer,
    pub(crate) index_buffer: Option<Buffer>,
    pub(crate) material: usize,
}

impl Primitive {
    pub(crate) fn new(
        vertex_buffer: Buffer,
        index_buffer: Option<Buffer>,
        material: usize,
    ) -> Self {
        Self {
            vertex_buffer,
            index_buffer,
            material,
        }
    }

    #[must_use]
    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    #[must_use]
    pub fn index_buffer(&self) -> Option<&Buffer> {
        self.index_buffer.as_ref()
    }

    /// Index into [`Model::materials`].
    #[must_use]
    pub fn material_index(&self) -> usize {
        self.material
    }

    /// Number of vertices (or indices, when indexed) this primitive draws.
    #[must_use]
    pub fn element_count(&self) -> u32 {
        match &self.index_buffer {
            Some(indices) => indices.len(),
            None => self.vertex_buffer.len(),
        }
    }
}

/// Parsed geometry plus material data, loaded from a model file.
#[derive(Debug)]
pub struct Model {
    path: PathBuf,
    primitives: Vec<Primitive>,
    materials: Vec<Material>,
}

impl Model {
    pub(crate) fn new(path: PathBuf, primitives: Vec<Primitive>, materials: Vec<Material>) -> Self {
        debug_assert!(!primitives.is_empty(), "models always carry geometry");
        Self {
            path,
            primitives,
            materials,
        }
    }

    /// The path the model was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Material table referenced by the primitives. Always non-empty: a
    /// default material backs primitives with no binding in the file.
    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Material for a primitive, falling back to the default entry when the
    /// recorded index is somehow stale.
    #[must_use]
    pub fn material_for(&self, primitive: &Primitive) -> &Material {
        self.materials
            .get(primitive.material)
            .unwrap_or(&self.materials[0])
    }

    /// Total vertex count across all primitives.
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.primitives
            .iter()
            .map(|p| p.vertex_buffer.len())
            .sum()
    }
}
