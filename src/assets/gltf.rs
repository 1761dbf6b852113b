//! glTF Model Loading
//!
//! The on-disk model format consumed by the core is glTF 2.0 (`.gltf` with
//! external or embedded buffers, or binary `.glb`). Each mesh primitive in
//! the document becomes one [`Primitive`]: positions, normals and the first
//! texture coordinate set are interleaved into the engine's [`Vertex`]
//! layout, indices become a `u32` index buffer, and the document's material
//! list is carried over as [`Material`] records (index 0 is the default
//! material for unbound primitives).
//!
//! Primitives are read in mesh-local space; scene placement is the host's
//! concern. Only triangle-list primitives are accepted.
//!
//! Failure policy: the document is parsed before any GPU buffer is created,
//! and any error afterwards aborts the whole load. Buffers created for
//! earlier primitives are dropped on the way out, which releases their GPU
//! storage — no partially-constructed model is ever returned.

use std::path::Path;
use std::sync::Arc;

use glam::{Vec3, Vec4};

use crate::backend::GraphicsBackend;
use crate::errors::{Result, VesperError};
use crate::resources::buffer::{Buffer, BufferKind};
use crate::resources::material::Material;
use crate::resources::model::{Model, Primitive};
use crate::resources::vertex::Vertex;

/// Loads and parses the glTF file at `path` into a [`Model`].
pub(crate) fn load_model(backend: &Arc<dyn GraphicsBackend>, path: &Path) -> Result<Model> {
    let load_error = |reason: String| VesperError::LoadError {
        path: path.to_path_buf(),
        reason,
    };

    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).map_err(|e| load_error(e.to_string()))?;
    let buffer_data = gltf::import_buffers(&document, path.parent(), blob)
        .map_err(|e| load_error(e.to_string()))?;

    let materials = extract_materials(&document);

    let mut primitives = Vec::new();
    for mesh in document.meshes() {
        let mesh_label = mesh
            .name()
            .map_or_else(|| format!("Mesh {}", mesh.index()), str::to_string);

        for prim in mesh.primitives() {
            if prim.mode() != gltf::mesh::Mode::Triangles {
                return Err(load_error(format!(
                    "{mesh_label}: unsupported primitive mode {:?}, expected triangle list",
                    prim.mode()
                )));
            }

            let reader = prim.reader(|buffer| {
                buffer_data.get(buffer.index()).map(|data| &*data.0)
            });

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| load_error(format!("{mesh_label}: primitive has no positions")))?
                .collect();
            if positions.is_empty() {
                return Err(load_error(format!("{mesh_label}: primitive is empty")));
            }

            let indices: Option<Vec<u32>> =
                reader.read_indices().map(|iter| iter.into_u32().collect());
            if let Some(indices) = &indices {
                if indices.is_empty() {
                    return Err(load_error(format!(
                        "{mesh_label}: indexed primitive has an empty index stream"
                    )));
                }
                if let Some(&oob) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                    return Err(load_error(format!(
                        "{mesh_label}: index {oob} out of range for {} vertices",
                        positions.len()
                    )));
                }
            }

            let normals: Vec<[f32; 3]> = match reader.read_normals() {
                Some(iter) => iter.collect(),
                None => compute_normals(&positions, indices.as_deref()),
            };
            let uvs: Option<Vec<[f32; 2]>> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().collect());

            let vertices: Vec<Vertex> = positions
                .iter()
                .enumerate()
                .map(|(i, &position)| Vertex {
                    position,
                    normal: normals.get(i).copied().unwrap_or([0.0; 3]),
                    uv: uvs
                        .as_ref()
                        .and_then(|uvs| uvs.get(i))
                        .copied()
                        .unwrap_or([0.0; 2]),
                })
                .collect();

            // Default material sits at table index 0; file materials follow.
            let material = prim.material().index().map_or(0, |i| i + 1);

            let mut vertex_buffer = Buffer::new(
                Arc::clone(backend),
                BufferKind::Vertex,
                vertices.len() as u32,
                Some(&format!("{mesh_label} Vertices")),
            )?;
            vertex_buffer.write_vertices(0, &vertices)?;

            let index_buffer = match indices {
                Some(indices) => {
                    let mut buffer = Buffer::new(
                        Arc::clone(backend),
                        BufferKind::Index,
                        indices.len() as u32,
                        Some(&format!("{mesh_label} Indices")),
                    )?;
                    buffer.write_indices(0, &indices)?;
                    Some(buffer)
                }
                None => None,
            };

            primitives.push(Primitive::new(vertex_buffer, index_buffer, material));
        }
    }

    if primitives.is_empty() {
        return Err(load_error("document contains no renderable geometry".to_string()));
    }

    log::info!(
        "Loaded model {path:?}: {} primitives, {} materials",
        primitives.len(),
        materials.len()
    );
    Ok(Model::new(path.to_path_buf(), primitives, materials))
}

fn extract_materials(document: &gltf::Document) -> Vec<Material> {
    let mut materials = vec![Material::default()];
    materials.extend(document.materials().map(|mat| {
        let pbr = mat.pbr_metallic_roughness();
        Material {
            name: mat.name().map(str::to_string),
            base_color: Vec4::from_array(pbr.base_color_factor()),
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            emissive: Vec3::from_array(mat.emissive_factor()),
            double_sided: mat.double_sided(),
        }
    }));
    materials
}

/// Area-weighted vertex normals for primitives that ship without them.
///
/// Each triangle's cross product (whose length is twice the triangle area)
/// is accumulated into its three corners, then normalized.
fn compute_normals(positions: &[[f32; 3]], indices: Option<&[u32]>) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    let mut accumulate = |i0: usize, i1: usize, i2: usize| {
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            return;
        }
        let v0 = Vec3::from_array(positions[i0]);
        let v1 = Vec3::from_array(positions[i1]);
        let v2 = Vec3::from_array(positions[i2]);
        let face_normal = (v1 - v0).cross(v2 - v0);
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    };

    match indices {
        Some(indices) => {
            for tri in indices.chunks_exact(3) {
                accumulate(tri[0] as usize, tri[1] as usize, tri[2] as usize);
            }
        }
        None => {
            for i in (0..positions.len()).step_by(3) {
                if i + 2 < positions.len() {
                    accumulate(i, i + 1, i + 2);
                }
            }
        }
    }

    normals
        .into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::compute_normals;

    #[test]
    fn flat_triangle_gets_unit_normal() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = compute_normals(&positions, None);
        for n in normals {
            assert!((n[2] - 1.0).abs() < 1e-6, "expected +Z normal, got {n:?}");
        }
    }

    #[test]
    fn indexed_triangle_uses_index_stream() {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let normals = compute_normals(&positions, Some(&[0, 1, 2]));
        for n in normals {
            assert!((n[1] - 1.0).abs() < 1e-6, "expected +Y normal, got {n:?}");
        }
    }
}
