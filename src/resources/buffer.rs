//! GPU Buffer Resource
//!
//! [`Buffer`] is a fixed-capacity block of vertex or index data with GPU
//! storage behind it. Capacity is set at creation and never changes; writes
//! are bounds-checked against it. The GPU allocation is released exactly
//! once, when the buffer is dropped.

use std::sync::Arc;

use crate::backend::{BufferId, BufferUsage, GraphicsBackend};
use crate::errors::{Result, VesperError};
use crate::resources::vertex::Vertex;

/// What a buffer holds, which also fixes its element stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Interleaved [`Vertex`] elements.
    Vertex,
    /// `u32` indices.
    Index,
}

impl BufferKind {
    /// Byte stride of one element of this kind.
    #[must_use]
    pub fn stride(self) -> u64 {
        match self {
            Self::Vertex => Vertex::STRIDE,
            Self::Index => std::mem::size_of::<u32>() as u64,
        }
    }

    fn usage(self) -> BufferUsage {
        match self {
            Self::Vertex => BufferUsage::Vertex,
            Self::Index => BufferUsage::Index,
        }
    }
}

/// Fixed-capacity vertex or index data container.
///
/// Created through the graphics context's factory operations. The backend
/// allocation matches `capacity * kind.stride()` bytes and is freed on drop.
pub struct Buffer {
    id: BufferId,
    backend: Arc<dyn GraphicsBackend>,
    kind: BufferKind,
    capacity: u32,
    /// High-water mark of written elements.
    len: u32,
    label: String,
}

impl Buffer {
    pub(crate) fn new(
        backend: Arc<dyn GraphicsBackend>,
        kind: BufferKind,
        capacity: u32,
        label: Option<&str>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(VesperError::InvalidArgument(
                "buffer capacity must be positive".to_string(),
            ));
        }

        let label = label.unwrap_or("Buffer").to_string();
        let id = backend.create_buffer(&crate::backend::BufferDescriptor {
            size: u64::from(capacity) * kind.stride(),
            usage: kind.usage(),
            label: Some(&label),
        })?;
        log::debug!("Created {kind:?} buffer {label:?} ({capacity} elements)");

        Ok(Self {
            id,
            backend,
            kind,
            capacity,
            len: 0,
            label,
        })
    }

    /// Backend handle for draw recording.
    pub(crate) fn id(&self) -> BufferId {
        self.id
    }

    /// Element capacity fixed at creation.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Highest element index written so far (exclusive).
    #[inline]
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Writes vertices starting at element `offset`.
    ///
    /// Fails with `OutOfBounds` when `offset + vertices.len()` exceeds the
    /// capacity (nothing is written), and with `InvalidArgument` on an index
    /// buffer.
    pub fn write_vertices(&mut self, offset: u32, vertices: &[Vertex]) -> Result<()> {
        if self.kind != BufferKind::Vertex {
            return Err(VesperError::InvalidArgument(
                "vertex write into an index buffer".to_string(),
            ));
        }
        self.write_elements(offset, vertices.len() as u32, bytemuck::cast_slice(vertices))
    }

    /// Writes `u32` indices starting at element `offset`.
    ///
    /// Same bounds contract as [`write_vertices`](Self::write_vertices).
    pub fn write_indices(&mut self, offset: u32, indices: &[u32]) -> Result<()> {
        if self.kind != BufferKind::Index {
            return Err(VesperError::InvalidArgument(
                "index write into a vertex buffer".to_string(),
            ));
        }
        self.write_elements(offset, indices.len() as u32, bytemuck::cast_slice(indices))
    }

    fn write_elements(&mut self, offset: u32, len: u32, bytes: &[u8]) -> Result<()> {
        let end = offset.checked_add(len).ok_or(VesperError::OutOfBounds {
            offset,
            len,
            capacity: self.capacity,
        })?;
        if end > self.capacity {
            return Err(VesperError::OutOfBounds {
                offset,
                len,
                capacity: self.capacity,
            });
        }

        self.backend
            .write_buffer(self.id, u64::from(offset) * self.kind.stride(), bytes)?;
        self.len = self.len.max(end);
        Ok(())
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        log::debug!("Destroying buffer {:?}", self.label);
        self.backend.destroy_buffer(self.id);
    }
}
