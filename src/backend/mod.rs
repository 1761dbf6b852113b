//! Graphics Backend Abstraction
//!
//! The core never talks to a GPU API directly. Everything it needs — buffer
//! storage, linked shader programs, and the per-frame clear/draw/submit
//! sequence — goes through the [`GraphicsBackend`] trait. The shipped
//! implementation is [`WgpuBackend`]; tests substitute a recording double.
//!
//! Backend resources are addressed by slotmap keys ([`BufferId`],
//! [`ProgramId`]). A key handed back after `destroy_*` never aliases a live
//! resource, so stale handles fail loudly instead of touching freed storage.

pub mod wgpu_backend;

pub use wgpu_backend::WgpuBackend;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use slotmap::new_key_type;

use crate::errors::Result;

new_key_type! {
    /// Handle to a backend-owned GPU buffer.
    pub struct BufferId;
    /// Handle to a backend-owned linked shader program.
    pub struct ProgramId;
}

/// How a buffer will be bound during draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Bound as a vertex attribute source.
    Vertex,
    /// Bound as an index source (`u32` indices).
    Index,
}

/// Creation parameters for a GPU buffer.
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    /// Total size in bytes; fixed for the lifetime of the buffer.
    pub size: u64,
    pub usage: BufferUsage,
    pub label: Option<&'a str>,
}

/// Creation parameters for a linked shader program.
///
/// Both sources are WGSL text. The front end has already validated each
/// stage in isolation by the time a descriptor reaches the backend; the
/// backend performs the link (module + pipeline creation).
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub label: Option<&'a str>,
}

/// Per-draw uniform block, uploaded at a dynamic offset for each recorded
/// draw. Layout matches the WGSL-side `DrawUniforms` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DrawUniforms {
    /// Object-to-clip transform applied in the vertex stage.
    pub transform: Mat4,
    /// Material base color factor.
    pub base_color: Vec4,
    /// Material emissive factor (w unused).
    pub emissive: Vec4,
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            base_color: Vec4::ONE,
            emissive: Vec4::ZERO,
        }
    }
}

/// One draw recorded into the open frame.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall {
    pub program: ProgramId,
    pub vertex_buffer: BufferId,
    /// Index buffer plus index count; `None` draws `vertex_count` unindexed
    /// vertices.
    pub index_buffer: Option<(BufferId, u32)>,
    pub vertex_count: u32,
    pub uniforms: DrawUniforms,
}

/// The opaque GPU backend the core issues commands to.
///
/// All methods take `&self`: implementations guard their resource tables
/// internally so that resource objects holding an `Arc<dyn GraphicsBackend>`
/// can release handles from `Drop`. The frame methods are still only ever
/// driven from the single rendering thread that owns the context.
pub trait GraphicsBackend: Send + Sync + 'static {
    /// Allocates GPU storage of the descriptor's exact size.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId>;

    /// Uploads `data` into the buffer starting at `offset` bytes.
    ///
    /// Callers are responsible for range validation; a write past the
    /// allocation or to a destroyed buffer fails with a backend error.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    /// Releases the buffer's GPU storage. Destroying an already-destroyed
    /// id is a no-op (the key no longer resolves).
    fn destroy_buffer(&self, id: BufferId);

    /// Creates shader modules for both stages and links them into a render
    /// pipeline. Fails with `CompileError` carrying backend diagnostics.
    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramId>;

    /// Releases the linked program.
    fn destroy_program(&self, id: ProgramId);

    /// Opens a frame: clears color (and depth) to `clear_color` and resets
    /// the recorded draw list. Reopening an already-open frame discards its
    /// recorded draws.
    fn begin_frame(&self, clear_color: [f32; 4]);

    /// Records one draw into the open frame.
    ///
    /// Fails with `ProtocolViolation` when no frame is open and with a
    /// backend error when a handle in the call is stale.
    fn draw(&self, call: &DrawCall) -> Result<()>;

    /// Closes the open frame, encodes the recorded draws and submits them.
    ///
    /// After this returns the frame's target contents are final and the
    /// backend has no open frame. Fails when no frame is open.
    fn end_frame(&self) -> Result<()>;
}
