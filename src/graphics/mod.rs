//! Graphics Context
//!
//! [`Graphics`] is the coordination layer of the engine: it owns the global
//! render state (clear color, active shader), drives the per-frame
//! clear → draw → present cycle, and is the factory for every GPU-backed
//! resource ([`Buffer`], [`Shader`], [`Model`]).
//!
//! There is exactly one context per backend, created once at startup and
//! torn down by dropping it. All operations run on the single thread that
//! owns the rendering backend.
//!
//! # Frame lifecycle
//!
//! ```text
//! Idle ──clear()──► Cleared ──draw()──► Drawing ──present()──► Presented
//!                      ▲                                           │
//!                      └────────────────── clear() ────────────────┘
//! ```
//!
//! `present` without a prior `clear`, or `draw` outside a frame, is a
//! protocol violation and is rejected. After `present` the frame target's
//! contents are undefined until the next `clear`.
//!
//! # Example
//!
//! ```rust,ignore
//! use vesper::{Graphics, GraphicsSettings};
//!
//! let mut gfx = Graphics::new(GraphicsSettings::default())?;
//! let shader = gfx.new_shader(VERTEX_WGSL, FRAGMENT_WGSL)?;
//! let model = gfx.new_model("assets/helmet.glb")?;
//!
//! gfx.set_shader(Some(&shader));
//! loop {
//!     gfx.clear();
//!     gfx.draw(&model, glam::Mat4::IDENTITY)?;
//!     gfx.present()?;
//! }
//! ```

pub mod settings;

pub use settings::GraphicsSettings;

use std::path::Path;
use std::sync::{Arc, Weak};

use glam::{Mat4, Vec4};

use crate::assets;
use crate::backend::{DrawCall, DrawUniforms, GraphicsBackend, WgpuBackend};
use crate::errors::{Result, VesperError};
use crate::resources::buffer::{Buffer, BufferKind};
use crate::resources::model::Model;
use crate::resources::shader::Shader;

/// Where the context is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// No frame has been started yet.
    Idle,
    /// `clear` ran; the frame is open and accepts draws.
    Cleared,
    /// At least one draw was recorded into the open frame.
    Drawing,
    /// `present` ran; the frame is closed. `clear` opens the next one.
    Presented,
}

/// Process-wide render state and resource factory.
pub struct Graphics {
    backend: Arc<dyn GraphicsBackend>,
    clear_color: Vec4,
    /// Non-owning reference: the caller keeps ownership of the active
    /// shader and must not drop it while draws still use it.
    active_shader: Option<Weak<Shader>>,
    phase: FramePhase,
    frames_presented: u64,
}

impl Graphics {
    /// Creates a context over a headless [`WgpuBackend`].
    ///
    /// Fails when no compatible adapter is available or device creation is
    /// rejected.
    pub fn new(settings: GraphicsSettings) -> Result<Self> {
        let backend: Arc<dyn GraphicsBackend> = Arc::new(WgpuBackend::new(&settings)?);
        Ok(Self::with_backend(backend, &settings))
    }

    /// Creates a context over a caller-supplied backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn GraphicsBackend>, settings: &GraphicsSettings) -> Self {
        Self {
            backend,
            clear_color: settings.clear_color,
            active_shader: None,
            phase: FramePhase::Idle,
            frames_presented: 0,
        }
    }

    // ========================================================================
    // Render State
    // ========================================================================

    /// The stored clear color, exactly as last set.
    #[inline]
    #[must_use]
    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    /// Stores a new clear color for subsequent frames.
    ///
    /// Channels are conceptually normalized to `[0, 1]` but are not clamped;
    /// out-of-range values are forwarded to the backend as given.
    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    /// The active shader, if one is bound and still alive.
    #[must_use]
    pub fn shader(&self) -> Option<Arc<Shader>> {
        self.active_shader.as_ref().and_then(Weak::upgrade)
    }

    /// Binds (or with `None`, unbinds) the active shader.
    ///
    /// The context holds only a weak reference: binding never extends the
    /// shader's lifetime, and replacing the binding never deallocates the
    /// previous shader.
    pub fn set_shader(&mut self, shader: Option<&Arc<Shader>>) {
        self.active_shader = shader.map(Arc::downgrade);
    }

    /// Current position in the frame lifecycle.
    #[inline]
    #[must_use]
    pub fn frame_phase(&self) -> FramePhase {
        self.phase
    }

    /// Number of frames presented since creation.
    #[inline]
    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    // ========================================================================
    // Frame Lifecycle
    // ========================================================================

    /// Opens a frame, clearing color and depth to the stored clear color.
    ///
    /// Legal from any phase. Clearing while a frame is already open discards
    /// that frame's recorded draws.
    pub fn clear(&mut self) {
        if matches!(self.phase, FramePhase::Cleared | FramePhase::Drawing) {
            log::warn!("clear() discarded an unpresented frame");
        }
        self.backend.begin_frame(self.clear_color.to_array());
        self.phase = FramePhase::Cleared;
    }

    /// Draws a model with the given object-to-clip transform, bound to the
    /// active shader and each primitive's material.
    ///
    /// Fails with `ProtocolViolation` when no frame is open or no live
    /// shader is bound.
    pub fn draw(&mut self, model: &Model, transform: Mat4) -> Result<()> {
        if !matches!(self.phase, FramePhase::Cleared | FramePhase::Drawing) {
            return Err(VesperError::ProtocolViolation(
                "draw issued outside a frame; call clear() first".to_string(),
            ));
        }
        let shader = self.shader().ok_or_else(|| {
            VesperError::ProtocolViolation("draw issued with no active shader bound".to_string())
        })?;

        for primitive in model.primitives() {
            let material = model.material_for(primitive);
            self.backend.draw(&DrawCall {
                program: shader.program(),
                vertex_buffer: primitive.vertex_buffer().id(),
                index_buffer: primitive
                    .index_buffer()
                    .map(|indices| (indices.id(), indices.len())),
                vertex_count: primitive.vertex_buffer().len(),
                uniforms: DrawUniforms {
                    transform,
                    base_color: material.base_color,
                    emissive: material.emissive.extend(0.0),
                },
            })?;
        }

        self.phase = FramePhase::Drawing;
        Ok(())
    }

    /// Closes the frame and submits it to the output path.
    ///
    /// Fails with `ProtocolViolation` unless a `clear` opened the frame
    /// first; in particular, two `present` calls without an intervening
    /// `clear` are rejected.
    pub fn present(&mut self) -> Result<()> {
        match self.phase {
            FramePhase::Cleared | FramePhase::Drawing => {
                self.backend.end_frame()?;
                self.phase = FramePhase::Presented;
                self.frames_presented += 1;
                Ok(())
            }
            FramePhase::Idle => Err(VesperError::ProtocolViolation(
                "present without a prior clear".to_string(),
            )),
            FramePhase::Presented => Err(VesperError::ProtocolViolation(
                "present called twice without an intervening clear".to_string(),
            )),
        }
    }

    // ========================================================================
    // Resource Factories
    // ========================================================================

    /// Allocates a vertex buffer with capacity for `size` vertices.
    ///
    /// Fails with `InvalidArgument` when `size` is zero.
    pub fn new_buffer(&self, size: u32) -> Result<Buffer> {
        Buffer::new(
            Arc::clone(&self.backend),
            BufferKind::Vertex,
            size,
            Some("Vertex Buffer"),
        )
    }

    /// Compiles and links a shader from vertex and fragment WGSL source.
    ///
    /// Returns a shared handle: the caller owns the shader; binding it as
    /// the active shader does not transfer ownership to the context.
    pub fn new_shader(&self, vertex_source: &str, fragment_source: &str) -> Result<Arc<Shader>> {
        Shader::compile(
            Arc::clone(&self.backend),
            vertex_source,
            fragment_source,
            None,
        )
        .map(Arc::new)
    }

    /// Loads and parses the model file at `path`.
    ///
    /// Blocking synchronous I/O on the calling thread. Fails with
    /// `LoadError` when the file is unreadable or yields no valid geometry.
    pub fn new_model(&self, path: impl AsRef<Path>) -> Result<Model> {
        assets::gltf::load_model(&self.backend, path.as_ref())
    }
}

impl Drop for Graphics {
    fn drop(&mut self) {
        log::debug!(
            "Graphics context torn down after {} frames",
            self.frames_presented
        );
    }
}
