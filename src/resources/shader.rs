//! Shader Resource
//!
//! A [`Shader`] is a linked GPU program built from vertex-stage and
//! fragment-stage WGSL source. Construction is the only fallible point:
//! compile the vertex stage, compile the fragment stage, link — the first
//! failure short-circuits the rest and carries its diagnostic text. A value
//! of this type is always fully linked; there is no partially-built state.
//!
//! Stage compilation runs naga's WGSL front end (parse + validation), the
//! same translator the wgpu backend uses internally, so diagnostics are
//! produced without touching the GPU. Linking is backend program creation.
//!
//! Shaders are immutable once constructed.

use std::fmt;
use std::sync::Arc;

use crate::backend::{GraphicsBackend, ProgramDescriptor, ProgramId};
use crate::errors::{Result, VesperError};

/// The compilation step a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// Program link (module creation + pipeline assembly in the backend).
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex stage"),
            Self::Fragment => write!(f, "fragment stage"),
            Self::Link => write!(f, "link"),
        }
    }
}

impl ShaderStage {
    fn naga_stage(self) -> Option<naga::ShaderStage> {
        match self {
            Self::Vertex => Some(naga::ShaderStage::Vertex),
            Self::Fragment => Some(naga::ShaderStage::Fragment),
            Self::Link => None,
        }
    }
}

/// A compiled and linked GPU shader program.
///
/// Created via the graphics context; the context only ever holds a weak
/// reference to the active shader, so the caller keeps ownership. The
/// backend program is released when the last strong reference drops.
pub struct Shader {
    program: ProgramId,
    backend: Arc<dyn GraphicsBackend>,
    label: String,
}

impl Shader {
    pub(crate) fn compile(
        backend: Arc<dyn GraphicsBackend>,
        vertex_source: &str,
        fragment_source: &str,
        label: Option<&str>,
    ) -> Result<Self> {
        compile_stage(vertex_source, ShaderStage::Vertex)?;
        compile_stage(fragment_source, ShaderStage::Fragment)?;

        let label = label.unwrap_or("Shader").to_string();
        let program = backend.create_program(&ProgramDescriptor {
            vertex_source,
            fragment_source,
            label: Some(&label),
        })?;
        log::debug!("Linked shader program {label:?}");

        Ok(Self {
            program,
            backend,
            label,
        })
    }

    /// Backend handle for draw recording.
    pub(crate) fn program(&self) -> ProgramId {
        self.program
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label)
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        log::debug!("Destroying shader program {:?}", self.label);
        self.backend.destroy_program(self.program);
    }
}

/// Parses and validates one WGSL stage in isolation.
///
/// The stage must contain exactly one entry point of its kind; pipelines
/// select that entry point automatically at link time.
fn compile_stage(source: &str, stage: ShaderStage) -> Result<()> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| VesperError::CompileError {
        stage,
        log: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| VesperError::CompileError {
        stage,
        log: e.into_inner().to_string(),
    })?;

    let wanted = stage.naga_stage().expect("link is not a source stage");
    let entry_points = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == wanted)
        .count();
    match entry_points {
        1 => Ok(()),
        0 => Err(VesperError::CompileError {
            stage,
            log: format!("source defines no {stage} entry point"),
        }),
        n => Err(VesperError::CompileError {
            stage,
            log: format!("source defines {n} {stage} entry points, expected exactly one"),
        }),
    }
}
