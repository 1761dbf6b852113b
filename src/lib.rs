#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod backend;
pub mod errors;
pub mod graphics;
pub mod resources;

mod assets;

pub use backend::{GraphicsBackend, WgpuBackend};
pub use errors::{Result, VesperError};
pub use graphics::{FramePhase, Graphics, GraphicsSettings};
pub use resources::{Buffer, BufferKind, Material, Model, Primitive, Shader, ShaderStage, Vertex};
