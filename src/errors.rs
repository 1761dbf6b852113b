//! Error Types
//!
//! This module defines the error types used throughout the graphics core.
//!
//! # Overview
//!
//! The main error type [`VesperError`] covers all failure modes including:
//! - GPU initialization failures
//! - Resource creation and write errors
//! - Shader compilation and linking errors
//! - Model loading and parsing errors
//! - Frame lifecycle protocol violations
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, VesperError>`.
//!
//! ```rust,ignore
//! use vesper::errors::{Result, VesperError};
//!
//! fn upload_geometry() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::resources::shader::ShaderStage;

/// The main error type for the graphics core.
///
/// Each variant provides specific context about what went wrong. None of
/// these conditions is transient: failures are surfaced to the caller of the
/// failing operation and never retried internally.
#[derive(Error, Debug)]
pub enum VesperError {
    // ========================================================================
    // GPU & Backend Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// The backend rejected an operation, typically because a resource handle
    /// no longer refers to a live GPU object.
    #[error("Backend error: {0}")]
    BackendError(String),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// A resource operation received an argument outside its domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A buffer write would extend past the creation-time capacity.
    #[error("Write of {len} elements at offset {offset} exceeds buffer capacity {capacity}")]
    OutOfBounds {
        /// First element the write would touch.
        offset: u32,
        /// Number of elements in the rejected write.
        len: u32,
        /// Element capacity fixed at buffer creation.
        capacity: u32,
    },

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// A shader stage failed to compile, or the program failed to link.
    ///
    /// `log` carries the diagnostic text of the first failing step; later
    /// steps are not attempted.
    #[error("Shader {stage} error:\n{log}")]
    CompileError {
        /// The step that failed.
        stage: ShaderStage,
        /// Diagnostic text from the shader front end or the backend.
        log: String,
    },

    // ========================================================================
    // Model Loading Errors
    // ========================================================================
    /// A model file could not be read or parsed into valid geometry.
    #[error("Failed to load model {path:?}: {reason}")]
    LoadError {
        /// Path the load was asked for.
        path: PathBuf,
        /// What went wrong while reading or parsing.
        reason: String,
    },

    // ========================================================================
    // Frame Lifecycle Errors
    // ========================================================================
    /// A frame operation was issued out of order, e.g. `present` without a
    /// prior `clear`.
    #[error("Frame protocol violation: {0}")]
    ProtocolViolation(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error outside of model loading.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, VesperError>`.
pub type Result<T> = std::result::Result<T, VesperError>;
