//! Shared test support: a recording backend double.
//!
//! [`RecordingBackend`] implements the backend trait without a GPU. It keeps
//! full create/write/destroy accounting so tests can assert resource-lifetime
//! balance (no leak, no double free) and inspect the recorded frame stream.

// Each test binary uses a different slice of this module.
#![allow(dead_code)]

use parking_lot::Mutex;
use slotmap::SlotMap;
use std::sync::Arc;

use vesper::backend::{
    BufferDescriptor, BufferId, BufferUsage, DrawCall, GraphicsBackend, ProgramDescriptor,
    ProgramId,
};
use vesper::{Graphics, GraphicsSettings, Result, VesperError};

#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub size: u64,
    pub usage: BufferUsage,
    /// `(offset, len)` of every accepted write, in bytes.
    pub writes: Vec<(u64, usize)>,
}

#[derive(Debug, Clone)]
pub struct RecordedDraw {
    pub program: ProgramId,
    pub vertex_buffer: BufferId,
    pub index_buffer: Option<(BufferId, u32)>,
    pub vertex_count: u32,
    pub base_color: [f32; 4],
}

#[derive(Default)]
struct Log {
    buffers: SlotMap<BufferId, BufferRecord>,
    programs: SlotMap<ProgramId, String>,
    /// Every buffer id ever handed out, in creation order.
    buffer_order: Vec<BufferId>,

    buffers_created: u32,
    buffers_destroyed: u32,
    programs_created: u32,
    programs_destroyed: u32,

    frames_begun: u32,
    frames_ended: u32,
    frame_open: bool,
    last_clear_color: Option<[f32; 4]>,
    draws: Vec<RecordedDraw>,
}

/// Backend double that records every command it receives.
#[derive(Default)]
pub struct RecordingBackend {
    log: Mutex<Log>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers_created(&self) -> u32 {
        self.log.lock().buffers_created
    }

    pub fn buffers_destroyed(&self) -> u32 {
        self.log.lock().buffers_destroyed
    }

    pub fn live_buffers(&self) -> usize {
        self.log.lock().buffers.len()
    }

    pub fn programs_created(&self) -> u32 {
        self.log.lock().programs_created
    }

    pub fn programs_destroyed(&self) -> u32 {
        self.log.lock().programs_destroyed
    }

    pub fn frames_begun(&self) -> u32 {
        self.log.lock().frames_begun
    }

    pub fn frames_ended(&self) -> u32 {
        self.log.lock().frames_ended
    }

    pub fn last_clear_color(&self) -> Option<[f32; 4]> {
        self.log.lock().last_clear_color
    }

    pub fn draws(&self) -> Vec<RecordedDraw> {
        self.log.lock().draws.clone()
    }

    pub fn buffer_record(&self, id: BufferId) -> Option<BufferRecord> {
        self.log.lock().buffers.get(id).cloned()
    }

    /// Record of the `index`-th buffer ever created, if it is still live.
    pub fn buffer_record_at(&self, index: usize) -> Option<BufferRecord> {
        let log = self.log.lock();
        let id = *log.buffer_order.get(index)?;
        log.buffers.get(id).cloned()
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId> {
        let mut log = self.log.lock();
        log.buffers_created += 1;
        let id = log.buffers.insert(BufferRecord {
            size: descriptor.size,
            usage: descriptor.usage,
            writes: Vec::new(),
        });
        log.buffer_order.push(id);
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let mut log = self.log.lock();
        let record = log
            .buffers
            .get_mut(id)
            .ok_or_else(|| VesperError::BackendError("write to a destroyed buffer".to_string()))?;
        if offset + data.len() as u64 > record.size {
            return Err(VesperError::BackendError(format!(
                "write of {} bytes at offset {offset} exceeds allocation of {} bytes",
                data.len(),
                record.size
            )));
        }
        record.writes.push((offset, data.len()));
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) {
        let mut log = self.log.lock();
        if log.buffers.remove(id).is_some() {
            log.buffers_destroyed += 1;
        }
    }

    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramId> {
        let mut log = self.log.lock();
        log.programs_created += 1;
        let label = descriptor.label.unwrap_or("Program").to_string();
        Ok(log.programs.insert(label))
    }

    fn destroy_program(&self, id: ProgramId) {
        let mut log = self.log.lock();
        if log.programs.remove(id).is_some() {
            log.programs_destroyed += 1;
        }
    }

    fn begin_frame(&self, clear_color: [f32; 4]) {
        let mut log = self.log.lock();
        log.frames_begun += 1;
        log.frame_open = true;
        log.last_clear_color = Some(clear_color);
    }

    fn draw(&self, call: &DrawCall) -> Result<()> {
        let mut log = self.log.lock();
        if !log.frame_open {
            return Err(VesperError::ProtocolViolation(
                "draw recorded with no open frame".to_string(),
            ));
        }
        let draw = RecordedDraw {
            program: call.program,
            vertex_buffer: call.vertex_buffer,
            index_buffer: call.index_buffer,
            vertex_count: call.vertex_count,
            base_color: call.uniforms.base_color.to_array(),
        };
        log.draws.push(draw);
        Ok(())
    }

    fn end_frame(&self) -> Result<()> {
        let mut log = self.log.lock();
        if !log.frame_open {
            return Err(VesperError::ProtocolViolation(
                "frame submitted with no open frame".to_string(),
            ));
        }
        log.frame_open = false;
        log.frames_ended += 1;
        Ok(())
    }
}

/// A graphics context over a fresh recording backend.
pub fn recording_graphics() -> (Arc<RecordingBackend>, Graphics) {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = Arc::new(RecordingBackend::new());
    let graphics = Graphics::with_backend(backend.clone(), &GraphicsSettings::default());
    (backend, graphics)
}

/// A well-formed single-triangle glTF document with an embedded buffer:
/// three positions, three `u32` indices, and one red material.
pub const TRIANGLE_GLTF: &str = r#"{
    "asset": {"version": "2.0"},
    "buffers": [{
        "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAEAAAACAAAA",
        "byteLength": 48
    }],
    "bufferViews": [
        {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
        {"buffer": 0, "byteOffset": 36, "byteLength": 12, "target": 34963}
    ],
    "accessors": [
        {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
         "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
        {"bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR"}
    ],
    "materials": [{
        "name": "Red",
        "pbrMetallicRoughness": {
            "baseColorFactor": [1.0, 0.0, 0.0, 1.0],
            "metallicFactor": 0.0,
            "roughnessFactor": 0.5
        }
    }],
    "meshes": [{
        "name": "Triangle",
        "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]
    }],
    "nodes": [{"mesh": 0}],
    "scenes": [{"nodes": [0]}],
    "scene": 0
}"#;

/// Writes `contents` to a unique temporary file and returns its path.
pub fn write_temp_gltf(contents: &str) -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(0);

    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "vesper_test_{}_{n}.gltf",
        std::process::id()
    ));
    std::fs::write(&path, contents).expect("failed to write test fixture");
    path
}

/// Loads the triangle fixture through the context's model factory.
pub fn triangle_model(graphics: &Graphics) -> vesper::Model {
    let path = write_temp_gltf(TRIANGLE_GLTF);
    let model = graphics.new_model(&path).expect("triangle fixture should load");
    let _ = std::fs::remove_file(&path);
    model
}
