//! Buffer Resource Tests
//!
//! Tests for:
//! - Factory validation: positive capacity required
//! - Bounds checking: writes never exceed creation-time capacity
//! - Lifetime: GPU storage released exactly once on drop

mod common;

use glam::{Vec2, Vec3};
use vesper::{BufferKind, Vertex, VesperError};

fn filler_vertices(count: usize) -> Vec<Vertex> {
    (0..count)
        .map(|i| Vertex::new(Vec3::splat(i as f32), Vec3::Z, Vec2::ZERO))
        .collect()
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn new_buffer_with_positive_size_succeeds() {
    let (_backend, graphics) = common::recording_graphics();
    let buffer = graphics.new_buffer(16).unwrap();

    assert_eq!(buffer.capacity(), 16);
    assert_eq!(buffer.kind(), BufferKind::Vertex);
    assert!(buffer.is_empty());
}

#[test]
fn new_buffer_with_zero_size_is_invalid_argument() {
    let (backend, graphics) = common::recording_graphics();
    let result = graphics.new_buffer(0);

    assert!(matches!(result, Err(VesperError::InvalidArgument(_))));
    assert_eq!(backend.buffers_created(), 0, "no GPU storage for a rejected buffer");
}

#[test]
fn buffer_allocation_matches_capacity_and_stride() {
    let (backend, graphics) = common::recording_graphics();
    let _buffer = graphics.new_buffer(8).unwrap();

    let record = backend.buffer_record_at(0).unwrap();
    assert_eq!(record.size, 8 * Vertex::STRIDE);
}

// ============================================================================
// Bounds Checking
// ============================================================================

#[test]
fn write_up_to_capacity_succeeds() {
    let (_backend, graphics) = common::recording_graphics();
    let mut buffer = graphics.new_buffer(4).unwrap();

    buffer.write_vertices(0, &filler_vertices(4)).unwrap();
    assert_eq!(buffer.len(), 4);
}

#[test]
fn write_beyond_capacity_is_out_of_bounds() {
    let (backend, graphics) = common::recording_graphics();
    let mut buffer = graphics.new_buffer(4).unwrap();

    let err = buffer.write_vertices(0, &filler_vertices(5)).unwrap_err();
    assert!(matches!(
        err,
        VesperError::OutOfBounds {
            offset: 0,
            len: 5,
            capacity: 4
        }
    ));

    // Nothing reached the backend and the high-water mark is untouched.
    let record = backend.buffer_record_at(0).unwrap();
    assert!(record.writes.is_empty());
    assert_eq!(buffer.len(), 0);
}

#[test]
fn offset_write_past_end_is_out_of_bounds() {
    let (_backend, graphics) = common::recording_graphics();
    let mut buffer = graphics.new_buffer(4).unwrap();

    let err = buffer.write_vertices(2, &filler_vertices(3)).unwrap_err();
    assert!(matches!(err, VesperError::OutOfBounds { offset: 2, len: 3, capacity: 4 }));
}

#[test]
fn offset_overflow_is_out_of_bounds_not_panic() {
    let (_backend, graphics) = common::recording_graphics();
    let mut buffer = graphics.new_buffer(4).unwrap();

    let err = buffer
        .write_vertices(u32::MAX, &filler_vertices(2))
        .unwrap_err();
    assert!(matches!(err, VesperError::OutOfBounds { .. }));
}

#[test]
fn partial_writes_track_high_water_mark() {
    let (backend, graphics) = common::recording_graphics();
    let mut buffer = graphics.new_buffer(8).unwrap();

    buffer.write_vertices(0, &filler_vertices(2)).unwrap();
    assert_eq!(buffer.len(), 2);
    buffer.write_vertices(4, &filler_vertices(2)).unwrap();
    assert_eq!(buffer.len(), 6);
    buffer.write_vertices(1, &filler_vertices(1)).unwrap();
    assert_eq!(buffer.len(), 6, "rewrite below the mark does not shrink it");

    let record = backend.buffer_record_at(0).unwrap();
    assert_eq!(record.writes.len(), 3);
    // Byte offsets follow the element stride.
    assert_eq!(record.writes[1].0, 4 * Vertex::STRIDE);
}

#[test]
fn index_write_into_vertex_buffer_is_invalid_argument() {
    let (_backend, graphics) = common::recording_graphics();
    let mut buffer = graphics.new_buffer(4).unwrap();

    let err = buffer.write_indices(0, &[0, 1, 2]).unwrap_err();
    assert!(matches!(err, VesperError::InvalidArgument(_)));
}

// ============================================================================
// Lifetime
// ============================================================================

#[test]
fn dropping_a_buffer_releases_its_gpu_storage_once() {
    let (backend, graphics) = common::recording_graphics();

    let buffer = graphics.new_buffer(4).unwrap();
    assert_eq!(backend.buffers_created(), 1);
    assert_eq!(backend.live_buffers(), 1);

    drop(buffer);
    assert_eq!(backend.buffers_destroyed(), 1);
    assert_eq!(backend.live_buffers(), 0);
}

#[test]
fn buffers_outlive_the_context_that_created_them() {
    let (backend, graphics) = common::recording_graphics();
    let mut buffer = graphics.new_buffer(4).unwrap();

    drop(graphics);
    // The buffer still holds the backend alive and stays writable.
    buffer.write_vertices(0, &filler_vertices(1)).unwrap();

    drop(buffer);
    assert_eq!(backend.buffers_destroyed(), 1);
}
