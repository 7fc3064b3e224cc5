//! GPU back-end trait for the dispatcher (spec §4.9, §6).
//!
//! The dispatcher is generic over [`GpuBackend`] so it never depends on a
//! concrete graphics API; a real back-end (wgpu, a WebGPU binding, …) lives
//! outside this core and is out of scope here. [`recording::RecordingBackend`]
//! is the test double used to assert dispatcher call order without one.

mod recording;

pub use recording::{CallRecord, RecordingBackend};

use thiserror::Error;

pub type ResourceId = u16;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("resource {kind} id {id} not found")]
    ResourceNotFound { kind: &'static str, id: ResourceId },
    #[error("back-end rejected the operation: {0}")]
    BackendRejected(String),
}

/// Index format for `set_index_buffer` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// Every GPU operation the bytecode stream can drive, expressed as a trait
/// so the dispatcher (spec §4.9) is monomorphized over the back-end rather
/// than calling through a boxed interface on the hot path.
pub trait GpuBackend {
    fn create_shader_module(&mut self, id: ResourceId, wgsl_source: &[u8]) -> Result<(), GpuError>;
    fn create_buffer(&mut self, id: ResourceId, size: u64, usage: u32) -> Result<(), GpuError>;
    fn create_texture(&mut self, id: ResourceId, width: u32, height: u32, format: &str, usage: u32) -> Result<(), GpuError>;
    fn create_sampler(&mut self, id: ResourceId, descriptor: &[u8]) -> Result<(), GpuError>;
    fn create_bind_group_layout(&mut self, id: ResourceId, descriptor: &[u8]) -> Result<(), GpuError>;
    fn create_pipeline_layout(&mut self, id: ResourceId, descriptor: &[u8]) -> Result<(), GpuError>;
    fn create_bind_group(&mut self, id: ResourceId, layout: Option<ResourceId>, descriptor: &[u8]) -> Result<(), GpuError>;
    fn create_render_pipeline(&mut self, id: ResourceId, layout: Option<ResourceId>, descriptor: &[u8]) -> Result<(), GpuError>;
    fn create_compute_pipeline(&mut self, id: ResourceId, layout: Option<ResourceId>, descriptor: &[u8]) -> Result<(), GpuError>;
    fn create_texture_view(&mut self, id: ResourceId, texture: ResourceId, descriptor: &[u8]) -> Result<(), GpuError>;
    fn create_image_bitmap(&mut self, id: ResourceId, source: &[u8]) -> Result<(), GpuError>;
    fn create_render_bundle(&mut self, id: ResourceId, descriptor: &[u8]) -> Result<(), GpuError>;

    fn begin_render_pass(&mut self, descriptor: &[u8]) -> Result<(), GpuError>;
    fn begin_compute_pass(&mut self) -> Result<(), GpuError>;
    fn set_pipeline(&mut self, pipeline: ResourceId) -> Result<(), GpuError>;
    fn set_bind_group(&mut self, slot: u32, bind_group: ResourceId) -> Result<(), GpuError>;
    fn set_vertex_buffer(&mut self, slot: u32, buffer: ResourceId) -> Result<(), GpuError>;
    fn set_index_buffer(&mut self, buffer: ResourceId, format: IndexFormat) -> Result<(), GpuError>;
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<(), GpuError>;
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), GpuError>;
    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), GpuError>;
    fn execute_bundles(&mut self, bundle: ResourceId) -> Result<(), GpuError>;
    fn end_pass(&mut self) -> Result<(), GpuError>;

    fn write_buffer(&mut self, buffer: ResourceId, offset: u64, data: &[u8]) -> Result<(), GpuError>;
    fn copy_buffer_to_buffer(
        &mut self,
        src: ResourceId,
        src_offset: u64,
        dst: ResourceId,
        dst_offset: u64,
        size: u64,
    ) -> Result<(), GpuError>;
    fn copy_texture_to_texture(&mut self, src: ResourceId, dst: ResourceId, descriptor: &[u8]) -> Result<(), GpuError>;
    fn copy_external_image_to_texture(&mut self, bitmap: ResourceId, texture: ResourceId, descriptor: &[u8]) -> Result<(), GpuError>;
    fn submit(&mut self) -> Result<(), GpuError>;

    /// Packs back-end-defined time/canvas fields into `buffer[offset..offset+size]`
    /// (spec §4.8's `write_time_uniform`); the exact field layout is a
    /// back-end concern, not the dispatcher's.
    fn write_time_uniform(&mut self, buffer: ResourceId, offset: u64, size: u32, time_s: f64) -> Result<(), GpuError>;

    // Guest-WASM hosting is an optional capability; back-ends that cannot
    // host guests leave these as no-ops (spec §4.8).
    fn init_wasm_module(&mut self, _module: ResourceId, _code: &[u8]) -> Result<(), GpuError> {
        Ok(())
    }
    fn call_wasm_func(&mut self, _module: ResourceId, _func_name: &str, _args: &[u8]) -> Result<(), GpuError> {
        Ok(())
    }
    fn write_buffer_from_wasm(&mut self, _buffer: ResourceId, _args: &[u8]) -> Result<(), GpuError> {
        Ok(())
    }

    // Data generation may be delegated to the host runtime rather than the
    // GPU itself (spec §6); default to no-ops for back-ends that don't
    // implement procedural data generation.
    fn create_typed_array(&mut self, _data_id: u16, _element_type: u8, _count: u32) -> Result<(), GpuError> {
        Ok(())
    }
    fn fill_random(&mut self, _data_id: u16, _seed: u64) -> Result<(), GpuError> {
        Ok(())
    }
    fn fill_constant(&mut self, _data_id: u16, _value_bits: u64) -> Result<(), GpuError> {
        Ok(())
    }
    fn fill_expression(&mut self, _data_id: u16, _expr_data_id: u16) -> Result<(), GpuError> {
        Ok(())
    }
    fn write_buffer_from_array(&mut self, _buffer: ResourceId, _data_id: u16) -> Result<(), GpuError> {
        Ok(())
    }
}
