use crate::{GpuBackend, GpuError, IndexFormat, ResourceId};

/// One logged call, in the order `RecordingBackend` received it. Named after
/// the opcode it mirrors so a test can assert against the dispatcher's own
/// opcode vocabulary rather than a parallel naming scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum CallRecord {
    CreateShaderModule(ResourceId),
    CreateBuffer(ResourceId, u64, u32),
    CreateTexture(ResourceId, u32, u32, String, u32),
    CreateSampler(ResourceId),
    CreateBindGroupLayout(ResourceId),
    CreatePipelineLayout(ResourceId),
    CreateBindGroup(ResourceId, Option<ResourceId>),
    CreateRenderPipeline(ResourceId, Option<ResourceId>),
    CreateComputePipeline(ResourceId, Option<ResourceId>),
    CreateTextureView(ResourceId, ResourceId),
    CreateImageBitmap(ResourceId),
    CreateRenderBundle(ResourceId),
    BeginRenderPass,
    BeginComputePass,
    SetPipeline(ResourceId),
    SetBindGroup(u32, ResourceId),
    SetVertexBuffer(u32, ResourceId),
    SetIndexBuffer(ResourceId, IndexFormat),
    Draw(u32, u32, u32, u32),
    DrawIndexed(u32, u32, u32, i32, u32),
    Dispatch(u32, u32, u32),
    ExecuteBundles(ResourceId),
    EndPass,
    WriteBuffer(ResourceId, u64, usize),
    CopyBufferToBuffer(ResourceId, u64, ResourceId, u64, u64),
    CopyTextureToTexture(ResourceId, ResourceId),
    CopyExternalImageToTexture(ResourceId, ResourceId),
    Submit,
    WriteTimeUniform(ResourceId, u64, u32),
    InitWasmModule(ResourceId),
    CallWasmFunc(ResourceId, String),
    WriteBufferFromWasm(ResourceId),
    CreateTypedArray(u16, u8, u32),
    FillRandom(u16, u64),
    FillConstant(u16, u64),
    FillExpression(u16, u16),
    WriteBufferFromArray(ResourceId, u16),
}

/// A [`GpuBackend`] that performs no real GPU work, only appending a
/// [`CallRecord`] per method call. Used by dispatcher tests to assert an
/// exact call order without a real graphics device.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<CallRecord>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }
}

impl GpuBackend for RecordingBackend {
    fn create_shader_module(&mut self, id: ResourceId, _wgsl_source: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateShaderModule(id));
        Ok(())
    }

    fn create_buffer(&mut self, id: ResourceId, size: u64, usage: u32) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateBuffer(id, size, usage));
        Ok(())
    }

    fn create_texture(&mut self, id: ResourceId, width: u32, height: u32, format: &str, usage: u32) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateTexture(id, width, height, format.to_string(), usage));
        Ok(())
    }

    fn create_sampler(&mut self, id: ResourceId, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateSampler(id));
        Ok(())
    }

    fn create_bind_group_layout(&mut self, id: ResourceId, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateBindGroupLayout(id));
        Ok(())
    }

    fn create_pipeline_layout(&mut self, id: ResourceId, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreatePipelineLayout(id));
        Ok(())
    }

    fn create_bind_group(&mut self, id: ResourceId, layout: Option<ResourceId>, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateBindGroup(id, layout));
        Ok(())
    }

    fn create_render_pipeline(&mut self, id: ResourceId, layout: Option<ResourceId>, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateRenderPipeline(id, layout));
        Ok(())
    }

    fn create_compute_pipeline(&mut self, id: ResourceId, layout: Option<ResourceId>, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateComputePipeline(id, layout));
        Ok(())
    }

    fn create_texture_view(&mut self, id: ResourceId, texture: ResourceId, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateTextureView(id, texture));
        Ok(())
    }

    fn create_image_bitmap(&mut self, id: ResourceId, _source: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateImageBitmap(id));
        Ok(())
    }

    fn create_render_bundle(&mut self, id: ResourceId, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateRenderBundle(id));
        Ok(())
    }

    fn begin_render_pass(&mut self, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::BeginRenderPass);
        Ok(())
    }

    fn begin_compute_pass(&mut self) -> Result<(), GpuError> {
        self.calls.push(CallRecord::BeginComputePass);
        Ok(())
    }

    fn set_pipeline(&mut self, pipeline: ResourceId) -> Result<(), GpuError> {
        self.calls.push(CallRecord::SetPipeline(pipeline));
        Ok(())
    }

    fn set_bind_group(&mut self, slot: u32, bind_group: ResourceId) -> Result<(), GpuError> {
        self.calls.push(CallRecord::SetBindGroup(slot, bind_group));
        Ok(())
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: ResourceId) -> Result<(), GpuError> {
        self.calls.push(CallRecord::SetVertexBuffer(slot, buffer));
        Ok(())
    }

    fn set_index_buffer(&mut self, buffer: ResourceId, format: IndexFormat) -> Result<(), GpuError> {
        self.calls.push(CallRecord::SetIndexBuffer(buffer, format));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<(), GpuError> {
        self.calls.push(CallRecord::Draw(vertex_count, instance_count, first_vertex, first_instance));
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), GpuError> {
        self.calls
            .push(CallRecord::DrawIndexed(index_count, instance_count, first_index, base_vertex, first_instance));
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), GpuError> {
        self.calls.push(CallRecord::Dispatch(x, y, z));
        Ok(())
    }

    fn execute_bundles(&mut self, bundle: ResourceId) -> Result<(), GpuError> {
        self.calls.push(CallRecord::ExecuteBundles(bundle));
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), GpuError> {
        self.calls.push(CallRecord::EndPass);
        Ok(())
    }

    fn write_buffer(&mut self, buffer: ResourceId, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::WriteBuffer(buffer, offset, data.len()));
        Ok(())
    }

    fn copy_buffer_to_buffer(
        &mut self,
        src: ResourceId,
        src_offset: u64,
        dst: ResourceId,
        dst_offset: u64,
        size: u64,
    ) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CopyBufferToBuffer(src, src_offset, dst, dst_offset, size));
        Ok(())
    }

    fn copy_texture_to_texture(&mut self, src: ResourceId, dst: ResourceId, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CopyTextureToTexture(src, dst));
        Ok(())
    }

    fn copy_external_image_to_texture(&mut self, bitmap: ResourceId, texture: ResourceId, _descriptor: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CopyExternalImageToTexture(bitmap, texture));
        Ok(())
    }

    fn submit(&mut self) -> Result<(), GpuError> {
        self.calls.push(CallRecord::Submit);
        Ok(())
    }

    fn write_time_uniform(&mut self, buffer: ResourceId, offset: u64, size: u32, _time_s: f64) -> Result<(), GpuError> {
        self.calls.push(CallRecord::WriteTimeUniform(buffer, offset, size));
        Ok(())
    }

    fn init_wasm_module(&mut self, module: ResourceId, _code: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::InitWasmModule(module));
        Ok(())
    }

    fn call_wasm_func(&mut self, module: ResourceId, func_name: &str, _args: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CallWasmFunc(module, func_name.to_string()));
        Ok(())
    }

    fn write_buffer_from_wasm(&mut self, buffer: ResourceId, _args: &[u8]) -> Result<(), GpuError> {
        self.calls.push(CallRecord::WriteBufferFromWasm(buffer));
        Ok(())
    }

    fn create_typed_array(&mut self, data_id: u16, element_type: u8, count: u32) -> Result<(), GpuError> {
        self.calls.push(CallRecord::CreateTypedArray(data_id, element_type, count));
        Ok(())
    }

    fn fill_random(&mut self, data_id: u16, seed: u64) -> Result<(), GpuError> {
        self.calls.push(CallRecord::FillRandom(data_id, seed));
        Ok(())
    }

    fn fill_constant(&mut self, data_id: u16, value_bits: u64) -> Result<(), GpuError> {
        self.calls.push(CallRecord::FillConstant(data_id, value_bits));
        Ok(())
    }

    fn fill_expression(&mut self, data_id: u16, expr_data_id: u16) -> Result<(), GpuError> {
        self.calls.push(CallRecord::FillExpression(data_id, expr_data_id));
        Ok(())
    }

    fn write_buffer_from_array(&mut self, buffer: ResourceId, data_id: u16) -> Result<(), GpuError> {
        self.calls.push(CallRecord::WriteBufferFromArray(buffer, data_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut backend = RecordingBackend::new();
        backend.create_buffer(0, 64, 0x09).unwrap();
        backend.begin_render_pass(&[]).unwrap();
        backend.set_pipeline(0).unwrap();
        backend.draw(3, 1, 0, 0).unwrap();
        backend.end_pass().unwrap();
        backend.submit().unwrap();

        assert_eq!(
            backend.calls(),
            &[
                CallRecord::CreateBuffer(0, 64, 0x09),
                CallRecord::BeginRenderPass,
                CallRecord::SetPipeline(0),
                CallRecord::Draw(3, 1, 0, 0),
                CallRecord::EndPass,
                CallRecord::Submit,
            ]
        );
    }
}
