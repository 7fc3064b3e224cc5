/// The fixed opcode set (spec §4.5). Each opcode is followed by a fixed
/// number of unsigned LEB128 varint parameters, in the order documented on
/// each variant; there is no back-patching, so every forward reference is
/// resolved by ordering (definitions before uses) or by table index (frame
/// names, pass ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,

    // Resource creation. Params are ids / interned string-or-data ids.
    CreateShaderModule = 1,       // (shader_id, source_data_id)
    CreateBuffer = 2,             // (buffer_id, size, usage)
    CreateTexture = 3,            // (texture_id, width, height, format, usage)
    CreateSampler = 4,            // (sampler_id, descriptor_data_id)
    CreateBindGroupLayout = 5,    // (layout_id, descriptor_data_id)
    CreatePipelineLayout = 6,     // (layout_id, descriptor_data_id)
    CreateBindGroup = 7,          // (bind_group_id, layout_id, descriptor_data_id)
    CreateRenderPipeline = 8,     // (pipeline_id, layout_id, descriptor_data_id)
    CreateComputePipeline = 9,    // (pipeline_id, layout_id, descriptor_data_id)
    CreateTextureView = 10,       // (view_id, texture_id, descriptor_data_id)
    CreateImageBitmap = 11,       // (bitmap_id, source_data_id)
    CreateRenderBundle = 12,      // (bundle_id, descriptor_data_id)

    // Render/compute pass state machine.
    BeginRenderPass = 13,  // (descriptor_data_id)
    BeginComputePass = 14, // ()
    SetPipeline = 15,      // (pipeline_id)
    SetBindGroup = 16,     // (slot, bind_group_id)
    SetVertexBuffer = 17,  // (slot, buffer_id)
    SetIndexBuffer = 18,   // (buffer_id, index_format)
    Draw = 19,             // (vertex_count, instance_count, first_vertex, first_instance)
    DrawIndexed = 20,      // (index_count, instance_count, first_index, base_vertex, first_instance)
    Dispatch = 21,         // (x, y, z)
    ExecuteBundles = 22,   // (bundle_id)
    EndPass = 23,          // ()

    // Queue operations.
    WriteBuffer = 24,                  // (buffer_id, offset, data_id)
    CopyBufferToBuffer = 25,           // (src_buffer_id, src_offset, dst_buffer_id, dst_offset, size)
    CopyTextureToTexture = 26,         // (src_texture_id, dst_texture_id, descriptor_data_id)
    CopyExternalImageToTexture = 27,   // (bitmap_id, texture_id, descriptor_data_id)
    Submit = 28,                       // ()

    // WASM-in-WASM.
    InitWasmModule = 29,       // (module_id, data_id)
    CallWasmFunc = 30,         // (module_id, args_data_id)
    WriteBufferFromWasm = 31,  // (buffer_id, data_id)

    // Structural.
    DefinePass = 32,    // (pass_id) -- body runs until EndPassDef
    ExecPass = 33,      // (pass_id)
    EndPassDef = 34,    // ()
    DefineFrame = 35,   // (frame_name_string_id) -- body runs until EndFrame
    EndFrame = 36,      // ()

    // Data generation helpers.
    CreateTypedArray = 37,     // (data_id, element_type, count)
    FillRandom = 38,           // (data_id, seed)
    FillConstant = 39,         // (data_id, value_bits)
    FillExpression = 40,       // (data_id, expr_data_id)
    WriteBufferFromArray = 41, // (buffer_id, data_id)

    // Animation scene machinery.
    BeginAnimationScene = 42, // (scene_index)
    EndAnimationScene = 43,   // ()

    WriteTimeUniform = 44, // (buffer_id, offset, size)

    // Reserved, never emitted by the assembler (spec §9 open question),
    // present only so the dispatcher's skip table stays forward-compatible.
    CreateShaderConcat = 45, // (result_data_id, part_count)
    SetBindGroupPool = 46,   // (pool_id, descriptor_data_id)
    SelectFromPool = 47,     // (pool_id, index)
    FillLinear = 48,         // (data_id, start_bits, step_bits)
    FillElementIndex = 49,   // (data_id)
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Option<Self> {
        use Opcode::*;
        Some(match byte {
            0 => Nop,
            1 => CreateShaderModule,
            2 => CreateBuffer,
            3 => CreateTexture,
            4 => CreateSampler,
            5 => CreateBindGroupLayout,
            6 => CreatePipelineLayout,
            7 => CreateBindGroup,
            8 => CreateRenderPipeline,
            9 => CreateComputePipeline,
            10 => CreateTextureView,
            11 => CreateImageBitmap,
            12 => CreateRenderBundle,
            13 => BeginRenderPass,
            14 => BeginComputePass,
            15 => SetPipeline,
            16 => SetBindGroup,
            17 => SetVertexBuffer,
            18 => SetIndexBuffer,
            19 => Draw,
            20 => DrawIndexed,
            21 => Dispatch,
            22 => ExecuteBundles,
            23 => EndPass,
            24 => WriteBuffer,
            25 => CopyBufferToBuffer,
            26 => CopyTextureToTexture,
            27 => CopyExternalImageToTexture,
            28 => Submit,
            29 => InitWasmModule,
            30 => CallWasmFunc,
            31 => WriteBufferFromWasm,
            32 => DefinePass,
            33 => ExecPass,
            34 => EndPassDef,
            35 => DefineFrame,
            36 => EndFrame,
            37 => CreateTypedArray,
            38 => FillRandom,
            39 => FillConstant,
            40 => FillExpression,
            41 => WriteBufferFromArray,
            42 => BeginAnimationScene,
            43 => EndAnimationScene,
            44 => WriteTimeUniform,
            45 => CreateShaderConcat,
            46 => SetBindGroupPool,
            47 => SelectFromPool,
            48 => FillLinear,
            49 => FillElementIndex,
            _ => return None,
        })
    }

    /// Number of varint parameters following this opcode byte. Used both by
    /// the emitter (to assert a fixed call shape) and the dispatcher (to
    /// forward-skip an opcode it does not interpret, e.g. a reserved one).
    pub fn param_count(self) -> u8 {
        use Opcode::*;
        match self {
            Nop => 0,
            CreateShaderModule => 2,
            CreateBuffer => 3,
            CreateTexture => 5,
            CreateSampler => 2,
            CreateBindGroupLayout => 2,
            CreatePipelineLayout => 2,
            CreateBindGroup => 3,
            CreateRenderPipeline => 3,
            CreateComputePipeline => 3,
            CreateTextureView => 3,
            CreateImageBitmap => 2,
            CreateRenderBundle => 2,
            BeginRenderPass => 1,
            BeginComputePass => 0,
            SetPipeline => 1,
            SetBindGroup => 2,
            SetVertexBuffer => 2,
            SetIndexBuffer => 2,
            Draw => 4,
            DrawIndexed => 5,
            Dispatch => 3,
            ExecuteBundles => 1,
            EndPass => 0,
            WriteBuffer => 3,
            CopyBufferToBuffer => 5,
            CopyTextureToTexture => 3,
            CopyExternalImageToTexture => 3,
            Submit => 0,
            InitWasmModule => 2,
            CallWasmFunc => 2,
            WriteBufferFromWasm => 2,
            DefinePass => 1,
            ExecPass => 1,
            EndPassDef => 0,
            DefineFrame => 1,
            EndFrame => 0,
            CreateTypedArray => 3,
            FillRandom => 2,
            FillConstant => 2,
            FillExpression => 2,
            WriteBufferFromArray => 2,
            BeginAnimationScene => 1,
            EndAnimationScene => 0,
            WriteTimeUniform => 3,
            CreateShaderConcat => 2,
            SetBindGroupPool => 2,
            SelectFromPool => 2,
            FillLinear => 3,
            FillElementIndex => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_defined_byte_round_trips() {
        for byte in 0u8..=49 {
            let op = Opcode::from_u8(byte).expect("defined opcode");
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    fn unknown_byte_is_none() {
        assert!(Opcode::from_u8(255).is_none());
    }
}
