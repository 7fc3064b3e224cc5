use pngine_lexer::MacroKeyword;

/// One symbol-table namespace per referenceable macro kind (spec §3). Note
/// `#define` is deliberately excluded: compile-time constants live in their
/// own table and are never cross-referenced by namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Wgsl,
    ShaderModule,
    Buffer,
    Texture,
    Sampler,
    BindGroup,
    BindGroupLayout,
    PipelineLayout,
    RenderPipeline,
    ComputePipeline,
    RenderPass,
    ComputePass,
    RenderBundle,
    Frame,
    Data,
    Queue,
    ImageBitmap,
    WasmCall,
    QuerySet,
    TextureView,
    Animation,
}

impl Namespace {
    pub fn from_macro_keyword(kw: MacroKeyword) -> Option<Self> {
        Some(match kw {
            MacroKeyword::Wgsl => Self::Wgsl,
            MacroKeyword::ShaderModule => Self::ShaderModule,
            MacroKeyword::Buffer => Self::Buffer,
            MacroKeyword::Texture => Self::Texture,
            MacroKeyword::Sampler => Self::Sampler,
            MacroKeyword::BindGroup => Self::BindGroup,
            MacroKeyword::BindGroupLayout => Self::BindGroupLayout,
            MacroKeyword::PipelineLayout => Self::PipelineLayout,
            MacroKeyword::RenderPipeline => Self::RenderPipeline,
            MacroKeyword::ComputePipeline => Self::ComputePipeline,
            MacroKeyword::RenderPass => Self::RenderPass,
            MacroKeyword::ComputePass => Self::ComputePass,
            MacroKeyword::RenderBundle => Self::RenderBundle,
            MacroKeyword::Frame => Self::Frame,
            MacroKeyword::Data => Self::Data,
            MacroKeyword::Queue => Self::Queue,
            MacroKeyword::ImageBitmap => Self::ImageBitmap,
            MacroKeyword::WasmCall => Self::WasmCall,
            MacroKeyword::QuerySet => Self::QuerySet,
            MacroKeyword::TextureView => Self::TextureView,
            MacroKeyword::Animation => Self::Animation,
            MacroKeyword::Define => return None,
        })
    }

    pub fn is_shader(self) -> bool {
        matches!(self, Self::Wgsl | Self::ShaderModule)
    }
}
