use pngine_lexer::MacroKeyword;

/// Required property names for each macro kind (spec §4.3 phase 6: "`#buffer`
/// requires `size` and `usage`; `#texture` requires `format` and `usage` —
/// `width`/`height` default; `#renderPipeline` requires `vertex`; `#wgsl`
/// requires `value`; `#shaderModule` requires `code`"). The remaining kinds
/// are extrapolated symmetrically from those examples.
///
/// `#renderPass` requires neither `draw` nor `drawIndexed` here since they're
/// alternatives, not both-required; that's checked separately (see
/// `validate_render_pass_draw` in `lib.rs`).
pub fn required_properties(kw: MacroKeyword) -> &'static [&'static str] {
    match kw {
        MacroKeyword::Define => &[],
        MacroKeyword::Wgsl => &["value"],
        MacroKeyword::ShaderModule => &["code"],
        MacroKeyword::Buffer => &["size", "usage"],
        MacroKeyword::Texture => &["format", "usage"],
        MacroKeyword::Sampler => &[],
        MacroKeyword::BindGroup => &["entries"],
        MacroKeyword::BindGroupLayout => &["entries"],
        MacroKeyword::PipelineLayout => &["bindGroupLayouts"],
        MacroKeyword::RenderPipeline => &["vertex"],
        MacroKeyword::ComputePipeline => &["compute"],
        MacroKeyword::RenderPass => &["pipeline"],
        MacroKeyword::ComputePass => &["pipeline"],
        MacroKeyword::RenderBundle => &[],
        MacroKeyword::Frame => &["perform"],
        MacroKeyword::Data => &["bytes"],
        MacroKeyword::Queue => &[],
        MacroKeyword::ImageBitmap => &["source"],
        MacroKeyword::WasmCall => &["function"],
        MacroKeyword::QuerySet => &["type", "count"],
        MacroKeyword::TextureView => &["texture"],
        MacroKeyword::Animation => &["scenes"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_requires_size_and_usage() {
        assert_eq!(required_properties(MacroKeyword::Buffer), &["size", "usage"]);
    }

    #[test]
    fn sampler_has_no_required_properties() {
        assert!(required_properties(MacroKeyword::Sampler).is_empty());
    }
}
