use pngine_analyzer::{analyze, AnalysisResult, Namespace};
use pngine_bytecode::{Emitter, Opcode};
use pngine_format::{serialize, FieldType, Module, ModuleParts, Scene, UniformField};
use pngine_intern::{DataInterner, StringInterner};
use pngine_lexer::{MacroKeyword, Token};
use pngine_parser::{node_token_text, parse, Ast, NodeData, NodeIndex, NodeTag};
use tracing::debug_span;

use crate::errors::CompileError;
use crate::flags::usage_bits;
use crate::properties::{find_property, number_property, ref_property, serialize_descriptor, text_property};
use crate::resource_ids::ResourceIds;

const NONE_ID: u64 = 0xFFFF;

/// `compile(source) -> PNGB bytes` (spec §4.6). Aborts on the first lex or
/// parse error; accumulates every analyzer error before reporting.
pub fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
    let _span = debug_span!("compile").entered();
    let (ast, tokens) = parse(source)?;
    let analysis = analyze(source, &tokens, &ast);
    if let Some(first) = analysis.errors.first().cloned() {
        return Err(CompileError::Analyze { first, all: analysis.errors.clone() });
    }

    let mut ctx = Ctx {
        source,
        tokens: &tokens,
        ast: &ast,
        analysis: &analysis,
        strings: StringInterner::new(),
        data: DataInterner::new(),
        ids: ResourceIds::default(),
        emitter: Emitter::new(),
        uniform_entries: Vec::new(),
        animation_scenes: Vec::new(),
        animation_looped: false,
    };

    ctx.emit_shaders()?;
    ctx.emit_bind_group_layouts()?;
    ctx.emit_pipeline_layouts()?;
    ctx.emit_pipelines()?;
    ctx.emit_buffers_textures_samplers()?;
    ctx.emit_data_macros()?;
    ctx.emit_texture_views()?;
    ctx.emit_image_bitmaps()?;
    ctx.emit_bind_groups()?;
    ctx.emit_render_bundles()?;

    ctx.emit_frames()?;
    ctx.build_animation_table()?;

    let bytecode = ctx.emitter.into_bytes();
    let string_table = pngine_format::write_string_table(ctx.strings.entries().map(|s| s.as_bytes()));
    let data_section = pngine_format::write_data_section(ctx.data.entries());
    let uniform_table = pngine_format::write_uniform_table(&ctx.uniform_entries);
    let animation_table = pngine_format::write_animation_table(ctx.animation_looped, &ctx.animation_scenes);

    let parts = ModuleParts { bytecode, string_table, data_section, uniform_table, animation_table };
    Ok(serialize(&parts))
}

/// Parses `compile`'s output back into a [`Module`]; a thin convenience so
/// callers who only need to round-trip don't re-derive the PNGB contract.
pub fn compile_and_load(source: &str) -> Result<Vec<u8>, CompileError> {
    let bytes = compile(source)?;
    // Validate it deserializes; `Module` borrows `bytes` so we can't return
    // both from one function without self-referential storage.
    Module::deserialize(&bytes).expect("assembler produced an undeserializable module");
    Ok(bytes)
}

struct Ctx<'a> {
    source: &'a str,
    tokens: &'a [Token],
    ast: &'a Ast,
    analysis: &'a AnalysisResult,
    strings: StringInterner,
    data: DataInterner,
    ids: ResourceIds,
    emitter: Emitter,
    /// Uniform-table rows (spec §4.6 stage 4), keyed by the reflected
    /// variable's interned string id.
    uniform_entries: Vec<(u16, UniformField)>,
    animation_scenes: Vec<Scene>,
    animation_looped: bool,
}

impl<'a> Ctx<'a> {
    fn macros_in(&self, namespace: Namespace) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self
            .analysis
            .symbols
            .by_namespace
            .get(&namespace)
            .map(|b| b.values().copied().collect())
            .unwrap_or_default();
        nodes.sort_unstable();
        nodes
    }

    fn owner_kw(&self, node: NodeIndex) -> MacroKeyword {
        match self.ast.tag(node) {
            NodeTag::Macro(kw) => kw,
            _ => unreachable!("resource node must be a macro"),
        }
    }

    fn intern_descriptor(&mut self, node: NodeIndex) -> Result<u16, CompileError> {
        let text = serialize_descriptor(self.source, self.tokens, self.ast, node);
        Ok(self.data.intern(text.as_bytes())?)
    }

    fn ref_id_or_none(&mut self, owner: NodeIndex, property: &str, namespace: Namespace) -> u64 {
        match find_property(self.source, self.tokens, self.ast, owner, property) {
            Some(value) if self.ast.tag(value) == NodeTag::IdentifierValue => {
                let text = node_token_text(self.source, self.tokens, self.ast, value);
                if text == "auto" {
                    return NONE_ID;
                }
                match ref_property(self.source, self.tokens, self.ast, self.analysis, owner, property) {
                    Some(target) => self.ids.assign(namespace, target) as u64,
                    None => NONE_ID,
                }
            }
            _ => NONE_ID,
        }
    }

    fn emit_shaders(&mut self) -> Result<(), CompileError> {
        for node in [self.macros_in(Namespace::Wgsl), self.macros_in(Namespace::ShaderModule)].concat() {
            let id = self.ids.assign(namespace_of(self.owner_kw(node)), node);
            let fragment_id = self.analysis.shader_data_ids.get(&node).copied().unwrap_or(0);
            let text = self
                .analysis
                .shader_fragments
                .iter()
                .find(|f| f.data_id == fragment_id)
                .map(|f| f.text.clone())
                .unwrap_or_default();
            let data_id = self.data.intern(text.as_bytes())?;
            self.emitter.emit(Opcode::CreateShaderModule, &[id as u64, data_id as u64]);
        }
        Ok(())
    }

    fn emit_bind_group_layouts(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::BindGroupLayout) {
            let id = self.ids.assign(Namespace::BindGroupLayout, node);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreateBindGroupLayout, &[id as u64, data_id as u64]);
        }
        Ok(())
    }

    fn emit_pipeline_layouts(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::PipelineLayout) {
            let id = self.ids.assign(Namespace::PipelineLayout, node);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreatePipelineLayout, &[id as u64, data_id as u64]);
        }
        Ok(())
    }

    fn emit_pipelines(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::RenderPipeline) {
            let id = self.ids.assign(Namespace::RenderPipeline, node);
            let layout_id = self.ref_id_or_none(node, "layout", Namespace::PipelineLayout);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreateRenderPipeline, &[id as u64, layout_id, data_id as u64]);
        }
        for node in self.macros_in(Namespace::ComputePipeline) {
            let id = self.ids.assign(Namespace::ComputePipeline, node);
            let layout_id = self.ref_id_or_none(node, "layout", Namespace::PipelineLayout);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreateComputePipeline, &[id as u64, layout_id, data_id as u64]);
        }
        Ok(())
    }

    fn emit_buffers_textures_samplers(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::Buffer) {
            let id = self.ids.assign(Namespace::Buffer, node);
            let size = number_property(self.source, self.tokens, self.ast, &self.analysis.symbols.defines, node, "size", 0.0);
            let usage = find_property(self.source, self.tokens, self.ast, node, "usage")
                .map(|v| usage_bits(self.source, self.tokens, self.ast, v) as u64)
                .unwrap_or(0);
            self.emitter.emit(Opcode::CreateBuffer, &[id as u64, size as u64, usage]);
        }
        for node in self.macros_in(Namespace::Texture) {
            let id = self.ids.assign(Namespace::Texture, node);
            let width = number_property(self.source, self.tokens, self.ast, &self.analysis.symbols.defines, node, "width", 1.0);
            let height = number_property(self.source, self.tokens, self.ast, &self.analysis.symbols.defines, node, "height", 1.0);
            let format_text = text_property(self.source, self.tokens, self.ast, node, "format").unwrap_or("");
            let format_id = self.strings.intern(format_text)?;
            let usage = find_property(self.source, self.tokens, self.ast, node, "usage")
                .map(|v| usage_bits(self.source, self.tokens, self.ast, v) as u64)
                .unwrap_or(0);
            self.emitter
                .emit(Opcode::CreateTexture, &[id as u64, width as u64, height as u64, format_id as u64, usage]);
        }
        for node in self.macros_in(Namespace::Sampler) {
            let id = self.ids.assign(Namespace::Sampler, node);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreateSampler, &[id as u64, data_id as u64]);
        }
        Ok(())
    }

    fn emit_data_macros(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::Data) {
            self.ids.assign(Namespace::Data, node);
            let bytes_text = text_property(self.source, self.tokens, self.ast, node, "bytes").unwrap_or("");
            self.data.intern(bytes_text.as_bytes())?;
        }
        Ok(())
    }

    fn emit_texture_views(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::TextureView) {
            let id = self.ids.assign(Namespace::TextureView, node);
            let texture_id = self.ref_id_or_none(node, "texture", Namespace::Texture);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreateTextureView, &[id as u64, texture_id, data_id as u64]);
        }
        Ok(())
    }

    fn emit_image_bitmaps(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::ImageBitmap) {
            let id = self.ids.assign(Namespace::ImageBitmap, node);
            let source_text = text_property(self.source, self.tokens, self.ast, node, "source").unwrap_or("");
            let data_id = self.data.intern(source_text.as_bytes())?;
            self.emitter.emit(Opcode::CreateImageBitmap, &[id as u64, data_id as u64]);
        }
        Ok(())
    }

    fn emit_bind_groups(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::BindGroup) {
            let id = self.ids.assign(Namespace::BindGroup, node);
            let layout_id = self.ref_id_or_none(node, "layout", Namespace::BindGroupLayout);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreateBindGroup, &[id as u64, layout_id, data_id as u64]);
        }
        Ok(())
    }

    fn emit_render_bundles(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::RenderBundle) {
            let id = self.ids.assign(Namespace::RenderBundle, node);
            let data_id = self.intern_descriptor(node)?;
            self.emitter.emit(Opcode::CreateRenderBundle, &[id as u64, data_id as u64]);
        }
        Ok(())
    }

    fn emit_frames(&mut self) -> Result<(), CompileError> {
        for node in self.macros_in(Namespace::Frame) {
            let name = node_token_text(self.source, self.tokens, self.ast, node).to_string();
            let name_id = self.strings.intern(&name)?;

            self.emitter.emit(Opcode::DefineFrame, &[name_id as u64]);
            self.emit_write_buffers(node)?;
            self.emit_perform_list(node)?;
            self.emitter.emit(Opcode::Submit, &[]);
            self.emitter.emit(Opcode::EndFrame, &[]);
        }
        Ok(())
    }

    /// Builds the animation side table (spec §4.6 stage 4, §4.9) from the
    /// first `#animation` macro's `scenes` array; each scene is `{ frame,
    /// start, end }`, with `frame` resolved against the `Frame` namespace and
    /// interned so the dispatcher can look it up by string id at runtime. A
    /// source with more than one `#animation` macro only honors the first
    /// (spec names one timeline, not a set of them).
    fn build_animation_table(&mut self) -> Result<(), CompileError> {
        let node = match self.macros_in(Namespace::Animation).first().copied() {
            Some(n) => n,
            None => return Ok(()),
        };
        self.animation_looped = text_property(self.source, self.tokens, self.ast, node, "loop") == Some("true");
        let scenes_value = match find_property(self.source, self.tokens, self.ast, node, "scenes") {
            Some(v) => v,
            None => return Ok(()),
        };
        let entries = match self.ast.data(scenes_value) {
            NodeData::Range { start, end } => self.ast.extra((start, end)).to_vec(),
            _ => return Ok(()),
        };
        for entry in entries {
            let start_ms = number_property(
                self.source,
                self.tokens,
                self.ast,
                &self.analysis.symbols.defines,
                entry,
                "start",
                0.0,
            ) as u32;
            let end_ms = number_property(
                self.source,
                self.tokens,
                self.ast,
                &self.analysis.symbols.defines,
                entry,
                "end",
                0.0,
            ) as u32;
            let frame_name = match find_property(self.source, self.tokens, self.ast, entry, "frame") {
                Some(v) if self.ast.tag(v) == NodeTag::IdentifierValue => {
                    node_token_text(self.source, self.tokens, self.ast, v)
                }
                _ => continue,
            };
            let frame_string_id = self.strings.intern(frame_name)?;
            self.animation_scenes.push(Scene {
                start_ms,
                duration_ms: end_ms.saturating_sub(start_ms),
                frame_string_id,
            });
        }
        self.animation_scenes.sort_by_key(|s| s.start_ms);
        Ok(())
    }

    fn emit_write_buffers(&mut self, frame: NodeIndex) -> Result<(), CompileError> {
        let value = match find_property(self.source, self.tokens, self.ast, frame, "writeBuffer") {
            Some(v) => v,
            None => return Ok(()),
        };
        let entries = match self.ast.data(value) {
            NodeData::Range { start, end } => self.ast.extra((start, end)).to_vec(),
            _ => return Ok(()),
        };
        for entry in entries {
            let buffer_id = self.ref_id_or_none(entry, "buffer", Namespace::Buffer);
            let data_value = match find_property(self.source, self.tokens, self.ast, entry, "data") {
                Some(v) => v,
                None => continue,
            };
            if self.ast.tag(data_value) == NodeTag::UniformAccess {
                // Reflected shader uniform: best translated as a
                // time/frame-relative uniform write, not a static blob.
                self.emitter.emit(Opcode::WriteTimeUniform, &[buffer_id, 0, 64]);
                if let Some(resolved) = self.analysis.resolved_uniforms.get(&data_value) {
                    let string_id = self.strings.intern(&resolved.var_name)?;
                    let field = UniformField {
                        buffer_id: buffer_id as u16,
                        offset: 0,
                        size: 64,
                        field_type: FieldType::Mat4x4F32,
                    };
                    self.uniform_entries.push((string_id, field));
                }
                continue;
            }
            let data_id = self.ref_id_or_none(entry, "data", Namespace::Data);
            self.emitter.emit(Opcode::WriteBuffer, &[buffer_id, 0, data_id]);
        }
        Ok(())
    }

    fn emit_perform_list(&mut self, frame: NodeIndex) -> Result<(), CompileError> {
        let value = match find_property(self.source, self.tokens, self.ast, frame, "perform") {
            Some(v) => v,
            None => return Ok(()),
        };
        let elems = match self.ast.data(value) {
            NodeData::Range { start, end } => self.ast.extra((start, end)).to_vec(),
            _ => return Ok(()),
        };
        for elem in elems {
            if self.ast.tag(elem) != NodeTag::IdentifierValue {
                continue;
            }
            let name = node_token_text(self.source, self.tokens, self.ast, elem).to_string();
            if let Some(pass) = self.analysis.symbols.lookup(Namespace::RenderPass, &name) {
                self.emit_render_pass(pass)?;
            } else if let Some(pass) = self.analysis.symbols.lookup(Namespace::ComputePass, &name) {
                self.emit_compute_pass(pass)?;
            }
            // `#queue` is a declared resource name, not a perform-list action;
            // every frame submits exactly once, after its passes run.
        }
        Ok(())
    }

    fn emit_render_pass(&mut self, pass: NodeIndex) -> Result<(), CompileError> {
        let descriptor_id = self.intern_descriptor(pass)?;
        self.emitter.emit(Opcode::BeginRenderPass, &[descriptor_id as u64]);

        let pipeline_id = self.ref_id_or_none(pass, "pipeline", Namespace::RenderPipeline);
        if pipeline_id != NONE_ID {
            self.emitter.emit(Opcode::SetPipeline, &[pipeline_id]);
        }
        self.emit_bind_groups_for_pass(pass);
        self.emit_vertex_buffers_for_pass(pass);

        if let Some(count) =
            find_property(self.source, self.tokens, self.ast, pass, "draw").map(|v| self.eval_number(v))
        {
            self.emitter.emit(Opcode::Draw, &[count as u64, 1, 0, 0]);
        } else if let Some(count) =
            find_property(self.source, self.tokens, self.ast, pass, "drawIndexed").map(|v| self.eval_number(v))
        {
            self.emitter.emit(Opcode::DrawIndexed, &[count as u64, 1, 0, 0, 0]);
        }
        self.emitter.emit(Opcode::EndPass, &[]);
        Ok(())
    }

    fn emit_compute_pass(&mut self, pass: NodeIndex) -> Result<(), CompileError> {
        self.emitter.emit(Opcode::BeginComputePass, &[]);
        let pipeline_id = self.ref_id_or_none(pass, "pipeline", Namespace::ComputePipeline);
        if pipeline_id != NONE_ID {
            self.emitter.emit(Opcode::SetPipeline, &[pipeline_id]);
        }
        self.emit_bind_groups_for_pass(pass);
        if let Some(value) = find_property(self.source, self.tokens, self.ast, pass, "dispatch") {
            let dims = match self.ast.data(value) {
                NodeData::Range { start, end } => self.ast.extra((start, end)).to_vec(),
                _ => Vec::new(),
            };
            let mut xyz = [1u64, 1, 1];
            for (i, &d) in dims.iter().take(3).enumerate() {
                xyz[i] = self.eval_number(d) as u64;
            }
            self.emitter.emit(Opcode::Dispatch, &xyz);
        }
        self.emitter.emit(Opcode::EndPass, &[]);
        Ok(())
    }

    fn emit_bind_groups_for_pass(&mut self, pass: NodeIndex) {
        let value = match find_property(self.source, self.tokens, self.ast, pass, "bindGroups") {
            Some(v) => v,
            None => return,
        };
        let elems = match self.ast.data(value) {
            NodeData::Range { start, end } => self.ast.extra((start, end)).to_vec(),
            _ => return,
        };
        for (slot, elem) in elems.into_iter().enumerate() {
            if self.ast.tag(elem) == NodeTag::IdentifierValue {
                if let Some(target) = self.analysis.resolved_identifiers.get(&elem).copied() {
                    let id = self.ids.get(Namespace::BindGroup, target).unwrap_or(0);
                    self.emitter.emit(Opcode::SetBindGroup, &[slot as u64, id as u64]);
                }
            }
        }
    }

    fn emit_vertex_buffers_for_pass(&mut self, pass: NodeIndex) {
        let value = match find_property(self.source, self.tokens, self.ast, pass, "vertexBuffers") {
            Some(v) => v,
            None => return,
        };
        let elems = match self.ast.data(value) {
            NodeData::Range { start, end } => self.ast.extra((start, end)).to_vec(),
            _ => return,
        };
        for (slot, elem) in elems.into_iter().enumerate() {
            if self.ast.tag(elem) == NodeTag::IdentifierValue {
                if let Some(target) = self.analysis.resolved_identifiers.get(&elem).copied() {
                    let id = self.ids.get(Namespace::Buffer, target).unwrap_or(0);
                    self.emitter.emit(Opcode::SetVertexBuffer, &[slot as u64, id as u64]);
                }
            }
        }
    }

    fn eval_number(&self, node: NodeIndex) -> f64 {
        pngine_analyzer::evaluate_expression(self.source, self.tokens, self.ast, &self.analysis.symbols.defines, node)
            .unwrap_or(0.0)
    }
}

fn namespace_of(kw: MacroKeyword) -> Namespace {
    Namespace::from_macro_keyword(kw).expect("shader macro kinds always map to a namespace")
}
