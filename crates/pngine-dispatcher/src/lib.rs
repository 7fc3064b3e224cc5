//! Bytecode dispatcher (spec §4.8, §4.9): walks a [`Module`]'s bytecode
//! stream and drives a [`GpuBackend`]. Generic/monomorphized over the
//! back-end rather than boxed, so the hot per-frame loop has no dynamic
//! dispatch overhead (spec §9 design note).

mod errors;
mod pass_state;

pub use errors::DispatchError;
pub use pass_state::PassState;

use std::collections::HashMap;

use pngine_bytecode::{decode_next, Opcode};
use pngine_format::Module;
use pngine_gpu::{GpuBackend, GpuError, IndexFormat, ResourceId};
use tracing::debug_span;

use errors::map_decode_err;

/// Reserved id meaning "no reference" (spec §4.3/§4.7); matches the
/// assembler's `NONE_ID`.
const NONE_ID: u64 = 0xFFFF;

fn opt_id(raw: u64) -> Option<ResourceId> {
    if raw == NONE_ID {
        None
    } else {
        Some(raw as ResourceId)
    }
}

fn index_format(raw: u64) -> IndexFormat {
    if raw == 0 {
        IndexFormat::Uint16
    } else {
        IndexFormat::Uint32
    }
}

/// How the dispatcher treats the five reserved opcodes from spec §9
/// (`create_shader_concat`, `set_bind_group_pool`, `select_from_pool`,
/// `fill_linear`, `fill_element_index`): the assembler never emits them, but
/// a hand-crafted or future bytecode stream might.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownOpcodePolicy {
    /// Forward-skip using the static param-length table (spec default).
    Skip,
    /// Treat encountering one as `invalid_opcode`.
    Reject,
}

impl Default for UnknownOpcodePolicy {
    fn default() -> Self {
        UnknownOpcodePolicy::Skip
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatcherOptions {
    pub unknown_opcode: UnknownOpcodePolicy,
}

/// Executes a compiled module's bytecode against a [`GpuBackend`].
///
/// Holds two indexes built once in [`Dispatcher::new`]: frame name to byte
/// offset, and pass id to byte offset, so `execute_frame`/`exec_pass` never
/// need to linearly scan the stream. All other state is the pass-state
/// machine, the wrapping frame counter and the current animation time.
pub struct Dispatcher<'m, G: GpuBackend> {
    gpu: G,
    module: &'m Module<'m>,
    frame_offsets: HashMap<String, usize>,
    pass_defs: HashMap<u64, usize>,
    frame_counter: u32,
    pass_state: PassState,
    current_time: f64,
    options: DispatcherOptions,
}

impl<'m, G: GpuBackend> Dispatcher<'m, G> {
    /// Scans the bytecode once to index every `define_frame`/`define_pass`
    /// block, skipping their bodies rather than executing them.
    pub fn new(gpu: G, module: &'m Module<'m>) -> Result<Self, DispatchError> {
        Self::new_with_options(gpu, module, DispatcherOptions::default())
    }

    pub fn new_with_options(gpu: G, module: &'m Module<'m>, options: DispatcherOptions) -> Result<Self, DispatchError> {
        let bytecode = module.bytecode();
        let strings = module.strings()?;
        let mut frame_offsets = HashMap::new();
        let mut pass_defs = HashMap::new();

        let mut pos = 0usize;
        while pos < bytecode.len() {
            let start = pos;
            let instr = decode_next(bytecode, &mut pos).map_err(map_decode_err)?;
            match instr.opcode {
                Opcode::DefineFrame => {
                    let name = strings.get_str(instr.params[0] as u16).unwrap_or("").to_string();
                    frame_offsets.insert(name, start);
                    skip_block(bytecode, &mut pos, Opcode::EndFrame)?;
                }
                Opcode::DefinePass => {
                    pass_defs.insert(instr.params[0], start);
                    skip_block(bytecode, &mut pos, Opcode::EndPassDef)?;
                }
                _ => {}
            }
        }

        Ok(Self {
            gpu,
            module,
            frame_offsets,
            pass_defs,
            frame_counter: 0,
            pass_state: PassState::Idle,
            current_time: 0.0,
            options,
        })
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_counter
    }

    pub fn frame_names(&self) -> impl Iterator<Item = &str> {
        self.frame_offsets.keys().map(String::as_str)
    }

    /// Runs every opcode before the first `define_frame`/`define_pass`
    /// block: the resource-creation prologue (spec §4.8).
    pub fn execute_all(&mut self) -> Result<(), DispatchError> {
        let _span = debug_span!("dispatch_execute_all").entered();
        let bytecode = self.module.bytecode();
        let mut pos = 0usize;
        while pos < bytecode.len() {
            let before = pos;
            let instr = decode_next(bytecode, &mut pos).map_err(map_decode_err)?;
            if matches!(instr.opcode, Opcode::DefineFrame | Opcode::DefinePass) {
                pos = before;
                break;
            }
            self.execute(instr.opcode, &instr.params)?;
        }
        Ok(())
    }

    /// Jumps to `frame_name`'s indexed offset, sets the current time, and
    /// streams opcodes until `end_frame` (spec §4.9).
    pub fn execute_frame(&mut self, frame_name: &str, t: f64) -> Result<(), DispatchError> {
        let _span = debug_span!("dispatch_execute_frame", frame = frame_name).entered();
        let offset = *self
            .frame_offsets
            .get(frame_name)
            .ok_or_else(|| DispatchError::FrameNotFound(frame_name.to_string()))?;

        self.current_time = t;
        let bytecode = self.module.bytecode();
        let mut pos = offset;
        decode_next(bytecode, &mut pos).map_err(map_decode_err)?; // DefineFrame header
        self.run_until(bytecode, &mut pos, Opcode::EndFrame)?;
        self.frame_counter = self.frame_counter.wrapping_add(1);
        Ok(())
    }

    /// Selects the active scene at `now_ms` from the module's animation
    /// table and dispatches its `frame_string_id`'s frame (spec §4.9): "The
    /// dispatcher uses the active scene's `frame_string_id` to select which
    /// frame body to execute." The frame runs with the scene-local time (in
    /// seconds) from [`pngine_format::get_scene_time`], not the raw `now_ms`.
    pub fn execute_animation_frame(&mut self, now_ms: u64) -> Result<(), DispatchError> {
        let _span = debug_span!("dispatch_execute_animation_frame", now_ms).entered();
        let animation = self.module.animation()?;
        let scene_idx = animation
            .find_scene_at_time(now_ms)
            .ok_or(DispatchError::NoActiveScene { now_ms })?;
        let scene = animation.scene_at(scene_idx).expect("index from find_scene_at_time is in range");
        let scene_time = pngine_format::get_scene_time(scene, now_ms, animation.is_looped(), animation.total_duration_ms());
        let frame_name = self
            .module
            .strings()?
            .get_str(scene.frame_string_id)
            .ok_or_else(|| DispatchError::FrameNotFound(format!("string id {}", scene.frame_string_id)))?
            .to_string();
        self.execute_frame(&frame_name, scene_time.scene_time_s)
    }

    fn run_until(&mut self, bytecode: &[u8], pos: &mut usize, terminator: Opcode) -> Result<(), DispatchError> {
        loop {
            let instr = decode_next(bytecode, pos).map_err(map_decode_err)?;
            if instr.opcode == terminator {
                return Ok(());
            }
            self.execute(instr.opcode, &instr.params)?;
        }
    }

    fn exec_pass(&mut self, pass_id: u64) -> Result<(), DispatchError> {
        let offset = *self
            .pass_defs
            .get(&pass_id)
            .ok_or(DispatchError::PassStateViolation("exec_pass references an undefined pass id"))?;
        let bytecode = self.module.bytecode();
        let mut pos = offset;
        decode_next(bytecode, &mut pos).map_err(map_decode_err)?; // DefinePass header
        self.run_until(bytecode, &mut pos, Opcode::EndPassDef)
    }

    fn data_bytes(&self, id: u64) -> Result<&'m [u8], DispatchError> {
        let id = id as ResourceId;
        self.module
            .data()?
            .get(id)
            .ok_or(DispatchError::Backend(GpuError::ResourceNotFound { kind: "data", id }))
    }

    fn execute(&mut self, opcode: Opcode, p: &[u64]) -> Result<(), DispatchError> {
        use Opcode::*;
        match opcode {
            Nop => {}

            CreateShaderModule => {
                let source = self.data_bytes(p[1])?;
                self.gpu.create_shader_module(p[0] as ResourceId, source)?;
            }
            CreateBuffer => {
                self.gpu.create_buffer(p[0] as ResourceId, p[1], p[2] as u32)?;
            }
            CreateTexture => {
                let format = self
                    .module
                    .strings()?
                    .get_str(p[3] as u16)
                    .unwrap_or("")
                    .to_string();
                self.gpu
                    .create_texture(p[0] as ResourceId, p[1] as u32, p[2] as u32, &format, p[4] as u32)?;
            }
            CreateSampler => {
                let descriptor = self.data_bytes(p[1])?;
                self.gpu.create_sampler(p[0] as ResourceId, descriptor)?;
            }
            CreateBindGroupLayout => {
                let descriptor = self.data_bytes(p[1])?;
                self.gpu.create_bind_group_layout(p[0] as ResourceId, descriptor)?;
            }
            CreatePipelineLayout => {
                let descriptor = self.data_bytes(p[1])?;
                self.gpu.create_pipeline_layout(p[0] as ResourceId, descriptor)?;
            }
            CreateBindGroup => {
                let descriptor = self.data_bytes(p[2])?;
                self.gpu.create_bind_group(p[0] as ResourceId, opt_id(p[1]), descriptor)?;
            }
            CreateRenderPipeline => {
                let descriptor = self.data_bytes(p[2])?;
                self.gpu
                    .create_render_pipeline(p[0] as ResourceId, opt_id(p[1]), descriptor)?;
            }
            CreateComputePipeline => {
                let descriptor = self.data_bytes(p[2])?;
                self.gpu
                    .create_compute_pipeline(p[0] as ResourceId, opt_id(p[1]), descriptor)?;
            }
            CreateTextureView => {
                let descriptor = self.data_bytes(p[2])?;
                self.gpu
                    .create_texture_view(p[0] as ResourceId, p[1] as ResourceId, descriptor)?;
            }
            CreateImageBitmap => {
                let source = self.data_bytes(p[1])?;
                self.gpu.create_image_bitmap(p[0] as ResourceId, source)?;
            }
            CreateRenderBundle => {
                let descriptor = self.data_bytes(p[1])?;
                self.gpu.create_render_bundle(p[0] as ResourceId, descriptor)?;
            }

            BeginRenderPass => {
                self.pass_state.begin_render()?;
                let descriptor = self.data_bytes(p[0])?;
                self.gpu.begin_render_pass(descriptor)?;
            }
            BeginComputePass => {
                self.pass_state.begin_compute()?;
                self.gpu.begin_compute_pass()?;
            }
            SetPipeline => {
                self.pass_state.require_any_pass("set_pipeline outside a pass")?;
                self.gpu.set_pipeline(p[0] as ResourceId)?;
            }
            SetBindGroup => {
                self.pass_state.require_any_pass("set_bind_group outside a pass")?;
                self.gpu.set_bind_group(p[0] as u32, p[1] as ResourceId)?;
            }
            SetVertexBuffer => {
                self.pass_state.require_render_pass("set_vertex_buffer outside a render pass")?;
                self.gpu.set_vertex_buffer(p[0] as u32, p[1] as ResourceId)?;
            }
            SetIndexBuffer => {
                self.pass_state.require_render_pass("set_index_buffer outside a render pass")?;
                self.gpu.set_index_buffer(p[0] as ResourceId, index_format(p[1]))?;
            }
            Draw => {
                self.pass_state.require_render_pass("draw outside a render pass")?;
                self.gpu.draw(p[0] as u32, p[1] as u32, p[2] as u32, p[3] as u32)?;
            }
            DrawIndexed => {
                self.pass_state.require_render_pass("draw_indexed outside a render pass")?;
                self.gpu
                    .draw_indexed(p[0] as u32, p[1] as u32, p[2] as u32, p[3] as i32, p[4] as u32)?;
            }
            Dispatch => {
                self.pass_state.require_compute_pass("dispatch outside a compute pass")?;
                self.gpu.dispatch(p[0] as u32, p[1] as u32, p[2] as u32)?;
            }
            ExecuteBundles => {
                self.pass_state.require_render_pass("execute_bundles outside a render pass")?;
                self.gpu.execute_bundles(p[0] as ResourceId)?;
            }
            EndPass => {
                self.pass_state.end()?;
                self.gpu.end_pass()?;
            }

            WriteBuffer => {
                let data = self.data_bytes(p[2])?;
                self.gpu.write_buffer(p[0] as ResourceId, p[1], data)?;
            }
            CopyBufferToBuffer => {
                self.gpu
                    .copy_buffer_to_buffer(p[0] as ResourceId, p[1], p[2] as ResourceId, p[3], p[4])?;
            }
            CopyTextureToTexture => {
                let descriptor = self.data_bytes(p[2])?;
                self.gpu
                    .copy_texture_to_texture(p[0] as ResourceId, p[1] as ResourceId, descriptor)?;
            }
            CopyExternalImageToTexture => {
                let descriptor = self.data_bytes(p[2])?;
                self.gpu
                    .copy_external_image_to_texture(p[0] as ResourceId, p[1] as ResourceId, descriptor)?;
            }
            Submit => {
                self.gpu.submit()?;
            }

            InitWasmModule => {
                let code = self.data_bytes(p[1])?;
                self.gpu.init_wasm_module(p[0] as ResourceId, code)?;
            }
            CallWasmFunc => {
                let args = self.data_bytes(p[1])?;
                self.gpu.call_wasm_func(p[0] as ResourceId, "", args)?;
            }
            WriteBufferFromWasm => {
                let args = self.data_bytes(p[1])?;
                self.gpu.write_buffer_from_wasm(p[0] as ResourceId, args)?;
            }

            DefinePass | DefineFrame => {
                return Err(DispatchError::PassStateViolation(
                    "define_frame/define_pass encountered outside index scan; bytecode is not well-formed",
                ));
            }
            ExecPass => self.exec_pass(p[0])?,
            EndPassDef | EndFrame => {
                return Err(DispatchError::PassStateViolation("unmatched end_pass_def/end_frame"));
            }

            CreateTypedArray => {
                self.gpu.create_typed_array(p[0] as u16, p[1] as u8, p[2] as u32)?;
            }
            FillRandom => {
                self.gpu.fill_random(p[0] as u16, p[1])?;
            }
            FillConstant => {
                self.gpu.fill_constant(p[0] as u16, p[1])?;
            }
            FillExpression => {
                self.gpu.fill_expression(p[0] as u16, p[1] as u16)?;
            }
            WriteBufferFromArray => {
                self.gpu.write_buffer_from_array(p[0] as ResourceId, p[1] as u16)?;
            }

            // Animation scene bracketing is dispatcher-side bookkeeping only;
            // no back-end call corresponds to it (spec §4.9).
            BeginAnimationScene | EndAnimationScene => {}

            WriteTimeUniform => {
                self.gpu
                    .write_time_uniform(p[0] as ResourceId, p[1], p[2] as u32, self.current_time)?;
            }

            // Reserved opcodes never emitted by the assembler; forward-skip
            // unless the caller opted into rejecting them.
            CreateShaderConcat | SetBindGroupPool | SelectFromPool | FillLinear | FillElementIndex => {
                if self.options.unknown_opcode == UnknownOpcodePolicy::Reject {
                    return Err(DispatchError::InvalidOpcode { byte: opcode as u8, offset: 0 });
                }
            }
        }
        Ok(())
    }
}

/// Advances `pos` past a `define_*` block's body up to and including its
/// terminator, without executing any of it.
fn skip_block(bytecode: &[u8], pos: &mut usize, terminator: Opcode) -> Result<(), DispatchError> {
    loop {
        let instr = decode_next(bytecode, pos).map_err(map_decode_err)?;
        if instr.opcode == terminator {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pngine_gpu::{CallRecord, RecordingBackend};

    fn module_for(source: &str) -> Vec<u8> {
        pngine_assembler::compile(source).expect("compiles")
    }

    #[test]
    fn triangle_frame_produces_expected_call_log() {
        let source = r#"
            #wgsl s { value="@vertex fn vs() -> @builtin(position) vec4f { return vec4f(0); }" }
            #renderPipeline pp { layout=auto vertex={ entryPoint=vs module=s } }
            #renderPass draw { pipeline=pp draw=3 }
            #frame main { perform=[draw] }
        "#;
        let bytes = module_for(source);
        let module = Module::deserialize(&bytes).unwrap();
        let mut d = Dispatcher::new(RecordingBackend::new(), &module).unwrap();
        d.execute_all().unwrap();
        d.execute_frame("main", 0.0).unwrap();

        let calls = d.gpu().calls();
        let pipeline_id = match calls.iter().find_map(|c| match c {
            CallRecord::CreateRenderPipeline(id, _) => Some(*id),
            _ => None,
        }) {
            Some(id) => id,
            None => panic!("expected a CreateRenderPipeline call"),
        };

        let tail = &calls[calls.len() - 5..];
        assert_eq!(
            tail,
            &[
                CallRecord::BeginRenderPass,
                CallRecord::SetPipeline(pipeline_id),
                CallRecord::Draw(3, 1, 0, 0),
                CallRecord::EndPass,
                CallRecord::Submit,
            ]
        );
    }

    #[test]
    fn unknown_frame_name_is_reported() {
        let source = r#"
            #wgsl s { value="@vertex fn vs() -> @builtin(position) vec4f { return vec4f(0); }" }
            #renderPipeline pp { layout=auto vertex={ entryPoint=vs module=s } }
            #renderPass draw { pipeline=pp draw=3 }
            #frame main { perform=[draw] }
        "#;
        let bytes = module_for(source);
        let module = Module::deserialize(&bytes).unwrap();
        let mut d = Dispatcher::new(RecordingBackend::new(), &module).unwrap();
        d.execute_all().unwrap();
        let err = d.execute_frame("missing", 0.0).unwrap_err();
        assert!(matches!(err, DispatchError::FrameNotFound(name) if name == "missing"));
    }

    #[test]
    fn draw_outside_a_pass_is_a_pass_state_violation() {
        let source = r#"
            #buffer b { size=64 usage=[VERTEX] }
            #frame main { perform=[] }
        "#;
        let bytes = module_for(source);
        let module = Module::deserialize(&bytes).unwrap();
        let mut d = Dispatcher::new(RecordingBackend::new(), &module).unwrap();
        d.execute_all().unwrap();
        // Manually drive an out-of-pass draw to exercise the state machine,
        // since no legal PBSF program emits one.
        let err = d.execute(Opcode::Draw, &[3, 1, 0, 0]).unwrap_err();
        assert!(matches!(err, DispatchError::PassStateViolation(_)));
    }

    #[test]
    fn execute_animation_frame_dispatches_the_active_scenes_frame() {
        let source = r#"
            #wgsl s { value="@vertex fn vs() -> @builtin(position) vec4f { return vec4f(0); }" }
            #renderPipeline pp { layout=auto vertex={ entryPoint=vs module=s } }
            #renderPass draw { pipeline=pp draw=3 }
            #frame a { perform=[draw] }
            #frame b { perform=[draw] }
            #animation anim {
                loop=false
                scenes=[
                    { frame=a start=0 end=1000 }
                    { frame=b start=1000 end=2000 }
                ]
            }
        "#;
        let bytes = module_for(source);
        let module = Module::deserialize(&bytes).unwrap();
        let mut d = Dispatcher::new(RecordingBackend::new(), &module).unwrap();
        d.execute_all().unwrap();
        d.execute_animation_frame(1500).unwrap();
        assert_eq!(d.frame_count(), 1);

        let err = d.execute_animation_frame(5000).unwrap_err();
        assert!(matches!(err, DispatchError::NoActiveScene { now_ms: 5000 }));
    }

    #[test]
    fn reserved_opcode_is_skipped_by_default_and_rejected_when_configured() {
        let source = r#"
            #buffer b { size=64 usage=[VERTEX] }
            #frame main { perform=[] }
        "#;
        let bytes = module_for(source);
        let module = Module::deserialize(&bytes).unwrap();

        let mut skipping = Dispatcher::new(RecordingBackend::new(), &module).unwrap();
        skipping.execute_all().unwrap();
        skipping.execute(Opcode::FillLinear, &[0, 0, 0]).unwrap();

        let mut rejecting = Dispatcher::new_with_options(
            RecordingBackend::new(),
            &module,
            DispatcherOptions { unknown_opcode: UnknownOpcodePolicy::Reject },
        )
        .unwrap();
        rejecting.execute_all().unwrap();
        let err = rejecting.execute(Opcode::FillLinear, &[0, 0, 0]).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidOpcode { .. }));
    }
}
