use pngine_bytecode::{decode_next, Opcode};
use pngine_format::Module;

fn find_string_id(strings: &pngine_format::StringTable, text: &str) -> u16 {
    (0..strings.len() as u16).find(|&id| strings.get_str(id) == Some(text)).expect("string interned")
}

fn decode_all(bytecode: &[u8]) -> Vec<(Opcode, Vec<u64>)> {
    let mut pos = 0;
    let mut out = Vec::new();
    while pos < bytecode.len() {
        let instr = decode_next(bytecode, &mut pos).unwrap();
        out.push((instr.opcode, instr.params));
    }
    out
}

#[test]
fn triangle_emits_expected_bytecode_shape() {
    let src = r#"
        #wgsl s { value="@vertex fn vs() -> @builtin(position) vec4f { return vec4f(0); }" }
        #renderPipeline pp { layout=auto vertex={ entryPoint=vs module=s } }
        #renderPass draw { pipeline=pp draw=3 }
        #frame main { perform=[draw] }
    "#;
    let bytes = pngine_assembler::compile(src).unwrap();
    let module = Module::deserialize(&bytes).unwrap();
    let ops = decode_all(module.bytecode());

    assert_eq!(ops.iter().filter(|(op, _)| *op == Opcode::CreateShaderModule).count(), 1);
    assert_eq!(ops.iter().filter(|(op, _)| *op == Opcode::CreateRenderPipeline).count(), 1);

    let tags: Vec<Opcode> = ops.iter().map(|(op, _)| *op).collect();
    assert_eq!(
        tags,
        vec![
            Opcode::CreateShaderModule,
            Opcode::CreateRenderPipeline,
            Opcode::DefineFrame,
            Opcode::BeginRenderPass,
            Opcode::SetPipeline,
            Opcode::Draw,
            Opcode::EndPass,
            Opcode::Submit,
            Opcode::EndFrame,
        ]
    );

    let draw = ops.iter().find(|(op, _)| *op == Opcode::Draw).unwrap();
    assert_eq!(draw.1, vec![3, 1, 0, 0]);
}

#[test]
fn undefined_reference_fails_to_compile() {
    let src = "#renderPipeline pp { vertex={ module=missing } }";
    let err = pngine_assembler::compile(src).unwrap_err();
    assert!(matches!(err, pngine_assembler::CompileError::Analyze { .. }));
}

#[test]
fn import_cycle_fails_to_compile() {
    let src = r#"
        #wgsl a { imports=[b] value="" }
        #wgsl b { imports=[a] value="" }
    "#;
    let err = pngine_assembler::compile(src).unwrap_err();
    match err {
        pngine_assembler::CompileError::Analyze { first, .. } => {
            assert!(matches!(first, pngine_analyzer::AnalysisError::CircularDependency { .. }));
        }
        other => panic!("expected analyze error, got {other:?}"),
    }
}

#[test]
fn buffer_expression_size_is_folded_into_create_buffer() {
    let src = "#buffer b { size=(1+2)*3 usage=[UNIFORM] }";
    let bytes = pngine_assembler::compile(src).unwrap();
    let module = Module::deserialize(&bytes).unwrap();
    let ops = decode_all(module.bytecode());
    let create = ops.iter().find(|(op, _)| *op == Opcode::CreateBuffer).unwrap();
    assert_eq!(create.1[1], 9);
}

#[test]
fn wgsl_reflection_example_compiles() {
    let src = r#"
        #wgsl sh { value="@group(1) @binding(2) var<uniform> cam : mat4x4f;" }
        #buffer cb { size=64 usage=[uniform copy_dst] }
        #frame main { perform=[] writeBuffer=[{ buffer=cb data=sh.cam }] }
    "#;
    let bytes = pngine_assembler::compile(src).unwrap();
    let module = Module::deserialize(&bytes).unwrap();
    let ops = decode_all(module.bytecode());
    assert!(ops.iter().any(|(op, _)| *op == Opcode::WriteTimeUniform));
}

#[test]
fn wgsl_reflection_populates_the_uniform_table() {
    let src = r#"
        #wgsl sh { value="@group(1) @binding(2) var<uniform> cam : mat4x4f;" }
        #buffer cb { size=64 usage=[uniform copy_dst] }
        #frame main { perform=[] writeBuffer=[{ buffer=cb data=sh.cam }] }
    "#;
    let bytes = pngine_assembler::compile(src).unwrap();
    let module = Module::deserialize(&bytes).unwrap();
    let cam_id = find_string_id(&module.strings().unwrap(), "cam");
    let field = module.uniforms().unwrap().find_field_by_string_id(cam_id).expect("uniform table row for cam");
    assert_eq!(field.size, 64);
    assert_eq!(field.field_type, pngine_format::FieldType::Mat4x4F32);
}

#[test]
fn animation_scenes_populate_the_animation_table() {
    let src = r#"
        #frame a { perform=[] }
        #frame b { perform=[] }
        #animation anim {
            loop=true
            scenes=[
                { frame=a start=0 end=1000 }
                { frame=b start=1000 end=2500 }
            ]
        }
    "#;
    let bytes = pngine_assembler::compile(src).unwrap();
    let module = Module::deserialize(&bytes).unwrap();
    let animation = module.animation().unwrap();
    assert!(animation.is_looped());
    assert_eq!(animation.len(), 2);
    assert_eq!(animation.find_scene_at_time(1500), Some(1));

    let b_id = find_string_id(&module.strings().unwrap(), "b");
    let scene = animation.scene_at(1).unwrap();
    assert_eq!(scene.frame_string_id, b_id);
}

#[test]
fn duplicate_frame_names_are_rejected_by_analysis() {
    let src = r#"
        #frame main { perform=[] }
        #frame main { perform=[] }
    "#;
    let err = pngine_assembler::compile(src).unwrap_err();
    match err {
        pngine_assembler::CompileError::Analyze { first, .. } => {
            assert!(matches!(first, pngine_analyzer::AnalysisError::DuplicateDefinition { .. }));
        }
        other => panic!("expected analyze error, got {other:?}"),
    }
}
