//! Facade crate tying together the PBSF → PNGB → bytecode pipeline (spec §2):
//! compile source with [`compile`], deserialize the result with
//! [`pngine_format::Module`], and drive it per frame with [`Dispatcher`]
//! against a [`GpuBackend`].
//!
//! This crate adds nothing beyond re-exports, [`PngineError`], and
//! [`load_module_bytes`] (the ZIP-envelope unwrap spec §6 describes); all
//! the real work happens in the `pngine-*` crates it wires together.

mod errors;

pub use errors::PngineError;

pub use pngine_analyzer::{AnalysisError, AnalysisResult, Namespace};
pub use pngine_assembler::{compile, compile_and_load, CompileError};
pub use pngine_bytecode::{decode_next, DecodeError, Instruction, Opcode};
pub use pngine_dispatcher::{DispatchError, Dispatcher, DispatcherOptions, PassState, UnknownOpcodePolicy};
pub use pngine_format::{get_scene_time, AnimationTable, FormatError, Module, ModuleParts, Scene, SceneTime};
pub use pngine_gpu::{CallRecord, GpuBackend, GpuError, IndexFormat, RecordingBackend, ResourceId};
pub use pngine_zip::{looks_like_zip, Method as ZipMethod, ZipArchive, ZipEntry, ZipError, ZipWriter};

/// Unwraps a PNGB module from its optional ZIP envelope (spec §6 "ZIP
/// envelope"): if `bytes` starts with the ZIP local-file signature, extracts
/// and returns `main.pngb`'s bytes; otherwise returns `bytes` unchanged.
pub fn load_module_bytes(bytes: &[u8]) -> Result<Vec<u8>, PngineError> {
    if !pngine_zip::looks_like_zip(bytes) {
        return Ok(bytes.to_vec());
    }
    let archive = ZipArchive::parse(bytes)?;
    Ok(archive.extract("main.pngb")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_scenario_compiles_and_dispatches_in_order() {
        let source = r#"
            #wgsl s { value="@vertex fn vs() -> @builtin(position) vec4f { return vec4f(0); }" }
            #renderPipeline pp { layout=auto vertex={ entryPoint=vs module=s } }
            #renderPass draw { pipeline=pp draw=3 }
            #frame main { perform=[draw] }
        "#;
        let bytes = compile(source).unwrap();
        let module = Module::deserialize(&bytes).unwrap();

        let mut dispatcher = Dispatcher::new(RecordingBackend::new(), &module).unwrap();
        dispatcher.execute_all().unwrap();
        dispatcher.execute_frame("main", 0.0).unwrap();

        let calls = dispatcher.gpu().calls();
        assert_eq!(calls.iter().filter(|c| matches!(c, CallRecord::CreateShaderModule(_))).count(), 1);
        assert_eq!(calls.iter().filter(|c| matches!(c, CallRecord::CreateRenderPipeline(..))).count(), 1);
        let tail = &calls[calls.len() - 5..];
        assert!(matches!(tail[0], CallRecord::BeginRenderPass));
        assert!(matches!(tail[1], CallRecord::SetPipeline(_)));
        assert_eq!(tail[2], CallRecord::Draw(3, 1, 0, 0));
        assert!(matches!(tail[3], CallRecord::EndPass));
        assert!(matches!(tail[4], CallRecord::Submit));
    }

    #[test]
    fn reference_error_scenario_yields_one_undefined_reference() {
        let source = "#renderPipeline pp { vertex={ module=missing } }";
        let err = compile(source).unwrap_err();
        match err {
            CompileError::Analyze { first, all } => {
                assert_eq!(all.len(), 1);
                assert!(matches!(first, AnalysisError::UndefinedReference { .. }));
            }
            other => panic!("expected an analysis error, got {other:?}"),
        }
    }

    #[test]
    fn cycle_scenario_reports_circular_dependency() {
        let source = r#"
            #wgsl a { imports=[b] value="" }
            #wgsl b { imports=[a] value="" }
        "#;
        let err = compile(source).unwrap_err();
        match err {
            CompileError::Analyze { first, .. } => assert!(matches!(first, AnalysisError::CircularDependency { .. })),
            other => panic!("expected an analysis error, got {other:?}"),
        }
    }

    #[test]
    fn expression_scenario_folds_constant_and_reports_division_by_zero_as_none() {
        let source = "#buffer b { size=(1+2)*3 usage=[UNIFORM] }";
        let bytes = compile(source).unwrap();
        let module = Module::deserialize(&bytes).unwrap();
        let mut pos = 0;
        let mut found = None;
        while pos < module.bytecode().len() {
            let instr = decode_next(module.bytecode(), &mut pos).unwrap();
            if instr.opcode == Opcode::CreateBuffer {
                found = Some(instr.params[1]);
            }
        }
        assert_eq!(found, Some(9));
    }

    #[test]
    fn wgsl_reflection_scenario_produces_a_time_uniform_write() {
        let source = r#"
            #wgsl sh { value="@group(1) @binding(2) var<uniform> cam : mat4x4f;" }
            #buffer cb { size=64 usage=[uniform copy_dst] }
            #frame main { perform=[] writeBuffer=[{ buffer=cb data=sh.cam }] }
        "#;
        let bytes = compile(source).unwrap();
        let module = Module::deserialize(&bytes).unwrap();
        let mut pos = 0;
        let mut saw_write_time_uniform = false;
        while pos < module.bytecode().len() {
            let instr = decode_next(module.bytecode(), &mut pos).unwrap();
            saw_write_time_uniform |= instr.opcode == Opcode::WriteTimeUniform;
        }
        assert!(saw_write_time_uniform);
    }

    #[test]
    fn zip_round_trip_scenario_detects_single_byte_corruption() {
        let mut writer = ZipWriter::new();
        writer.add_entry("main.pngb", ZipMethod::Deflate, b"a compiled module's bytes go here").unwrap();
        writer.add_entry("assets/x", ZipMethod::Deflate, &[0, 1, 2, 3]).unwrap();
        let mut bytes = writer.finish();

        let archive = ZipArchive::parse(&bytes).unwrap();
        assert_eq!(archive.extract("main.pngb").unwrap(), b"a compiled module's bytes go here");
        assert_eq!(archive.extract("assets/x").unwrap(), vec![0, 1, 2, 3]);

        let corrupt_at = 30 + "main.pngb".len() + 2;
        bytes[corrupt_at] ^= 0xFF;
        let corrupted = ZipArchive::parse(&bytes).unwrap();
        let err = corrupted.extract("main.pngb").unwrap_err();
        assert!(matches!(err, ZipError::InvalidCrc { .. }) || matches!(err, ZipError::Truncated));
    }

    #[test]
    fn load_module_bytes_passes_through_non_zip_pngb() {
        let source = "#buffer b { size=4 usage=[UNIFORM] }";
        let bytes = compile(source).unwrap();
        assert_eq!(load_module_bytes(&bytes).unwrap(), bytes);
    }

    #[test]
    fn load_module_bytes_unwraps_a_zip_envelope() {
        let source = "#buffer b { size=4 usage=[UNIFORM] }";
        let module_bytes = compile(source).unwrap();
        let mut writer = ZipWriter::new();
        writer.add_entry("main.pngb", ZipMethod::Store, &module_bytes).unwrap();
        let zip_bytes = writer.finish();

        let unwrapped = load_module_bytes(&zip_bytes).unwrap();
        assert_eq!(unwrapped, module_bytes);
    }
}
