use pngine_bytecode::{decode_next, Emitter, Opcode};
use proptest::prelude::*;

const ALL_OPCODES: &[Opcode] = &[
    Opcode::Nop,
    Opcode::CreateBuffer,
    Opcode::BeginRenderPass,
    Opcode::SetBindGroup,
    Opcode::Draw,
    Opcode::DrawIndexed,
    Opcode::Dispatch,
    Opcode::EndPass,
    Opcode::WriteBuffer,
    Opcode::Submit,
    Opcode::DefineFrame,
    Opcode::EndFrame,
    Opcode::FillConstant,
    Opcode::WriteTimeUniform,
];

proptest! {
    /// Testable property #3: a decoder using the static parameter-length
    /// table consumes every byte of an emitted stream and reaches the end
    /// exactly, with no overruns or leftover bytes.
    #[test]
    fn decoder_consumes_emitted_stream_exactly(indices in proptest::collection::vec(0usize..ALL_OPCODES.len(), 0..64)) {
        let mut emitter = Emitter::new();
        for &idx in &indices {
            let op = ALL_OPCODES[idx];
            let params: Vec<u64> = (0..op.param_count()).map(|i| i as u64 * 17).collect();
            emitter.emit(op, &params);
        }
        let bytes = emitter.into_bytes();

        let mut pos = 0;
        let mut decoded = 0;
        while pos < bytes.len() {
            decode_next(&bytes, &mut pos).unwrap();
            decoded += 1;
        }
        prop_assert_eq!(pos, bytes.len());
        prop_assert_eq!(decoded, indices.len());
    }
}
