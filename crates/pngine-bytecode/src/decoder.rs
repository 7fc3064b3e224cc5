use thiserror::Error;

use crate::opcode::Opcode;
use crate::varint::{read_varint, VarintError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub params: Vec<u64>,
    /// Byte offset of the opcode byte itself, for diagnostics.
    pub offset: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid opcode byte {byte} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },
    #[error("truncated bytecode: {0}")]
    Truncated(#[from] VarintError),
}

/// Reads one instruction at `bytes[*pos]`, advancing `*pos` past it.
/// Unknown opcode bytes are a hard error; opcodes the dispatcher does not
/// interpret (reserved/`nop`) still decode successfully here, since their
/// param count is statically known — forward-skipping is the dispatcher's
/// concern, not the decoder's.
pub fn decode_next(bytes: &[u8], pos: &mut usize) -> Result<Instruction, DecodeError> {
    let offset = *pos;
    let byte = *bytes.get(offset).ok_or(VarintError::Truncated { offset })?;
    let opcode = Opcode::from_u8(byte).ok_or(DecodeError::InvalidOpcode { byte, offset })?;
    *pos += 1;
    let mut params = Vec::with_capacity(opcode.param_count() as usize);
    for _ in 0..opcode.param_count() {
        params.push(read_varint(bytes, pos)?);
    }
    Ok(Instruction { opcode, params, offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::Emitter;

    #[test]
    fn decodes_entire_stream_with_no_leftover_bytes() {
        let mut e = Emitter::new();
        e.emit(Opcode::Submit, &[]);
        e.emit(Opcode::Dispatch, &[1, 2, 3]);
        let bytes = e.into_bytes();

        let mut pos = 0;
        let mut count = 0;
        while pos < bytes.len() {
            decode_next(&bytes, &mut pos).unwrap();
            count += 1;
        }
        assert_eq!(count, 2);
        assert_eq!(pos, bytes.len());
    }

    #[test]
    fn invalid_opcode_byte_errors() {
        let mut pos = 0;
        let err = decode_next(&[250], &mut pos).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidOpcode { byte: 250, offset: 0 }));
    }
}
