use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid opcode byte {byte} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },
    #[error("truncated bytecode at offset {offset}")]
    TruncatedBytecode { offset: usize },
    #[error("frame `{0}` not found")]
    FrameNotFound(String),
    #[error("no animation scene is active at {now_ms}ms")]
    NoActiveScene { now_ms: u64 },
    #[error("pass state violation: {0}")]
    PassStateViolation(&'static str),
    #[error(transparent)]
    Backend(#[from] pngine_gpu::GpuError),
    #[error(transparent)]
    Format(#[from] pngine_format::FormatError),
}

pub(crate) fn map_decode_err(err: pngine_bytecode::DecodeError) -> DispatchError {
    match err {
        pngine_bytecode::DecodeError::InvalidOpcode { byte, offset } => DispatchError::InvalidOpcode { byte, offset },
        pngine_bytecode::DecodeError::Truncated(inner) => {
            let offset = match inner {
                pngine_bytecode::VarintError::Truncated { offset } => offset,
                pngine_bytecode::VarintError::Overflow { offset } => offset,
            };
            DispatchError::TruncatedBytecode { offset }
        }
    }
}
