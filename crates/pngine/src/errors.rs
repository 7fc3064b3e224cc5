use thiserror::Error;

/// Top-level error type for the facade: every sub-crate's error folds into
/// one of these variants so callers match on a single enum (spec §7).
#[derive(Debug, Error)]
pub enum PngineError {
    #[error(transparent)]
    Compile(#[from] pngine_assembler::CompileError),
    #[error(transparent)]
    Format(#[from] pngine_format::FormatError),
    #[error(transparent)]
    Dispatch(#[from] pngine_dispatcher::DispatchError),
    #[error(transparent)]
    Zip(#[from] pngine_zip::ZipError),
}
