use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] pngine_parser::ParseError),
    #[error("analysis failed with {} error(s): {first}", .all.len())]
    Analyze { first: pngine_analyzer::AnalysisError, all: Vec<pngine_analyzer::AnalysisError> },
    #[error(transparent)]
    Intern(#[from] pngine_intern::InternError),
}
