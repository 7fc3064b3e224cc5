use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("undefined reference to `{name}` at byte {offset}")]
    UndefinedReference { offset: u32, name: String },
    #[error("`{name}` is defined more than once ({first_kind} and {second_kind})")]
    DuplicateDefinition { name: String, first_kind: &'static str, second_kind: &'static str, offset: u32 },
    #[error("circular dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },
    #[error("`{owner}` is missing required property `{property}`")]
    MissingRequiredProperty { owner: String, property: &'static str, offset: u32 },
    #[error("invalid value for `{context}` at byte {offset}: {reason}")]
    InvalidValue { context: String, reason: String, offset: u32 },
    #[error("type mismatch for `{context}` at byte {offset}: expected {expected}, found {found}")]
    TypeMismatch { context: String, expected: &'static str, found: &'static str, offset: u32 },
}
