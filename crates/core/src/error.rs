#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("missing key `{field}` on item at index {index}")]
    MissingKey { field: String, index: usize },
    #[error("duplicate comment id: {id}")]
    DuplicateId { id: String },
    #[error("comment {id} is unreachable from any root (parent cycle)")]
    CycleDetected { id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("translation error: {0}")]
    Translation(String),
    #[error("failed to read comment snapshot: {0}")]
    FileRead(std::io::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
