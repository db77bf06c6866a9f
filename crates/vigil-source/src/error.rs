/// Errors surfaced by a metric source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("query failed: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;
