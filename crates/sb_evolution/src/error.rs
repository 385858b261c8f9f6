//! Error taxonomy for category evolution.

pub type Result<T> = std::result::Result<T, EvolutionError>;

#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("invalid evolution config: {0}")]
    InvalidConfig(String),

    #[error("unknown top-level category: {0}")]
    UnknownCategory(String),
}
