use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid choice index {index}: scenario offers {available} choices")]
    InvalidChoice { index: usize, available: usize },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
