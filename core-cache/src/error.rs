use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid entity key: {0}")]
    InvalidKey(String),

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
