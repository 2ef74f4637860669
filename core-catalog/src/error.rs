use crate::session::SessionError;
use core_cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
