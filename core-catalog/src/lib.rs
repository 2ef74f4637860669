//! # Catalog Lookup Module
//!
//! Resolves heterogeneous, type-tagged uris into catalog entities while
//! minimizing round trips to the remote catalog service.
//!
//! ## Overview
//!
//! This crate layers the domain on top of `core-cache`:
//! - Entity models and the opaque remote session trait
//! - Typed entity caches, one per entity kind, with playlist staleness
//!   detection
//! - `LibraryService`: batch lookup, image resolution and memoized
//!   search with batched cache commits
//! - `PlaylistsService`: playlist listing and wholesale refresh driven
//!   by upstream diffing
//!
//! Each service is an isolated sequential worker: one logical owner per
//! instance, blocking calls, no internal locking.

pub mod caches;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod playlists;
pub mod session;

pub use caches::{EntityCaches, PlaylistCache};
pub use config::CacheConfig;
pub use error::{CatalogError, Result};
pub use library::LibraryService;
pub use playlists::PlaylistsService;
pub use session::{CatalogSession, SessionError, SessionResult};
