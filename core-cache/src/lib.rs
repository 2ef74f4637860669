//! # Catalog Cache Module
//!
//! Bounded, recency-ordered caching primitives for the catalog core.
//!
//! ## Overview
//!
//! This crate provides the storage building blocks the lookup layer is
//! built on:
//! - Structured entity keys (`scheme:type:id`) with kind dispatch
//! - A bounded LRU cache with negative-entry support
//! - An optional filesystem-backed overlay with corruption recovery
//! - A normalized, order-independent search memoization key
//!
//! None of these types are thread-safe; each cache instance has a single
//! logical owner and callers must serialize access externally.

pub mod bounded;
pub mod error;
pub mod key;
pub mod search;
pub mod store;

pub use bounded::{BoundedCache, Lookup, DEFAULT_MAX_SIZE};
pub use error::{CacheError, Result};
pub use key::{EntityKey, EntityKind, SCHEME};
pub use search::{SearchCache, SearchKey, SearchQuery};
pub use store::PersistentStore;
