//! SharedHelp Storage - Cache Store Abstraction
//!
//! The key-value store every cache in the workspace sits on, plus the
//! bounded per-process memo used for hot display decisions. The production
//! store (memcached or similar) is an external collaborator; this crate
//! defines its interface and ships an in-memory implementation.

pub mod cache;

pub use cache::{
    get_json, set_json, BoundedMemo, CacheRead, CacheStats, CacheStore, InMemoryCacheStore, Stamped,
};
