//! Cache layer with explicit TTLs and no cross-key transactions.
//!
//! The store offers exactly three operations: get, set-with-TTL and delete.
//! Nothing here locks across a call to the store, so concurrent fills of the
//! same key race and the last writer wins. Callers are written to tolerate
//! that: every value they store for a key is either identical or newer.
//!
//! # Example
//!
//! ```ignore
//! let store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new(clock));
//! set_json(store.as_ref(), "k", &value, Some(Duration::from_secs(10))).await?;
//! let back: Option<Value> = get_json(store.as_ref(), "k").await?;
//! ```

pub mod memo;
pub mod memory;
pub mod read;
pub mod traits;

pub use memo::BoundedMemo;
pub use memory::InMemoryCacheStore;
pub use read::{CacheRead, Stamped};
pub use traits::{get_json, set_json, CacheStats, CacheStore};
