//! TTL-scoped resource cache
//!
//! A pure keyed store sitting in front of remote collections that are
//! expensive to refetch. Entries carry the instant they were written and are
//! only served while younger than the cache's time-to-live.
//!
//! The cache never performs I/O and knows nothing about key structure. Callers
//! compose keys that include their selection scope (owner, repo, path, ref)
//! so unrelated selections never collide.
//!
//! # Example
//!
//! ```rust
//! use gh_explorer_cache::ResourceCache;
//! use std::time::Duration;
//!
//! let mut cache: ResourceCache<Vec<String>> = ResourceCache::new(Duration::from_secs(60));
//! cache.set("branches:acme/widgets", vec!["main".to_string()]);
//! assert_eq!(cache.get("branches:acme/widgets").map(Vec::len), Some(1));
//!
//! cache.invalidate(Some("branches:acme/widgets"));
//! assert!(cache.get("branches:acme/widgets").is_none());
//! ```

pub mod mode;
pub mod resource_cache;

pub use mode::CacheMode;
pub use resource_cache::{CacheStats, ResourceCache, DEFAULT_TTL};
