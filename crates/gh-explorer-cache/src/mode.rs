//! Cache mode definitions
//!
//! Controls how a fetch interacts with the cache layer. Chosen per call:
//! a forced refresh skips reads but still writes the fresh response.

/// Cache behavior mode for a single fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// No caching - neither read nor write
    None,

    /// Write-only - skip cache reads, but write responses to cache
    /// Use for "force refresh" to get fresh data while populating cache
    WriteOnly,

    /// Read-only - read from cache, but don't update it
    ReadOnly,

    /// Full caching - read from cache, write to cache
    #[default]
    ReadWrite,
}

impl CacheMode {
    /// Mode for a fetch that may or may not bypass cached data
    pub fn for_refresh(force_refresh: bool) -> Self {
        if force_refresh {
            CacheMode::WriteOnly
        } else {
            CacheMode::ReadWrite
        }
    }

    /// Should we attempt to read from cache before making the remote call?
    pub fn should_read(&self) -> bool {
        matches!(self, CacheMode::ReadOnly | CacheMode::ReadWrite)
    }

    /// Should we write remote responses to cache?
    pub fn should_write(&self) -> bool {
        matches!(self, CacheMode::WriteOnly | CacheMode::ReadWrite)
    }
}
