//! Folio collection cache
//!
//! Keeps one in-memory snapshot per public collection (settings, experiences,
//! certifications, projects, posts) in front of the database:
//!
//! - Reads are served from memory while the snapshot is younger than the
//!   freshness window and non-empty; otherwise they go to the store.
//! - Writes go to the store first and only invalidate on success.
//! - `preload` warms every collection concurrently at start-up.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! freshness_window_seconds = 300
//! preload_on_startup = true
//! ```

mod config;
mod entry;
mod lock;
pub mod shape;
mod store;

pub use config::CacheConfig;
pub use entry::{CacheEntry, EntrySnapshot, EntryState, Payload};
pub use shape::DecodeError;
pub use store::{CacheError, CollectionCache, PreloadReport};
