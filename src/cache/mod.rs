//! Rendered-output cache.
//!
//! Every successful rendering is persisted as one file per cache key below a
//! configured base directory, so the daemon can serve the last good output
//! when a generator fails or returns nothing. Entries never expire.
//!
//! ```toml
//! [cache]
//! directory = "/var/cache/confgend"
//! ```

pub(crate) mod lock;
mod store;

pub use store::FileCache;
