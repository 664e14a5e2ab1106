//! Value cache used by the loaders.
//!
//! Payloads are the already-shaped JSON responses, addressed by
//! `(family, scope, fingerprint)`. Capacity is configured per family via the
//! `[cache]` section:
//!
//! ```toml
//! [cache]
//! categories_limit = 1024
//! sections_limit = 1024
//! articles_limit = 1024
//! ticket_limit = 256
//! ```

mod config;
mod keys;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheFamily, CacheKey, CacheScope};
pub use store::LruValueCache;
