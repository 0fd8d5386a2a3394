// memofetch: memoize slow URL fetches behind a TTL cache.
// Uses a shared Redis store when reachable at startup, an in-process store otherwise.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod memo;

pub use cache::{CacheBackend, CacheKey, LocalStore, SharedStore};
pub use config::Config;
pub use error::{MemoError, Result};
pub use fetch::{Fetch, HttpFetcher};
pub use memo::{DEFAULT_TTL, MIN_TTL, MemoizingFetcher};
