// Cache key construction.
// Maps a request URL onto the namespaced keys used in the shared keyspace.

use std::fmt;

const RESULT_PREFIX: &str = "result:";
const COUNT_PREFIX: &str = "count:";

/// Identity of a cacheable request: the raw request URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shared-store key holding the cached payload.
    pub fn result_key(&self) -> String {
        format!("{}{}", RESULT_PREFIX, self.0)
    }

    /// Shared-store key holding the request counter.
    pub fn count_key(&self) -> String {
        format!("{}{}", COUNT_PREFIX, self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for CacheKey {
    fn from(url: String) -> Self {
        Self(url)
    }
}
