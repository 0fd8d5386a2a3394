// Fetch capability.
// The slow operation being memoized, and an HTTP implementation of it.

pub mod client;

pub use client::HttpFetcher;

use std::future::Future;

use crate::error::Result;

/// Something that turns a URL into a text payload.
///
/// Implementations are called at most once per cache miss; any error they
/// return reaches the caller of `MemoizingFetcher::fetch` unchanged.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}
