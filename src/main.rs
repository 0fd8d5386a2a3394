// Demonstration driver.
// Fetches each URL twice and reports timing, cache behaviour, and request counts.

use std::time::Instant;

use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use memofetch::{CacheBackend, Config, HttpFetcher, MemoizingFetcher, Result};

const DEFAULT_URLS: &[&str] = &["https://httpbin.org/delay/2", "https://httpbin.org/delay/1"];

/// Outcome for one URL.
#[derive(Debug, Serialize)]
struct Report {
    url: String,
    first_ms: u128,
    second_ms: u128,
    bytes: usize,
    identical: bool,
    requests: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "memofetch=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let backend = CacheBackend::connect(&config.redis).await;
    let fetcher = HttpFetcher::new(&config.http)?;
    let memo = MemoizingFetcher::new(backend, fetcher).with_ttl(config.ttl())?;

    println!("Cache backend: {}", memo.backend().kind());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let urls: Vec<String> = if args.is_empty() {
        DEFAULT_URLS.iter().map(|u| u.to_string()).collect()
    } else {
        args
    };

    let mut reports = Vec::new();
    for url in &urls {
        match demo(&memo, url).await {
            Ok(report) => reports.push(report),
            Err(e) => eprintln!("   Error: {}", e),
        }
    }

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("\n{}", json),
        Err(e) => eprintln!("Could not render summary: {}", e),
    }

    Ok(())
}

async fn demo(memo: &MemoizingFetcher<HttpFetcher>, url: &str) -> Result<Report> {
    println!("\nTesting URL: {}", url);

    println!("1. First request:");
    let started = Instant::now();
    let first = memo.fetch(url).await?;
    let first_ms = started.elapsed().as_millis();
    println!("   Time taken: {} ms, {} characters", first_ms, first.len());

    println!("2. Second request (served from cache if within TTL):");
    let started = Instant::now();
    let second = memo.fetch(url).await?;
    let second_ms = started.elapsed().as_millis();
    println!("   Time taken: {} ms, {} characters", second_ms, second.len());

    let identical = first == second;
    if identical {
        println!("   Responses are identical");
    } else {
        println!("   Responses differ");
    }

    Ok(Report {
        url: url.to_string(),
        first_ms,
        second_ms,
        bytes: first.len(),
        identical,
        requests: memo.request_count(url).await?,
    })
}
