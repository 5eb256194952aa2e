//! Perf Cache demo
//!
//! Runs the cache, query and rate-limiting utilities against a simulated
//! flaky API and prints the resulting statistics as JSON.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perf_cache::query::CachedApi;
use perf_cache::timing::{debounce, throttle};
use perf_cache::{CacheContext, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perf_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: storage={}, ttl={}ms, max_size={}, retry_attempts={}",
        config.storage, config.ttl_ms, config.max_size, config.retry_attempts
    );

    let context = CacheContext::from_config(&config).context("failed to build cache context")?;

    // Fails once, then answers
    let api_calls = Arc::new(AtomicU32::new(0));
    let counter = api_calls.clone();
    let courses = CachedApi::new(
        "courses",
        context.api.clone(),
        move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if call == 1 {
                    Err("503 Service Unavailable")
                } else {
                    Ok(json!([
                        { "id": 1, "title": "Ownership" },
                        { "id": 2, "title": "Lifetimes" }
                    ]))
                }
            }
        },
        context.retry_policy(),
    );

    let first = courses.load().await;
    let second = courses.load().await;
    info!(
        from_cache = second.is_from_cache,
        api_calls = api_calls.load(Ordering::SeqCst),
        "Courses loaded"
    );

    // Three concurrent profile requests, one producer call
    let profiles = context.api_memo::<Value>("profiles_");
    let profile_calls = Arc::new(AtomicU32::new(0));
    let loader = {
        let calls = profile_calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(json!({ "name": "Ada" })) }
        }
    };
    let (a, b, c) = tokio::join!(
        profiles.fetch("me", loader.clone()),
        profiles.fetch("me", loader.clone()),
        profiles.fetch("me", loader),
    );
    a?;
    b?;
    c?;

    let searches = Arc::new(AtomicU32::new(0));
    let search_counter = searches.clone();
    let search = debounce(
        move |query: String| {
            search_counter.fetch_add(1, Ordering::SeqCst);
            info!(query = %query, "Search fired");
        },
        Duration::from_millis(50),
        false,
    );
    for query in ["r", "ru", "rus", "rust"] {
        search.call(query.to_string());
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let checkout = throttle(|_: ()| info!("Checkout session created"), Duration::from_secs(1));
    let accepted = (0..5).filter(|_| checkout.call(())).count();

    let report = json!({
        "courses": {
            "first_error": first.error.map(|e| e.to_string()),
            "second_from_cache": second.is_from_cache,
        },
        "api_calls": api_calls.load(Ordering::SeqCst),
        "profile_calls": profile_calls.load(Ordering::SeqCst),
        "search_calls": searches.load(Ordering::SeqCst),
        "checkout_calls": accepted,
        "api_cache": context.api.read().await.get_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
