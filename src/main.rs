use clap::Parser; // for cli
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use hourglyph::cache::ReplyCache;
use hourglyph::clock::SystemClock;
use hourglyph::completion::OpenRouterClient;
use hourglyph::config::Args;
use hourglyph::rate_limit::RateLimiter;
use hourglyph::state::AppState;
use hourglyph::store::{JsonFileStore, MemoryStore, ReplyStore, Retention};

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    let retention = Retention::from_max_entries(args.max_entries);
    let store: Arc<dyn ReplyStore> = if args.memory_cache {
        Arc::new(MemoryStore::new(retention))
    } else {
        Arc::new(JsonFileStore::new(&args.cache_file, retention))
    };
    store.load().await;

    let completer = OpenRouterClient::new(
        reqwest::Client::new(),
        &args.api_url,
        &args.model,
        args.api_key.clone(),
        Duration::from_secs(args.timeout_secs),
    );
    if !completer.has_api_key() {
        tracing::warn!("OPENROUTER_API_KEY not set; replies will carry an [ERROR] marker");
    }

    // creating shared state
    let state = Arc::new(AppState {
        cache: ReplyCache::new(Arc::clone(&store)),
        completer: Arc::new(completer),
        clock: Arc::new(SystemClock),
        epoch: args.epoch,
        rate_limiter: RateLimiter::new(args.rate_limit, Duration::from_secs(args.rate_window)),
    });

    let app = hourglyph::router(state, &args.static_dir);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(port = args.port, "hourglyph running on http://localhost:{}", args.port);
    tracing::info!(url = %args.api_url, model = %args.model, "completions endpoint");
    if args.memory_cache {
        tracing::info!(records = store.len().await, "reply cache in memory");
    } else {
        tracing::info!(path = %args.cache_file.display(), records = store.len().await, "reply cache file");
    }
    tracing::info!(
        "Rate limit: {} /generate requests per {} seconds",
        args.rate_limit,
        args.rate_window
    );

    axum::serve(listener, app).await?;
    Ok(())
}
