// Parish Ledger - REST Server
// Serves the mock backend over HTTP under /api

use anyhow::{Context, Result};
use parish_ledger::config::init_tracing;
use parish_ledger::{http, Config, MockApi};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::load()?;

    println!("🌐 Parish Ledger - REST Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let api = Arc::new(MockApi::from_config(&config.api));
    println!(
        "✓ Mock backend ready ({}, latency {}-{} ms)",
        if config.api.seed { "seeded" } else { "empty" },
        config.api.latency_min_ms,
        config.api.latency_max_ms
    );

    // Build main router
    let app = axum::Router::new()
        .nest("/api", http::router(api))
        .layer(CorsLayer::permissive());

    // Start server
    let addr = config.server.addr.as_str();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    info!(%addr, "listening");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/foranes", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
