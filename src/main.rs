use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use profilebot::api::BinanceFuturesClient;
use profilebot::config::Config;
use profilebot::scheduler::Scheduler;
use profilebot::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let config = Config::from_env();
    config.validate()?;

    tracing::info!("profilebot starting");
    tracing::info!("  Symbols: {}", config.symbols.join(", "));
    tracing::info!("  Interval: {} (poll every {}ms)", config.interval, config.poll_interval_ms);
    tracing::info!(
        "  Profile: {} bins, FVA target {:.0}%",
        config.price_bins,
        config.fva_target_pct * 100.0
    );
    tracing::info!(
        "  Sizing: {} USDT at {}x, risk {:.2}% / reward x{}",
        config.usdt_budget,
        config.leverage,
        config.risk_pct * 100.0,
        config.reward_multiplier
    );
    tracing::info!(
        "  Venue: Binance futures ({})",
        if config.use_testnet { "testnet" } else { "mainnet" }
    );

    let exchange = Arc::new(BinanceFuturesClient::new(
        config.api_key.clone(),
        config.api_secret.clone(),
        config.use_testnet,
    ));

    let health_task = tokio::spawn(serve_health(config.http_port));

    let scheduler = Scheduler::new(exchange, config);
    let scheduler_task = tokio::spawn(scheduler.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        result = health_task => {
            tracing::error!("Health server exited: {:?}", result);
        }
        result = scheduler_task => {
            tracing::error!("Scheduler exited: {:?}", result);
        }
    }

    tracing::info!("profilebot stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profilebot=info".into()),
        )
        .init();
}

/// Simple liveness endpoint
async fn serve_health(port: u16) -> Result<()> {
    let app = Router::new().route("/health", get(health));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}
