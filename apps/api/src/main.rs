mod analysis;
mod config;
mod document;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod throttle;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::pipeline::AnalysisPipeline;
use crate::config::Config;
use crate::document::poppler::PdftoppmRasterizer;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::throttle::CallThrottle;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing GOOGLE_API_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Rasterizer (poppler)
    let rasterizer = PdftoppmRasterizer::new(
        &config.pdftoppm_path,
        config.raster_dpi,
        config.jpeg_quality,
    );
    info!(
        "Rasterizer: {} at {} dpi, JPEG quality {}",
        config.pdftoppm_path, config.raster_dpi, config.jpeg_quality
    );

    // LLM client
    let llm = LlmClient::new(config.llm_settings()).context("Failed to build HTTP client")?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm.model(),
        config.inference_timeout_secs
    );

    // Outbound call throttle
    let throttle_config = config.throttle_config()?;
    info!(
        "Call throttle: {} calls per {}s",
        throttle_config.max_calls(),
        throttle_config.window().as_secs()
    );

    let pipeline = AnalysisPipeline::new(
        Arc::new(rasterizer),
        Arc::new(llm),
        Arc::new(CallThrottle::new(throttle_config)),
    );

    let state = AppState {
        pipeline,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
