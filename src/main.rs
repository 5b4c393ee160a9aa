//! Snap Solve relay binary

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use snapsolve_relay::{config::Args, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("snapsolve_relay={},info", args.log_level).into());
    let fmt_layer = if args.json_logs() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    if let Err(e) = args.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    let allow_list = args.extension_allow_list();

    info!("======================================");
    info!("  Snap Solve Relay v{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_COMMIT_SHORT"));
    info!("  Built {}", env!("BUILD_TIMESTAMP"));
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode() { "DEVELOPMENT" } else { "PRODUCTION" });
    if args.memory_store {
        info!("Storage: in-memory (records are lost on exit)");
    } else {
        info!("Storage: MongoDB database '{}' (connects on first use)", args.mongodb_db);
    }
    info!("Vision upstream: {}", args.openrouter_url);
    info!(
        "Vision API key: {}",
        if args.vision_api_key().is_some() { "configured" } else { "MISSING" }
    );
    info!("Allowed extensions: {}", allow_list.len());
    info!("======================================");

    if args.vision_api_key().is_none() {
        warn!("OPENROUTER_API_KEY is not set; every /api/proxy request will fail with 500");
    }
    if !args.proxy_require_extension_id {
        warn!("Proxy client check disabled; /api/proxy accepts requests from any caller");
    }
    if allow_list.is_empty() && !args.dev_mode() {
        warn!("ALLOWED_EXTENSION_IDS is empty; every verification will be rejected");
    }

    let state = Arc::new(server::AppState::new(args));

    let result = server::run(Arc::clone(&state)).await;
    state.shutdown().await;

    if let Err(e) = result {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    info!("Relay stopped");
    Ok(())
}
