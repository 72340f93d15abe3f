mod api;
mod config;
mod handlers;
mod models;
mod services;

#[cfg(feature = "http-server")]
use api::server::create_router;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use config::AppConfig;
use handlers::MealLogHandler;
use services::credentials::{load_service_account, materialize_service_account};
use services::{ChatModel, GoogleSheetsLog, MealLog, NutritionEstimator, OpenAiClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    log::info!("🚀 Starting Nutrition Tracking API...");

    let config = AppConfig::from_env()?;

    // Credentials are materialized once, before the sheet can be reached
    materialize_service_account(
        config.service_account_json.as_deref(),
        &config.service_account_file,
    )?;
    let service_account = load_service_account(&config.service_account_file)?;

    let sheet_log: Arc<dyn MealLog> = Arc::new(GoogleSheetsLog::new(
        service_account,
        config.spreadsheet_id.clone(),
        config.sheet_name.clone(),
    )?);
    log::info!("✅ Google Sheets log initialized (tab: {})", config.sheet_name);

    let model: Arc<dyn ChatModel> = Arc::new(OpenAiClient::with_base_url(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    ));
    log::info!("✅ OpenAI client initialized");

    let meal_handler = Arc::new(MealLogHandler::new(NutritionEstimator::new(model), sheet_log));
    log::info!("✅ Meal log handler initialized");

    #[cfg(feature = "http-server")]
    {
        let addr = config.bind_addr();
        let app = create_router(meal_handler);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        log::info!("🌐 HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")?;
    }

    #[cfg(not(feature = "http-server"))]
    {
        let _ = meal_handler;
        log::warn!("⚠️ Built without http-server feature, nothing to serve");
        tokio::signal::ctrl_c().await?;
    }

    log::info!("🛑 Shutting down...");
    Ok(())
}

#[cfg(feature = "http-server")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
}
