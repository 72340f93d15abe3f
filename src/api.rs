use serde_json::{json, Value};
use std::sync::Arc;

use crate::handlers::{LogMealError, MealLogHandler};
use crate::models::{ErrorBody, LogMealRequest, LogMealResponse};

/// Descriptive payload served at the root path
pub fn service_description() -> Value {
    json!({
        "message": "Nutrition Tracking API",
        "endpoints": {
            "/log-meal": "POST - Log a meal and get nutrition info",
            "/health": "GET - Health check"
        }
    })
}

pub const BODY_NOT_OBJECT: &str = "Request body must be a JSON object";

/// Decode a `/log-meal` body; anything other than a JSON object is rejected
pub fn decode_request(body: &str) -> Result<LogMealRequest, LogMealError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| LogMealError::Validation(format!("Invalid JSON body: {}", e)))?;

    if !value.is_object() {
        return Err(LogMealError::Validation(BODY_NOT_OBJECT.to_string()));
    }

    serde_json::from_value(value)
        .map_err(|e| LogMealError::Validation(format!("Invalid JSON body: {}", e)))
}

/// Run a raw `/log-meal` body through the handler.
///
/// Returns the status code and the JSON payload to send back.
pub async fn process_log_meal(handler: Arc<MealLogHandler>, body: &str) -> (u16, Value) {
    let result = match decode_request(body) {
        Ok(request) => handler.log_meal(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(reply) => (200, json!(LogMealResponse { reply })),
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                log::error!("❌ Failed to log meal: {}", e);
            }
            (status, json!(ErrorBody { error: e.to_string() }))
        }
    }
}

// Axum integration
#[cfg(feature = "http-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::State,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };

    pub struct AppState {
        pub meal_handler: Arc<MealLogHandler>,
    }

    pub fn create_router(meal_handler: Arc<MealLogHandler>) -> Router {
        let state = Arc::new(AppState { meal_handler });

        Router::new()
            .route("/", get(root_handler))
            .route("/log-meal", post(log_meal_handler))
            .route("/health", get(health_check))
            .with_state(state)
    }

    async fn log_meal_handler(
        State(state): State<Arc<AppState>>,
        body: String,
    ) -> (StatusCode, Json<Value>) {
        log::debug!("🔔 /log-meal body: {}", body.chars().take(500).collect::<String>());

        let (status, payload) = process_log_meal(state.meal_handler.clone(), &body).await;
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(payload))
    }

    async fn root_handler() -> Json<Value> {
        Json(service_description())
    }

    async fn health_check() -> Json<Value> {
        Json(json!({ "status": "healthy" }))
    }

}
