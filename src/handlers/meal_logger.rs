use chrono::Local;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{LogEntry, LogMealRequest, UNKNOWN_USER};
use crate::services::extractor::ExtractionError;
use crate::services::nutrition::{EstimateError, NutritionEstimator};
use crate::services::MealLog;

pub const MISSING_MEAL: &str = "Missing 'meal' field";

#[derive(Debug, Error)]
pub enum LogMealError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("{0}")]
    Collaborator(anyhow::Error),
}

impl LogMealError {
    /// HTTP status for this failure
    pub fn status_code(&self) -> u16 {
        match self {
            LogMealError::Validation(_) => 400,
            LogMealError::Extraction(_) | LogMealError::Collaborator(_) => 500,
        }
    }
}

impl From<EstimateError> for LogMealError {
    fn from(err: EstimateError) -> Self {
        match err {
            EstimateError::Model(e) => LogMealError::Collaborator(e),
            EstimateError::Extraction(e) => LogMealError::Extraction(e),
        }
    }
}

pub struct MealLogHandler {
    estimator: NutritionEstimator,
    log: Arc<dyn MealLog>,
}

impl MealLogHandler {
    pub fn new(estimator: NutritionEstimator, log: Arc<dyn MealLog>) -> Self {
        Self { estimator, log }
    }

    /// Estimate the meal, append it to the log and return the coach reply.
    ///
    /// The row is written only after a full report exists. A failed append is
    /// reported as an error even though the estimate succeeded.
    pub async fn log_meal(&self, request: LogMealRequest) -> Result<String, LogMealError> {
        let meal_text = match request.meal.as_deref() {
            Some(meal) if !meal.is_empty() => meal,
            _ => {
                log::warn!("⚠️ Rejected log-meal request without meal text");
                return Err(LogMealError::Validation(MISSING_MEAL.to_string()));
            }
        };
        let user_id = request.user_id.as_deref().unwrap_or(UNKNOWN_USER);

        log::info!("📨 Log meal request - User: {} | Meal: '{}'", user_id, meal_text);

        let report = self.estimator.estimate(meal_text).await?;
        let reply = report.reply.clone();

        let entry = LogEntry::new(user_id, meal_text, report, Local::now().naive_local());
        self.log
            .append_row(entry.into_row())
            .await
            .map_err(LogMealError::Collaborator)?;

        log::info!("✅ Meal logged for {}", user_id);
        Ok(reply)
    }
}
