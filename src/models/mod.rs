use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User id recorded when the caller does not send one
pub const UNKNOWN_USER: &str = "unknown_user";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Nutrition estimate decoded from the model's fenced JSON payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MealReport {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub reply: String,
}

/// One row of the meal log
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,  // "YYYY-MM-DD HH:MM:SS"
    pub user_id: String,
    pub meal_text: String,
    pub report: MealReport,
}

impl LogEntry {
    pub fn new(user_id: &str, meal_text: &str, report: MealReport, now: NaiveDateTime) -> Self {
        Self {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            user_id: user_id.to_string(),
            meal_text: meal_text.to_string(),
            report,
        }
    }

    /// Column order: timestamp, user, meal, calories, protein, carbs, fat, reply
    pub fn into_row(self) -> Vec<Value> {
        vec![
            Value::from(self.timestamp),
            Value::from(self.user_id),
            Value::from(self.meal_text),
            Value::from(self.report.calories),
            Value::from(self.report.protein_g),
            Value::from(self.report.carbs_g),
            Value::from(self.report.fat_g),
            Value::from(self.report.reply),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogMealRequest {
    #[serde(default)]
    pub meal: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogMealResponse {
    pub reply: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
