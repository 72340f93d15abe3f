use anyhow::Result;
use serde_json::Value;

/// Append-only store for meal log rows
#[async_trait::async_trait]
pub trait MealLog: Send + Sync {
    async fn append_row(&self, row: Vec<Value>) -> Result<()>;
}
