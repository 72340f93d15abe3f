use std::sync::Arc;
use thiserror::Error;

use super::ai_service::{ChatMessage, ChatModel};
use super::extractor::{self, ExtractionError};
use crate::models::MealReport;

pub const NUTRITION_MODEL: &str = "gpt-4";
pub const NUTRITION_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("{0}")]
    Model(anyhow::Error),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Prompt asking for a single fenced JSON block with the nutrition estimate
pub fn build_prompt(meal_text: &str) -> String {
    format!(
        r#"
You are a friendly, motivating nutrition coach. A user just told you they ate:
"{meal_text}"

Estimate total calories, protein, carbs, and fat. Reply only in valid JSON format inside triple backticks like this:

```json
{{
  "calories": 220,
  "protein_g": 6,
  "carbs_g": 30,
  "fat_g": 8,
  "reply": "Nice! That gives you about 220 kcal with 6g protein. Light and energizing!"
}}
```
"#
    )
}

pub struct NutritionEstimator {
    model: Arc<dyn ChatModel>,
}

impl NutritionEstimator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn estimate(&self, meal_text: &str) -> Result<MealReport, EstimateError> {
        log::info!("🍽️ Estimating nutrition for: {}", meal_text);

        let messages = vec![ChatMessage::user(build_prompt(meal_text))];
        let raw = self
            .model
            .complete(NUTRITION_MODEL, messages, NUTRITION_TEMPERATURE)
            .await
            .map_err(EstimateError::Model)?;

        let report = extractor::extract(&raw)?;
        log::info!(
            "✅ Estimate: {} kcal, {}g protein, {}g carbs, {}g fat",
            report.calories,
            report.protein_g,
            report.carbs_g,
            report.fat_g
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingModel {
        answer: String,
        calls: Mutex<Vec<(String, Vec<ChatMessage>, f32)>>,
    }

    #[async_trait::async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(
            &self,
            model: &str,
            messages: Vec<ChatMessage>,
            temperature: f32,
        ) -> anyhow::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), messages, temperature));
            Ok(self.answer.clone())
        }
    }

    struct FailingModel;

    #[async_trait::async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _: &str, _: Vec<ChatMessage>, _: f32) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    #[test]
    fn test_prompt_embeds_meal_and_example() {
        let prompt = build_prompt("a bowl of oatmeal with banana");

        assert!(prompt.contains("\"a bowl of oatmeal with banana\""));
        assert!(prompt.contains("```json\n{\n  \"calories\": 220,"));
        assert!(prompt.contains("\"reply\":"));
        assert_eq!(prompt, build_prompt("a bowl of oatmeal with banana"));
    }

    #[tokio::test]
    async fn test_estimate_uses_fixed_model_and_temperature() {
        let model = Arc::new(RecordingModel {
            answer: "```json\n{\"calories\": 150, \"protein_g\": 5, \"carbs_g\": 27, \"fat_g\": 3, \"reply\": \"Good start!\"}\n```".to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let estimator = NutritionEstimator::new(model.clone());

        let report = estimator.estimate("oatmeal").await.unwrap();

        assert_eq!(report.calories, 150.0);
        assert_eq!(report.reply, "Good start!");

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (model_id, messages, temperature) = &calls[0];
        assert_eq!(model_id, NUTRITION_MODEL);
        assert_eq!(*temperature, NUTRITION_TEMPERATURE);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert!(messages[0].content.contains("\"oatmeal\""));
    }

    #[tokio::test]
    async fn test_estimate_propagates_model_error() {
        let estimator = NutritionEstimator::new(Arc::new(FailingModel));

        let err = estimator.estimate("toast").await.unwrap_err();

        assert!(matches!(err, EstimateError::Model(_)));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_estimate_propagates_extraction_error() {
        let model = Arc::new(RecordingModel {
            answer: "Sorry, I can't help with that.".to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let estimator = NutritionEstimator::new(model);

        let err = estimator.estimate("toast").await.unwrap_err();

        assert!(matches!(err, EstimateError::Extraction(ExtractionError::NoPayload)));
    }
}
