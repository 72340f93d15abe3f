pub mod ai_service;
pub mod credentials; // Service account provisioning
pub mod extractor;
pub mod meal_log;
pub mod nutrition;
pub mod openai;
pub mod sheets; // Google Sheets meal log

pub use ai_service::{ChatMessage, ChatModel};
pub use meal_log::MealLog;
pub use nutrition::NutritionEstimator;
pub use openai::OpenAiClient;
pub use sheets::GoogleSheetsLog;
