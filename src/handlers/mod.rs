pub mod meal_logger;

pub use meal_logger::{LogMealError, MealLogHandler};
