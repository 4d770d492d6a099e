pub mod analyzer;
pub mod extract;
pub mod model;
mod prompt;

pub use analyzer::{analyze_meal_image, GeminiVision, VisionModel};
pub use model::{Nutrient, NutritionInfo};
