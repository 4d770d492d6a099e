use serde::{Deserialize, Serialize};

use crate::meals::repo_types::MealRecord;
use crate::nutrition::NutritionInfo;

#[derive(Debug, Serialize)]
pub struct UploadMealResponse {
    pub success: bool,
    pub meal: MealRecord,
    pub nutrition: NutritionInfo,
}

#[derive(Debug, Serialize)]
pub struct MealListResponse {
    pub meals: Vec<MealRecord>,
}

#[derive(Debug, Deserialize)]
pub struct MealListQuery {
    pub date: Option<String>,
}

/// Text fields of the upload form, before validation.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub password: Option<String>,
    pub user_id: Option<String>,
    pub meal_time: Option<String>,
    pub date: Option<String>,
}
