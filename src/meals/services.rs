use time::Date;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::images::services::{store_meal_image, UploadItem};
use crate::meals::repo_types::MealRecord;
use crate::nutrition::analyzer::analyze_meal_image;
use crate::state::AppState;

/// Analyzes the image, stores it, then appends the resulting record.
///
/// Analysis never fails; storage failures do, and nothing is appended then.
#[instrument(skip(state, image), fields(bytes = image.body.len()))]
pub async fn create_meal(
    state: &AppState,
    user_id: String,
    image: UploadItem,
    meal_time: String,
    date: Date,
) -> Result<MealRecord, AppError> {
    let nutrition =
        analyze_meal_image(state.vision.as_ref(), &image.body, &image.content_type).await;

    let meal_id = Uuid::new_v4();
    let image_ref = store_meal_image(state.storage.as_ref(), &user_id, meal_id, image).await?;

    let record = MealRecord::new(meal_id, user_id, date, meal_time, nutrition, Some(image_ref));
    state.meals.append(&record).await?;

    info!(meal_id = %record.id, user_id = %record.user_id, calories = record.calories, "meal recorded");
    Ok(record)
}

/// Records of `user_id`, most recent upload first.
pub async fn list_meals(
    state: &AppState,
    user_id: &str,
    date: Option<Date>,
) -> Result<Vec<MealRecord>, AppError> {
    let mut meals = state.meals.list_by_user(user_id, date).await?;
    meals.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(meals)
}
