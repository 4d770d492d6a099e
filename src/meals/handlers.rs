use axum::{
    extract::{rejection::QueryRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, OffsetDateTime};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::dto::{MealListQuery, MealListResponse, UploadForm, UploadMealResponse};
use super::services::{create_meal, list_meals};
use crate::{
    aggregate::period::parse_date,
    auth::BearerUser,
    error::AppError,
    images::services::{ext_from_mime, load_meal_image, mime_from_filename, UploadItem},
    state::AppState,
};

const DEFAULT_USER_ID: &str = "default_user";

lazy_static! {
    static ref MEAL_TIME: Regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/:user_id", get(get_meals))
        .route("/meal-image/:meal_id", get(get_meal_image))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/upload-meal", post(upload_meal))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// The `image` field as received, before its type is checked.
struct RawImage {
    body: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

impl RawImage {
    /// Accepts a declared image type, else one guessed from the file name.
    fn validate(self) -> Result<UploadItem, AppError> {
        if self.body.is_empty() {
            return Err(AppError::bad_request("No image selected"));
        }
        let content_type = self
            .content_type
            .filter(|ct| ext_from_mime(ct).is_some())
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(mime_from_filename)
                    .map(str::to_string)
            })
            .ok_or_else(|| AppError::bad_request("image must be jpeg, png, webp, heic or gif"))?;
        Ok(UploadItem {
            body: self.body,
            content_type,
        })
    }
}

/// POST /upload-meal (multipart)
/// Fields: image (file), password, user_id, meal_time (HH:MM), date (YYYY-MM-DD)
#[instrument(skip(state, bearer, mp))]
pub async fn upload_meal(
    State(state): State<AppState>,
    bearer: BearerUser,
    mut mp: Multipart,
) -> Result<Json<UploadMealResponse>, AppError> {
    let mut form = UploadForm::default();
    let mut image: Option<RawImage> = None;

    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let body = field.bytes().await?;
                image = Some(RawImage {
                    body,
                    content_type,
                    file_name,
                });
            }
            "password" | "user_id" | "meal_time" | "date" => {
                let value = field.text().await?;
                let slot = match name.as_str() {
                    "password" => &mut form.password,
                    "user_id" => &mut form.user_id,
                    "meal_time" => &mut form.meal_time,
                    _ => &mut form.date,
                };
                *slot = Some(value);
            }
            _ => {}
        }
    }

    // Identity first: nothing about the file is reported to an unknown caller.
    let user_id = match bearer.0 {
        Some(sub) => sub.to_string(),
        None => {
            if form.password.as_deref() != Some(state.config.upload_password.as_str()) {
                warn!("upload rejected: bad password");
                return Err(AppError::unauthorized("Invalid password"));
            }
            form.user_id
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
        }
    };

    let image = image
        .ok_or_else(|| AppError::bad_request("No image provided"))?
        .validate()?;

    let now = OffsetDateTime::now_utc();
    let meal_time = match form.meal_time.filter(|t| !t.is_empty()) {
        Some(t) if MEAL_TIME.is_match(&t) => t,
        Some(t) => return Err(AppError::bad_request(format!("meal_time must be HH:MM, got {t:?}"))),
        None => now
            .format(format_description!("[hour]:[minute]"))
            .map_err(anyhow::Error::from)?,
    };
    let date = match form.date.filter(|d| !d.is_empty()) {
        Some(d) => parse_date(&d, "date")?,
        None => now.date(),
    };

    let meal = create_meal(&state, user_id, image, meal_time, date).await?;
    let nutrition = meal.nutrition.clone();
    Ok(Json(UploadMealResponse {
        success: true,
        meal,
        nutrition,
    }))
}

/// GET /meals/:user_id?date=YYYY-MM-DD
#[instrument(skip(state))]
pub async fn get_meals(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<MealListQuery>, QueryRejection>,
) -> Result<Json<MealListResponse>, AppError> {
    let Query(q) = query?;
    let date = q.date.as_deref().map(|d| parse_date(d, "date")).transpose()?;
    let meals = list_meals(&state, &user_id, date).await?;
    Ok(Json(MealListResponse { meals }))
}

/// GET /meal-image/:meal_id
#[instrument(skip(state))]
pub async fn get_meal_image(
    State(state): State<AppState>,
    Path(meal_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let not_found = || AppError::not_found("Meal not found");
    let meal_id = Uuid::parse_str(&meal_id).map_err(|_| not_found())?;
    let meal = state
        .meals
        .find_by_id(meal_id)
        .await?
        .ok_or_else(not_found)?;
    let image = meal
        .image
        .as_ref()
        .ok_or_else(|| AppError::not_found("Meal has no image"))?;
    let obj = load_meal_image(state.storage.as_ref(), image)
        .await?
        .ok_or_else(|| AppError::not_found("Image not found"))?;

    Ok(([(header::CONTENT_TYPE, obj.content_type)], obj.body))
}
