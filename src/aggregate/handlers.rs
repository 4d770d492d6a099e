use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::aggregator::{aggregate_for_user, AggregateResult};
use super::period::{Period, PeriodQuery};
use crate::{error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/nutrition/:user_id/:period", get(get_nutrition))
}

/// GET /nutrition/:user_id/:period?date=YYYY-MM-DD
/// GET /nutrition/:user_id/:period?start_date=...&end_date=...
#[instrument(skip(state))]
pub async fn get_nutrition(
    State(state): State<AppState>,
    Path((user_id, period)): Path<(String, String)>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<Json<AggregateResult>, AppError> {
    let Query(q) = query?;
    let period: Period = period.parse()?;
    let today = OffsetDateTime::now_utc().date();
    let result = aggregate_for_user(state.meals.as_ref(), &user_id, period, &q, today).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use time::{macros::datetime, OffsetDateTime};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::app::build_app;
    use crate::meals::repo_types::MealRecord;
    use crate::nutrition::NutritionInfo;
    use crate::state::AppState;

    async fn seed(state: &AppState, user: &str, at: OffsetDateTime, calories: f64) {
        let mut record = MealRecord::new(
            Uuid::new_v4(),
            user.into(),
            at.date(),
            "12:00".into(),
            NutritionInfo {
                food_name: format!("meal {calories}"),
                calories,
                ..Default::default()
            },
            None,
        );
        record.timestamp = at;
        state.meals.append(&record).await.unwrap();
    }

    async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
        let res = build_app(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn daily_totals_over_http() {
        let state = AppState::fake();
        seed(&state, "u1", datetime!(2024-03-01 08:00 UTC), 300.0).await;
        seed(&state, "u1", datetime!(2024-03-01 19:00 UTC), 450.0).await;
        seed(&state, "u1", datetime!(2024-03-02 08:00 UTC), 999.0).await;
        seed(&state, "u2", datetime!(2024-03-01 09:00 UTC), 123.0).await;

        let (status, body) = get(&state, "/api/nutrition/u1/daily?date=2024-03-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["calories"], 750.0);
        let meals = body["meals"].as_array().unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0]["calories"], 450);
    }

    #[tokio::test]
    async fn weekly_with_explicit_range() {
        let state = AppState::fake();
        seed(&state, "u1", datetime!(2024-03-03 08:00 UTC), 100.0).await;
        seed(&state, "u1", datetime!(2024-03-04 08:00 UTC), 200.0).await;
        seed(&state, "u1", datetime!(2024-03-10 08:00 UTC), 400.0).await;

        let (_, body) = get(&state, "/api/nutrition/u1/weekly?date=2024-03-06").await;
        assert_eq!(body["calories"], 600.0);

        let (_, body) = get(
            &state,
            "/api/nutrition/u1/weekly?start_date=2024-03-03&end_date=2024-03-04",
        )
        .await;
        assert_eq!(body["calories"], 300.0);
    }

    #[tokio::test]
    async fn bad_period_and_dates_are_rejected() {
        let state = AppState::fake();
        for uri in [
            "/api/nutrition/u1/yearly",
            "/api/nutrition/u1/daily?date=2024-13-01",
            "/api/nutrition/u1/monthly?start_date=2024-03-01",
            "/api/nutrition/u1/monthly?start_date=2024-03-09&end_date=2024-03-01",
        ] {
            let (status, body) = get(&state, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn repeated_query_key_gets_json_error() {
        let (status, body) = get(
            &AppState::fake(),
            "/api/nutrition/u1/weekly?date=2024-03-01&date=2024-03-08",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn empty_bucket_is_all_zero() {
        let (status, body) = get(&AppState::fake(), "/api/nutrition/nobody/monthly").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["calories"], 0.0);
        assert!(body["meals"].as_array().unwrap().is_empty());
        assert!(body["vitamins"].as_array().unwrap().is_empty());
    }
}
