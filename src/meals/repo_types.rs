use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::nutrition::NutritionInfo;

/// `YYYY-MM-DD` on the wire.
pub(crate) mod iso_date {
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
    use time::{macros::format_description, Date};

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;
        Date::parse(&text, format_description!("[year]-[month]-[day]")).map_err(D::Error::custom)
    }
}

/// Handle to an uploaded image in blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub key: String,
    pub content_type: String,
    pub size: u64,
}

/// One analyzed upload. Written once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: Uuid,
    pub user_id: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    /// `HH:MM`
    pub time: String,
    pub name: String,
    #[serde(deserialize_with = "integer_calories")]
    pub calories: i64,
    pub nutrition: NutritionInfo,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl MealRecord {
    pub fn new(
        id: Uuid,
        user_id: String,
        date: Date,
        time: String,
        nutrition: NutritionInfo,
        image: Option<ImageRef>,
    ) -> Self {
        Self {
            id,
            user_id,
            date,
            time,
            name: nutrition.food_name.clone(),
            calories: nutrition.rounded_calories(),
            nutrition,
            timestamp: OffsetDateTime::now_utc(),
            image,
        }
    }
}

/// Calories are stored as integers; text backends may hand them back as
/// strings, so parse explicitly instead of trusting the JSON type.
fn integer_calories<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| D::Error::custom("calories out of range")),
        Value::String(s) => s.trim().parse::<i64>().map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "calories must be an integer, got {other}"
        ))),
    }
}

#[derive(Debug, FromRow)]
pub struct MealRecordRow {
    pub id: Uuid,
    pub user_id: String,
    pub date: Date,
    pub time: String,
    pub name: String,
    pub calories: i64,
    pub nutrition: Json<NutritionInfo>,
    pub created_at: OffsetDateTime,
    pub image_key: Option<String>,
    pub image_content_type: Option<String>,
    pub image_size: Option<i64>,
}

impl From<MealRecordRow> for MealRecord {
    fn from(r: MealRecordRow) -> Self {
        let image = match (r.image_key, r.image_content_type) {
            (Some(key), Some(content_type)) => Some(ImageRef {
                key,
                content_type,
                size: r.image_size.unwrap_or(0).max(0) as u64,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            user_id: r.user_id,
            date: r.date,
            time: r.time,
            name: r.name,
            calories: r.calories,
            nutrition: r.nutrition.0,
            timestamp: r.created_at,
            image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{date, datetime};

    fn sample_json(calories: Value) -> Value {
        json!({
            "id": "6a2f41a0-6b3c-4f1a-9d57-3c0a3b0c2f11",
            "user_id": "default_user",
            "date": "2024-03-01",
            "time": "12:30",
            "name": "Omelette",
            "calories": calories,
            "nutrition": { "food_name": "Omelette", "calories": 310 },
            "timestamp": "2024-03-01T12:31:05Z"
        })
    }

    #[test]
    fn reads_calories_written_as_string() {
        let rec: MealRecord = serde_json::from_value(sample_json(json!("310"))).unwrap();
        assert_eq!(rec.calories, 310);
        assert_eq!(rec.date, date!(2024 - 03 - 01));
        assert_eq!(rec.timestamp, datetime!(2024-03-01 12:31:05 UTC));
        assert!(rec.image.is_none());
    }

    #[test]
    fn rejects_non_numeric_calories() {
        assert!(serde_json::from_value::<MealRecord>(sample_json(json!("lots"))).is_err());
        assert!(serde_json::from_value::<MealRecord>(sample_json(json!(null))).is_err());
    }

    #[test]
    fn date_serializes_as_iso_string() {
        let rec: MealRecord = serde_json::from_value(sample_json(json!(310))).unwrap();
        let out = serde_json::to_value(&rec).unwrap();
        assert_eq!(out["date"], "2024-03-01");
        assert_eq!(out["calories"], 310);
        assert!(out.get("image").is_none());
    }

    #[test]
    fn new_record_copies_name_and_rounded_calories() {
        let nutrition = NutritionInfo {
            food_name: "Bagel".into(),
            calories: 245.6,
            ..Default::default()
        };
        let rec = MealRecord::new(
            Uuid::new_v4(),
            "u1".into(),
            date!(2024 - 05 - 02),
            "08:15".into(),
            nutrition,
            None,
        );
        assert_eq!(rec.name, "Bagel");
        assert_eq!(rec.calories, 246);
    }

    #[test]
    fn row_without_image_key_has_no_image() {
        let row = MealRecordRow {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            date: date!(2024 - 01 - 10),
            time: "19:00".into(),
            name: "Curry".into(),
            calories: 700,
            nutrition: Json(NutritionInfo::default()),
            created_at: datetime!(2024-01-10 19:00 UTC),
            image_key: None,
            image_content_type: Some("image/png".into()),
            image_size: Some(10),
        };
        let rec = MealRecord::from(row);
        assert!(rec.image.is_none());
        assert_eq!(rec.calories, 700);
    }
}
