use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Calories reported by [`NutritionInfo::fallback`].
pub const FALLBACK_CALORIES: f64 = 300.0;

/// Nutrition facts for one analyzed meal image.
///
/// Every field is optional on the wire: strings default to empty, numbers to
/// zero and lists to empty, so a partial reply from the model still yields a
/// complete record. Numbers may arrive as JSON numbers, numeric strings
/// (`"12"`, `"12.5 g"`) or `null`. Keys this schema does not know about are
/// kept in the `extra` map of the object they appeared in, at every nesting
/// level, and written back out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionInfo {
    pub food_name: String,
    pub serving_size: String,
    #[serde(deserialize_with = "lenient_number")]
    pub calories: f64,
    pub macronutrients: Macronutrients,
    pub micronutrients: Micronutrients,
    pub other_nutrients: OtherNutrients,
    /// 0 to 100.
    #[serde(deserialize_with = "lenient_number")]
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Grams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Macronutrients {
    #[serde(deserialize_with = "lenient_number")]
    pub protein: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub carbs: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub fat: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub fiber: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub sugar: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Micronutrients {
    pub vitamins: Vec<Nutrient>,
    pub minerals: Vec<Nutrient>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrient {
    pub name: String,
    #[serde(deserialize_with = "lenient_number")]
    pub amount: f64,
    pub unit: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Milligrams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherNutrients {
    #[serde(deserialize_with = "lenient_number")]
    pub sodium: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub cholesterol: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Nutrient {
    pub fn new(name: &str, amount: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
            extra: Map::new(),
        }
    }
}

impl NutritionInfo {
    /// The fixed record substituted when the model reply is unusable.
    pub fn fallback() -> Self {
        Self {
            food_name: "Unknown Food".into(),
            serving_size: "1 serving".into(),
            calories: FALLBACK_CALORIES,
            macronutrients: Macronutrients {
                protein: 15.0,
                carbs: 30.0,
                fat: 10.0,
                fiber: 5.0,
                sugar: 8.0,
                extra: Map::new(),
            },
            micronutrients: Micronutrients {
                vitamins: vec![
                    Nutrient::new("Vitamin A", 100.0, "μg"),
                    Nutrient::new("Vitamin C", 10.0, "mg"),
                    Nutrient::new("Vitamin D", 2.0, "μg"),
                    Nutrient::new("Vitamin E", 1.0, "mg"),
                    Nutrient::new("Vitamin K", 10.0, "μg"),
                    Nutrient::new("Folate", 40.0, "μg"),
                    Nutrient::new("B12", 0.5, "μg"),
                ],
                minerals: vec![
                    Nutrient::new("Calcium", 100.0, "mg"),
                    Nutrient::new("Iron", 2.0, "mg"),
                    Nutrient::new("Magnesium", 50.0, "mg"),
                    Nutrient::new("Phosphorus", 100.0, "mg"),
                    Nutrient::new("Potassium", 400.0, "mg"),
                    Nutrient::new("Zinc", 1.0, "mg"),
                ],
                extra: Map::new(),
            },
            other_nutrients: OtherNutrients {
                sodium: 200.0,
                cholesterol: 20.0,
                extra: Map::new(),
            },
            confidence: 50.0,
            extra: Map::new(),
        }
    }

    /// Calories as stored on the meal record.
    pub fn rounded_calories(&self) -> i64 {
        self.calories.round() as i64
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

pub(crate) fn number_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn leading_number(s: &str) -> Option<f64> {
    lazy_static! {
        static ref LEADING_NUMBER_RE: Regex = Regex::new(r"^\s*(-?\d+(?:\.\d+)?)").unwrap();
    }
    LEADING_NUMBER_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
